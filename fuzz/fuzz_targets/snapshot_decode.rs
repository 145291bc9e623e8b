#![no_main]

use libfuzzer_sys::fuzz_target;
use mirage_core::{SnapshotMessage, SNAPSHOT_MESSAGE_SIZE};

fuzz_target!(|data: &[u8]| {
    if let Ok(message) = SnapshotMessage::decode(data) {
        assert!(data.len() >= SNAPSHOT_MESSAGE_SIZE);
        assert!(message.position.is_finite());

        let encoded = message.encode();
        assert_eq!(&encoded[..], &data[..SNAPSHOT_MESSAGE_SIZE]);
    }
});
