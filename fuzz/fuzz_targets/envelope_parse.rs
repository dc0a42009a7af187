#![no_main]

use libfuzzer_sys::fuzz_target;
use schemaflow_codec::envelope::{frame, parse};
use schemaflow_codec::{CodecError, HEADER_LEN, MAGIC_BYTE};

fuzz_target!(|data: &[u8]| {
    match parse(data) {
        Ok(envelope) => {
            assert_eq!(data[0], MAGIC_BYTE);
            assert_eq!(envelope.payload.len(), data.len() - HEADER_LEN);
            assert_eq!(&frame(envelope.schema_id, envelope.payload)[..], data);
        }
        Err(CodecError::UnsupportedEnvelope(marker)) => assert_ne!(marker, MAGIC_BYTE),
        Err(CodecError::Corrupt(_)) => assert!(data.len() < HEADER_LEN),
        Err(other) => panic!("unexpected error from parse: {}", other),
    }
});
