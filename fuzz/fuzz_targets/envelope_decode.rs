#![no_main]

use libfuzzer_sys::fuzz_target;
use schemaflow_codec::{decode, ParsedSchema, StaticResolver};
use std::sync::OnceLock;

const USER_EVENT: &str = include_str!("../../schema/user_event.avsc");

fn fixture() -> &'static (tokio::runtime::Runtime, StaticResolver) {
    static FIXTURE: OnceLock<(tokio::runtime::Runtime, StaticResolver)> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let schema = ParsedSchema::parse(USER_EVENT).unwrap();
        (runtime, StaticResolver::new().with_schema(1, schema))
    })
}

// Arbitrary bytes must come back as an error, never a panic or a hang.
fuzz_target!(|data: &[u8]| {
    let (runtime, resolver) = fixture();
    let _ = runtime.block_on(decode(data, resolver));
});
