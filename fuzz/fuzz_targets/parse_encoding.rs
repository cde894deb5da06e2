#![no_main]

use libfuzzer_sys::fuzz_target;
use classdump::encoding::{encode, parse_method_signature, parse_type};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(ty) = parse_type(input) {
        let _ = parse_type(&encode(&ty));
    }
    let _ = parse_method_signature(input);
});
