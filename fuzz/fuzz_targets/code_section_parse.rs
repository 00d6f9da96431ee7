#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = fwmodules::formats::code_section(data, &fwmodules::ReaderConfig::default());
});
