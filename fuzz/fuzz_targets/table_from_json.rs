#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(table) = fwmodules::ModuleTable::from_json(text) {
            let _ = table.to_json(None, false);
        }
    }
});
