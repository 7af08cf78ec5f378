#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Elaboration and checking never panic on anything that parses.
        let (surface, errors) = sysf_parser::parse(s);
        if errors.is_empty() {
            let module = sysf_elab::elaborate(&surface);
            if !module.has_errors() {
                let _ = sysf_typeck::check_program(&module);
            }
        }
    }
});
