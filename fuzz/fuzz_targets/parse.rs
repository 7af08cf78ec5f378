#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Diagnostics point inside the input, and whatever was recovered
        // can still be printed.
        let (module, errors) = sysf_parser::parse(s);
        for error in &errors {
            assert!(
                error.span.start <= error.span.end && error.span.end as usize <= s.len(),
                "span {}..{} outside input of length {}",
                error.span.start,
                error.span.end,
                s.len()
            );
        }
        let _ = sysf_ast::pretty_print(&module);
    }
});
