#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (&str, &str)| {
    let (base, diff) = input;
    // Out-of-range hunk positions must clamp, never panic.
    for file in rift::diff::parse_unified_diff(diff) {
        for hunk in &file.hunks {
            let _ = rift::diff::apply_hunk(base, hunk);
        }
    }
});
