#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    for file in rift::diff::parse_unified_diff(data) {
        for hunk in &file.hunks {
            assert!(hunk.header.starts_with("@@"));
            // Every synthesized patch must parse back to the same hunk.
            let patch = hunk.patch(&file.header);
            let reparsed = rift::diff::parse_unified_diff(&patch);
            assert_eq!(reparsed.len(), 1);
            assert_eq!(reparsed[0].hunks.len(), 1);
        }
    }
});
