use super::Hunk;

/// Apply one hunk to `base`, yielding a full file that contains only that
/// hunk's change.
///
/// The old-side region `[old_start-1, old_start-1+old_count)` is replaced by
/// the hunk's context and added lines, clamped to the file's bounds. A
/// zero-count region inserts after line `old_start`, per unified-diff
/// convention.
pub fn apply_hunk(base: &str, hunk: &Hunk) -> String {
    let lines: Vec<&str> = base.split('\n').collect();

    let replacement = hunk.lines.iter().filter_map(|line| {
        let mut chars = line.chars();
        match chars.next() {
            Some(' ') | Some('+') => Some(chars.as_str()),
            _ => None,
        }
    });

    let start = if hunk.old_count == 0 {
        hunk.old_start as usize
    } else {
        hunk.old_start.saturating_sub(1) as usize
    }
    .min(lines.len());
    let end = (start + hunk.old_count as usize).min(lines.len());

    let mut result: Vec<&str> = Vec::with_capacity(lines.len() + hunk.lines.len());
    result.extend_from_slice(&lines[..start]);
    result.extend(replacement);
    result.extend_from_slice(&lines[end..]);
    result.join("\n")
}

impl Hunk {
    /// A standalone patch holding exactly this hunk, suitable for
    /// `git apply --cached --unidiff-zero`.
    pub fn patch(&self, file_header: &str) -> String {
        let body_len: usize = self.lines.iter().map(|l| l.len() + 1).sum();
        let mut patch = String::with_capacity(file_header.len() + self.header.len() + 1 + body_len);
        patch.push_str(file_header);
        patch.push_str(&self.header);
        patch.push('\n');
        for line in &self.lines {
            patch.push_str(line);
            patch.push('\n');
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parse_unified_diff;

    fn hunk(old: (u32, u32), new: (u32, u32), lines: &[&str]) -> Hunk {
        Hunk {
            header: format!("@@ -{},{} +{},{} @@", old.0, old.1, new.0, new.1),
            old_start: old.0,
            old_count: old.1,
            new_start: new.0,
            new_count: new.1,
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn apply_replaces_single_line() {
        let base = "line1\nline2\nline3\n";
        let h = hunk((2, 1), (2, 1), &["-line2", "+LINE2"]);
        assert_eq!(apply_hunk(base, &h), "line1\nLINE2\nline3\n");
    }

    #[test]
    fn apply_keeps_context_lines() {
        let base = "a\nb\nc\nd\n";
        let h = hunk((1, 3), (1, 4), &[" a", " b", "+b2", " c"]);
        assert_eq!(apply_hunk(base, &h), "a\nb\nb2\nc\nd\n");
    }

    #[test]
    fn apply_to_empty_base_builds_new_file() {
        let h = hunk((0, 0), (1, 2), &["+fn a() {}", "+fn b() {}"]);
        assert_eq!(apply_hunk("", &h), "fn a() {}\nfn b() {}\n");
    }

    #[test]
    fn apply_zero_count_inserts_after_old_start() {
        let h = hunk((2, 0), (3, 1), &["+inserted"]);
        assert_eq!(apply_hunk("one\ntwo\nthree\n", &h), "one\ntwo\ninserted\nthree\n");
    }

    #[test]
    fn apply_clamps_out_of_range_region() {
        let h = hunk((40, 5), (40, 1), &["+tail"]);
        assert_eq!(apply_hunk("x\ny", &h), "x\ny\ntail");
    }

    #[test]
    fn apply_ignores_no_newline_marker() {
        let h = hunk(
            (1, 1),
            (1, 1),
            &["-old", "\\ No newline at end of file", "+new"],
        );
        assert_eq!(apply_hunk("old", &h), "new");
    }

    #[test]
    fn patch_is_header_plus_one_hunk() {
        let raw = "\
diff --git a/a.txt b/a.txt
index 1111111..2222222 100644
--- a/a.txt
+++ b/a.txt
@@ -2 +2 @@
-line2
+LINE2
@@ -9 +9 @@
-nine
+NINE
";
        let fd = &parse_unified_diff(raw)[0];
        insta::assert_snapshot!(fd.hunks[1].patch(&fd.header), @r"
        diff --git a/a.txt b/a.txt
        index 1111111..2222222 100644
        --- a/a.txt
        +++ b/a.txt
        @@ -9 +9 @@
        -nine
        +NINE
        ");
        assert!(fd.hunks[0].patch(&fd.header).ends_with("+LINE2\n"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_body() -> impl Strategy<Value = Vec<String>> {
            proptest::collection::vec(
                (prop_oneof![Just(' '), Just('+'), Just('-')], "[a-z ]{0,8}")
                    .prop_map(|(marker, text)| format!("{marker}{text}")),
                1..12,
            )
        }

        proptest! {
            #[test]
            fn patch_reparses_to_same_hunk(
                old_start in 1u32..500,
                new_start in 1u32..500,
                body in arb_body(),
            ) {
                let old_count = body.iter().filter(|l| !l.starts_with('+')).count() as u32;
                let new_count = body.iter().filter(|l| !l.starts_with('-')).count() as u32;
                let raw = format!(
                    "diff --git a/f.rs b/f.rs\n--- a/f.rs\n+++ b/f.rs\n@@ -{old_start},{old_count} +{new_start},{new_count} @@\n{}\n",
                    body.join("\n")
                );

                let parsed = parse_unified_diff(&raw);
                prop_assert_eq!(parsed.len(), 1);
                let original = &parsed[0].hunks[0];

                let reparsed = parse_unified_diff(&original.patch(&parsed[0].header));
                prop_assert_eq!(reparsed.len(), 1);
                prop_assert_eq!(&reparsed[0].hunks[0], original);
            }
        }
    }
}
