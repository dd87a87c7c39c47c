use super::{FileDiff, Hunk};

const FILE_BOUNDARY: &str = "diff --git ";
const HUNK_MARKER: &str = "@@";

/// Parse unified-diff text into per-file hunk lists.
///
/// Text before the first `diff --git` line is ignored. Sections whose path
/// cannot be resolved are dropped. Never fails: unparseable input yields an
/// empty list.
pub fn parse_unified_diff(raw: &str) -> Vec<FileDiff> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut sections: Vec<Vec<&str>> = Vec::new();
    for line in raw.split('\n') {
        if line.starts_with(FILE_BOUNDARY) {
            sections.push(Vec::new());
        }
        if let Some(section) = sections.last_mut() {
            section.push(line);
        }
    }

    sections
        .into_iter()
        .filter_map(|lines| parse_file_section(&lines))
        .collect()
}

fn parse_file_section(lines: &[&str]) -> Option<FileDiff> {
    let mut end = lines.len();
    while end > 0 && lines[end - 1].is_empty() {
        end -= 1;
    }
    let lines = &lines[..end];
    if lines.is_empty() {
        return None;
    }

    // Binary and mode-only sections have no hunks: the whole section is header.
    let header_end = lines
        .iter()
        .position(|l| l.starts_with(HUNK_MARKER))
        .unwrap_or(lines.len());
    let header_lines = &lines[..header_end];

    let path = extract_path(header_lines)?;

    let mut header = header_lines.join("\n");
    header.push('\n');

    let mut hunks: Vec<Hunk> = Vec::new();
    for line in &lines[header_end..] {
        if line.starts_with(HUNK_MARKER) {
            hunks.push(parse_hunk_header(line));
        } else if let Some(hunk) = hunks.last_mut() {
            hunk.lines.push((*line).to_string());
        }
    }

    Some(FileDiff {
        header,
        path,
        hunks,
    })
}

/// Resolve the section's path: `+++ b/`, then `--- a/` for deletions, then the
/// boundary line. Names git quoted (`"b/caf\303\251.txt"`) are unquoted.
fn extract_path(header: &[&str]) -> Option<String> {
    for line in header {
        let Some(name) = line.strip_prefix("+++ ") else {
            continue;
        };
        if name == "/dev/null" {
            if let Some(path) = header
                .iter()
                .filter_map(|l| l.strip_prefix("--- "))
                .find_map(|old| side_path(old, "a/"))
            {
                return Some(path);
            }
        } else if let Some(path) = side_path(name, "b/") {
            return Some(path);
        }
    }

    let boundary = header.first()?.strip_prefix(FILE_BOUNDARY)?;
    if boundary.ends_with('"') {
        let start = boundary.rfind(" \"b/")?;
        return side_path(&boundary[start + 1..], "b/");
    }
    let (_, new_path) = boundary.strip_prefix("a/")?.split_once(" b/")?;
    non_empty(new_path)
}

/// `b/path` or `"b/path"` with `prefix` removed.
fn side_path(name: &str, prefix: &str) -> Option<String> {
    let name = name.trim_end_matches('\t');
    if name.starts_with('"') {
        let unquoted = unquote_c_style(name)?;
        return non_empty(unquoted.strip_prefix(prefix)?);
    }
    non_empty(name.strip_prefix(prefix)?)
}

fn non_empty(path: &str) -> Option<String> {
    // git appends a tab after names containing spaces.
    let path = path.trim_end_matches('\t');
    (!path.is_empty()).then(|| path.to_string())
}

/// Undo git's C-style quoting: backslash escapes and octal byte escapes.
fn unquote_c_style(quoted: &str) -> Option<String> {
    let inner = quoted.strip_prefix('"')?.strip_suffix('"')?;
    let mut bytes = Vec::with_capacity(inner.len());
    let mut rest = inner.bytes().peekable();
    while let Some(b) = rest.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        let escaped = match rest.next()? {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            d @ b'0'..=b'7' => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match rest.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(o - b'0');
                            rest.next();
                        }
                        _ => break,
                    }
                }
                u8::try_from(value).ok()?
            }
            other => other,
        };
        bytes.push(escaped);
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse `@@ -a[,b] +c[,d] @@...`. A malformed header keeps its text and
/// zeroes the numeric fields.
pub(crate) fn parse_hunk_header(line: &str) -> Hunk {
    let mut hunk = Hunk {
        header: line.to_string(),
        ..Hunk::default()
    };

    let Some(rest) = line.strip_prefix("@@ ") else {
        return hunk;
    };
    let Some(end) = rest.find(" @@") else {
        return hunk;
    };
    let Some((old, new)) = rest[..end].split_once(' ') else {
        return hunk;
    };

    (hunk.old_start, hunk.old_count) = parse_range(old.trim_start_matches('-'));
    (hunk.new_start, hunk.new_count) = parse_range(new.trim_start_matches('+'));
    hunk
}

fn parse_range(range: &str) -> (u32, u32) {
    match range.split_once(',') {
        Some((start, count)) => (start.parse().unwrap_or(0), count.parse().unwrap_or(0)),
        None => (range.parse().unwrap_or(0), 1),
    }
}
