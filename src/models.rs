use serde::Serialize;

/// Per-side change kind reported by `git status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    Untracked,
}

impl FileStatus {
    /// Map a porcelain status letter. Space and unknown letters mean "no change".
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'M' | 'T' => Some(Self::Modified),
            'A' => Some(Self::Added),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            'C' => Some(Self::Copied),
            '?' => Some(Self::Untracked),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Untracked => '?',
        }
    }
}

/// A changed path with its index-side and worktree-side status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusFile {
    pub path: String,
    pub staged: Option<FileStatus>,
    pub worktree: Option<FileStatus>,
}

impl StatusFile {
    pub fn is_untracked(&self) -> bool {
        self.staged == Some(FileStatus::Untracked) || self.worktree == Some(FileStatus::Untracked)
    }

    /// True when the index holds a change for this path.
    pub fn has_staged_change(&self) -> bool {
        matches!(self.staged, Some(s) if s != FileStatus::Untracked)
    }

    /// Two-letter `XY` code, blank for an unchanged side.
    pub fn status_code(&self) -> String {
        let letter = |s: Option<FileStatus>| s.map(FileStatus::letter).unwrap_or(' ');
        format!("{}{}", letter(self.staged), letter(self.worktree))
    }
}
