use std::collections::HashSet;

/// Longest file-name stem we produce, in characters; leaves room for the extension on
/// filesystems limited to 255 bytes.
const MAX_STEM_CHARS: usize = 150;

const RESERVED_WINDOWS_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9", "LPT1",
    "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Derive a filesystem-safe name from a title. Stable: the same title always maps to the
/// same name.
pub fn safe_file_name(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(MAX_STEM_CHARS).collect();
    let trimmed = truncated.trim_end_matches(['.', ' ']).trim_start();

    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return "untitled".to_string();
    }

    if RESERVED_WINDOWS_NAMES.iter().any(|r| r.eq_ignore_ascii_case(trimmed)) {
        return format!("_{}", trimmed);
    }

    trimmed.to_string()
}

/// Hands out sibling names, disambiguating collisions with the node id
#[derive(Debug, Default)]
pub struct SiblingNames {
    used: HashSet<String>,
}

impl SiblingNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a unique name for `title`; case-insensitive to stay safe on macOS/Windows
    pub fn claim(&mut self, title: &str, id: &str) -> String {
        let base = safe_file_name(title);
        if self.used.insert(base.to_lowercase()) {
            return base;
        }

        let id = safe_file_name(id);
        let with_id = suffixed(&base, &format!(" ({})", id));
        if self.used.insert(with_id.to_lowercase()) {
            return with_id;
        }

        let mut n = 2;
        loop {
            let candidate = suffixed(&base, &format!(" ({}) {}", id, n));
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Append `suffix` to an already safe `base`, shortening `base` so the suffix survives
/// the length limit
fn suffixed(base: &str, suffix: &str) -> String {
    let room = MAX_STEM_CHARS.saturating_sub(suffix.chars().count());
    let kept: String = base.chars().take(room).collect();
    format!("{}{}", kept.trim_end_matches(['.', ' ']), suffix)
}

/// Relative link target for a file in the same directory, percent-encoding the
/// characters that would otherwise change how the link is parsed
pub fn local_href(file_name: &str) -> String {
    let mut href = String::from("./");
    for c in file_name.chars() {
        match c {
            '%' => href.push_str("%25"),
            ' ' => href.push_str("%20"),
            '#' => href.push_str("%23"),
            '?' => href.push_str("%3F"),
            '"' => href.push_str("%22"),
            '\'' => href.push_str("%27"),
            '&' => href.push_str("%26"),
            c => href.push(c),
        }
    }
    href
}
