//! Archive entry and download naming

use std::collections::HashSet;
use std::path::Path;

/// Characters that are not allowed in file names on common platforms
const UNSAFE_CHARS: &[char] = &['\\', '/', ':', '"', '*', '?', '<', '>', '|'];

/// Workbook extensions stripped when deriving the archive name
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Make a sheet name safe for use as a file name.
///
/// Each run of unsafe or control characters becomes a single `_`. With
/// `strip_spaces`, spaces are removed. A name that ends up empty (or is `.`
/// / `..`) is replaced by `Sheet<position>`.
pub fn sanitize_sheet_name(name: &str, position: usize, strip_spaces: bool) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;

    for ch in name.chars() {
        if UNSAFE_CHARS.contains(&ch) || ch.is_control() {
            if !in_run {
                out.push('_');
                in_run = true;
            }
            continue;
        }
        in_run = false;
        if strip_spaces && ch == ' ' {
            continue;
        }
        out.push(ch);
    }

    if out.is_empty() || out == "." || out == ".." {
        return format!("Sheet{}", position + 1);
    }
    out
}

/// Hands out unique `.csv` entry names, in call order.
///
/// Names are compared case-insensitively because archives are commonly
/// extracted onto case-insensitive file systems. A repeated name gets
/// `_2`, `_3`, ... before the extension.
#[derive(Debug, Default)]
pub struct EntryNamer {
    used: HashSet<String>,
}

impl EntryNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve and return the entry name for an already sanitized sheet name
    pub fn entry_name(&mut self, sanitized: &str) -> String {
        let mut candidate = format!("{}.csv", sanitized);
        let mut suffix = 2;

        while !self.used.insert(candidate.to_lowercase()) {
            candidate = format!("{}_{}.csv", sanitized, suffix);
            suffix += 1;
        }

        candidate
    }
}

/// Download name for the archive built from `input_name`.
///
/// `Book.xlsx` becomes `Book_csv.zip`; directories in `input_name` are dropped.
pub fn archive_file_name(input_name: &str) -> String {
    let file_name = Path::new(input_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(input_name);

    let stem = match file_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && WORKBOOK_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known)) =>
        {
            stem
        }
        _ => file_name,
    };

    let stem = if stem.is_empty() { "workbook" } else { stem };
    format!("{}_csv.zip", stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_unsafe_runs() {
        assert_eq!(sanitize_sheet_name("Q1/Q2", 0, false), "Q1_Q2");
        assert_eq!(sanitize_sheet_name("a<>:b", 0, false), "a_b");
        assert_eq!(sanitize_sheet_name("Sales", 0, false), "Sales");
        assert_eq!(sanitize_sheet_name("tab\there", 0, false), "tab_here");
    }

    #[test]
    fn test_sanitize_spaces() {
        assert_eq!(sanitize_sheet_name("My Sheet", 0, false), "My Sheet");
        assert_eq!(sanitize_sheet_name("My Sheet", 0, true), "MySheet");
        assert_eq!(sanitize_sheet_name("   ", 4, true), "Sheet5");
    }

    #[test]
    fn test_sanitize_fallbacks() {
        assert_eq!(sanitize_sheet_name("", 0, false), "Sheet1");
        assert_eq!(sanitize_sheet_name("..", 2, false), "Sheet3");
        assert_eq!(sanitize_sheet_name("?", 0, false), "_");
    }

    #[test]
    fn test_duplicate_names_get_suffixes() {
        let mut namer = EntryNamer::new();
        assert_eq!(namer.entry_name("Data"), "Data.csv");
        assert_eq!(namer.entry_name("Data"), "Data_2.csv");
        assert_eq!(namer.entry_name("data"), "data_3.csv");
        assert_eq!(namer.entry_name("Other"), "Other.csv");
    }

    #[test]
    fn test_suffix_skips_taken_names() {
        let mut namer = EntryNamer::new();
        assert_eq!(namer.entry_name("A_2"), "A_2.csv");
        assert_eq!(namer.entry_name("A"), "A.csv");
        assert_eq!(namer.entry_name("A"), "A_3.csv");
    }

    #[test]
    fn test_archive_file_name() {
        assert_eq!(archive_file_name("Book.xlsx"), "Book_csv.zip");
        assert_eq!(archive_file_name("OLD.XLS"), "OLD_csv.zip");
        assert_eq!(archive_file_name("dir/report.v2.xlsm"), "report.v2_csv.zip");
        assert_eq!(archive_file_name("notes.txt"), "notes.txt_csv.zip");
        assert_eq!(archive_file_name("plain"), "plain_csv.zip");
        assert_eq!(archive_file_name(".xlsx"), ".xlsx_csv.zip");
    }
}
