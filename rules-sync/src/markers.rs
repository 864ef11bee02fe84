//! Inline sync directives: `@kody-sync` and `@kody-ignore`.
//!
//! Markers override the default sync policy per file:
//! - `@kody-sync` forces a file through even when org-level sync is disabled;
//! - `@kody-ignore` excludes a file and soft-deletes any rule it produced.
//!
//! Only the head and tail of a file are scanned (markers live next to file
//! headers or footers): for files of 20 lines or fewer the two halves cover
//! the whole file with no overlap; longer files get exactly the first 10 and
//! last 10 lines.
//!
//! Matching is case-insensitive and boundary-safe: the marker must be
//! preceded and followed by a non-alphanumeric character (or line edge), so
//! `word@kody-sync` and `@kody-syncABC` never match.

use lazy_static::lazy_static;
use regex::Regex;

const HEAD_TAIL_LINES: usize = 10;
const SMALL_FILE_LINES: usize = 20;

lazy_static! {
    static ref SYNC_RE: Regex = marker_regex("kody-sync");
    static ref IGNORE_RE: Regex = marker_regex("kody-ignore");
}

fn marker_regex(token: &str) -> Regex {
    // (^|non-alnum) @token (non-alnum|$); the token itself contains a dash,
    // which is literal inside the alternation-free body.
    let pattern = format!(r"(?i)(^|[^A-Za-z0-9])@{token}([^A-Za-z0-9]|$)");
    Regex::new(&pattern).expect("marker regex is static and valid")
}

/// True if the file carries `@kody-sync` in its head or tail window.
pub fn should_force_sync(content: &str) -> bool {
    scan_windows(content, &SYNC_RE)
}

/// True if the file carries `@kody-ignore` in its head or tail window.
pub fn should_ignore(content: &str) -> bool {
    scan_windows(content, &IGNORE_RE)
}

fn scan_windows(content: &str, re: &Regex) -> bool {
    let lines: Vec<&str> = content.lines().collect();
    let (head, tail): (&[&str], &[&str]) = if lines.len() <= SMALL_FILE_LINES {
        // Two non-overlapping halves (together: the whole file).
        lines.split_at(lines.len() / 2)
    } else {
        (
            &lines[..HEAD_TAIL_LINES],
            &lines[lines.len() - HEAD_TAIL_LINES..],
        )
    };
    head.iter().chain(tail.iter()).any(|line| re.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_marker_matches() {
        assert!(should_force_sync("@kody-sync"));
        assert!(should_ignore("@kody-ignore"));
    }

    #[test]
    fn leading_space_and_comment_prefixes_match() {
        assert!(should_force_sync(" @kody-sync"));
        assert!(should_force_sync("// @kody-sync"));
        assert!(should_force_sync("<!-- @kody-sync -->"));
        assert!(should_force_sync("# @KODY-SYNC"));
    }

    #[test]
    fn alnum_boundary_before_at_rejects() {
        assert!(!should_force_sync("word@kody-sync"));
        assert!(!should_force_sync("foo@kody-sync-bar"));
    }

    #[test]
    fn alnum_boundary_after_token_rejects() {
        assert!(!should_force_sync("@kody-syncABC"));
        assert!(!should_force_sync("xyz@kody-syncABC"));
        // The ignore marker must not trip the sync marker even though
        // "@kody-ignore" is not a prefix of "@kody-sync".
        assert!(!should_force_sync("@kody-ignore"));
    }

    #[test]
    fn small_files_are_scanned_fully() {
        // 15 lines, marker in the middle: both halves together cover it.
        let mut lines = vec!["line"; 15];
        lines[7] = "// @kody-ignore";
        let content = lines.join("\n");
        assert!(should_ignore(&content));
    }

    #[test]
    fn long_files_scan_only_head_and_tail() {
        // 40 lines, marker buried at line 20: outside both windows.
        let mut lines = vec!["line"; 40];
        lines[19] = "// @kody-sync";
        let content = lines.join("\n");
        assert!(!should_force_sync(&content));

        // Same marker in the last 10 lines is seen.
        let mut lines = vec!["line"; 40];
        lines[35] = "// @kody-sync";
        let content = lines.join("\n");
        assert!(should_force_sync(&content));
    }

    #[test]
    fn marker_in_tail_window_of_ignored_file() {
        let mut lines = vec!["content"; 30];
        lines[29] = "@kody-ignore";
        assert!(should_ignore(&lines.join("\n")));
    }
}
