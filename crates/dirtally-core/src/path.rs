//! Path-string helpers.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Windows path separator.
pub const WIN_SEPARATOR: char = '\\';
/// Unix path separator.
pub const NIX_SEPARATOR: char = '/';

static SHARE_WITH_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\\([^\\]+)\\(.)\$\\(.*)").unwrap());
static SHARE_ROOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\\\([^\\]+)\\(.)\$").unwrap());

/// File name without its final extension.
pub fn base_name(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether the path starts with a doubled separator (UNC share or `//host`).
pub fn is_share(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(WIN_SEPARATOR), Some(WIN_SEPARATOR)) | (Some(NIX_SEPARATOR), Some(NIX_SEPARATOR))
    )
}

/// Rewrite an administrative share (`\\host\C$\dir`) to its drive path (`C:\dir`).
///
/// Paths that are not administrative shares are returned unchanged.
pub fn share_to_abs(path: &str) -> String {
    if is_share(path) {
        if SHARE_WITH_PATH.is_match(path) {
            return SHARE_WITH_PATH.replace_all(path, r"${2}:\${3}").into_owned();
        }
        if SHARE_ROOT.is_match(path) {
            return SHARE_ROOT.replace_all(path, r"${2}:\").into_owned();
        }
    }
    path.to_string()
}

/// Number of separators in the path, not counting a share's leading pair.
///
/// `sep` defaults to the platform separator.
pub fn path_depth(path: &str, sep: Option<char>) -> usize {
    let sep = sep.unwrap_or(std::path::MAIN_SEPARATOR);
    let doubled: String = [sep, sep].iter().collect();

    let mut cleaned = path.replace(&doubled, &sep.to_string());
    if cleaned.len() > 1 && sep == NIX_SEPARATOR && cleaned.ends_with(sep) {
        cleaned.pop();
    }

    let count = cleaned.matches(sep).count();
    if is_share(path) {
        count.saturating_sub(1)
    } else {
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/path/to/file.txt"), "file");
        assert_eq!(base_name("/path/to/file.txt.ext"), "file.txt");
        assert_eq!(base_name("/パス/トゥ/日本語パス.txt.ext"), "日本語パス.txt");
    }

    #[test]
    fn test_is_share() {
        assert!(is_share(r"\\host\c$"));
        assert!(is_share("//host/share"));
        assert!(!is_share(r"C:\dir"));
        assert!(!is_share("/"));
        assert!(!is_share(""));
    }

    #[test]
    fn test_share_to_abs() {
        assert_eq!(share_to_abs(r"\\192.168.1.1\C$\test\hoge\bar.txt"), r"C:\test\hoge\bar.txt");
        assert_eq!(
            share_to_abs(r"\\10.10.99.88\d$\パス\トゥ\日本語パス.txt.ext"),
            r"d:\パス\トゥ\日本語パス.txt.ext"
        );
        assert_eq!(
            share_to_abs(r"\\10.10.99.88\d\パス\トゥ\日本語パス.txt.ext"),
            r"\\10.10.99.88\d\パス\トゥ\日本語パス.txt.ext"
        );
        assert_eq!(share_to_abs(r"\\10.10.99.88\C$"), r"C:\");
        assert_eq!(share_to_abs(r"\\10.10.99.88\d$"), r"d:\");
    }

    #[test]
    fn test_path_depth() {
        let win = Some(WIN_SEPARATOR);
        assert_eq!(path_depth(r"C:\test\hoge\bar.txt", win), 3);
        assert_eq!(path_depth(r"\\10.10.99.88\d$\パス\トゥ\日本語パス.txt.ext", win), 4);
        assert_eq!(path_depth(r"C:\", win), 1);
        assert_eq!(path_depth("C:", win), 0);
        assert_eq!(path_depth(r"\\10.10.99.88\C$\", win), 2);
        assert_eq!(path_depth(r"\\10.10.99.88\C$", win), 1);
        assert_eq!(path_depth("/usr/local/bin/", Some(NIX_SEPARATOR)), 3);
    }
}
