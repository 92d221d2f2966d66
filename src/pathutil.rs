//! Path normalization and exclude-glob matching used by the seeding walker.

use std::path::{Path, PathBuf};

/// Normalize a path for catalog storage: forward slashes only, portable across platforms.
pub fn path_to_db_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// OS-specific junk files the walker should never catalog.
pub fn is_os_hidden_file(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(".DS_Store") | Some("Thumbs.db") | Some("ehthumbs.db") | Some("Desktop.ini")
        | Some(".directory") => true,
        Some(name) => name.starts_with("._"),
        None => false,
    }
}

/// Small glob matcher supporting `*` and `?`, sufficient for exclude patterns.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.strip_prefix('!').unwrap_or(pattern);
    let mut pattern_chars = pattern.chars().peekable();
    let mut text_chars = text.chars().peekable();

    while let Some(&p) = pattern_chars.peek() {
        match p {
            '*' => {
                pattern_chars.next();
                if pattern_chars.peek().is_none() {
                    return true;
                }
                while text_chars.peek().is_some() {
                    if glob_match(
                        &pattern_chars.clone().collect::<String>(),
                        &text_chars.clone().collect::<String>(),
                    ) {
                        return true;
                    }
                    text_chars.next();
                }
                return false;
            }
            '?' => {
                pattern_chars.next();
                if text_chars.next().is_none() {
                    return false;
                }
            }
            _ => {
                pattern_chars.next();
                if text_chars.next() != Some(p) {
                    return false;
                }
            }
        }
    }
    text_chars.peek().is_none()
}

/// Should this walked path be catalogued? Excludes the root itself, the catalog file,
/// hidden junk files, and anything matching a configured glob (by name or full path).
pub fn should_include_in_walk(
    path: &Path,
    root: &Path,
    db_canonical: &Option<PathBuf>,
    exclude_patterns: &[String],
) -> bool {
    if path == root {
        return false;
    }
    if let Some(db) = db_canonical
        && path == db.as_path()
    {
        return false;
    }
    if is_os_hidden_file(path) {
        return false;
    }
    if exclude_patterns.is_empty() {
        return true;
    }
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return true,
    };
    let path_str = path.to_str().unwrap_or("");
    for pattern in exclude_patterns {
        if glob_match(pattern, name) || glob_match(pattern, path_str) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes() {
        assert_eq!(path_to_db_string(&PathBuf::from("a\\b")), "a/b");
    }

    #[test]
    fn glob_star_matches_suffix() {
        assert!(glob_match("*.log", "foo.log"));
        assert!(!glob_match("*.log", "foo.log.txt"));
    }

    #[test]
    fn glob_question_matches_single_char() {
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "abbc"));
    }

    #[test]
    fn should_include_excludes_root_and_hidden() {
        let root = PathBuf::from("/foo");
        assert!(!should_include_in_walk(&root, &root, &None, &[]));
        let hidden = PathBuf::from("/foo/.DS_Store");
        assert!(!should_include_in_walk(&hidden, &root, &None, &[]));
    }

    #[test]
    fn should_include_respects_exclude_glob() {
        let root = PathBuf::from("/foo");
        let path = PathBuf::from("/foo/node_modules");
        assert!(!should_include_in_walk(
            &path,
            &root,
            &None,
            &["node_modules".to_string()]
        ));
        let ok = PathBuf::from("/foo/src/main.rs");
        assert!(should_include_in_walk(
            &ok,
            &root,
            &None,
            &["node_modules".to_string()]
        ));
    }
}
