//! Shared helpers for kubeswitch.

/// Case-insensitive check for any of `signals` inside `value`.
///
/// `signals` are expected to be lowercase already.
pub fn contains_any_signal(value: &str, signals: &[&str]) -> bool {
    let lowered = value.to_lowercase();
    signals.iter().any(|signal| lowered.contains(signal))
}

/// Split a path-list variable such as `KUBECONFIG` and return its first
/// non-empty entry.
pub fn first_path_entry(value: &std::ffi::OsStr) -> Option<std::path::PathBuf> {
    std::env::split_paths(value).find(|path| !path.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_match_ignores_case() {
        assert!(contains_any_signal("Payments-PROD", &["prod", "prd"]));
        assert!(!contains_any_signal("payments", &["prod", "prd"]));
        assert!(!contains_any_signal("", &["prod"]));
    }

    #[cfg(unix)]
    #[test]
    fn first_path_entry_skips_empty_segments() {
        let value = std::ffi::OsString::from(":/tmp/a:/tmp/b");
        assert_eq!(
            first_path_entry(&value),
            Some(std::path::PathBuf::from("/tmp/a"))
        );
        assert_eq!(first_path_entry(&std::ffi::OsString::new()), None);
    }
}
