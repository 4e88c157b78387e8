//! Filesystem-backed persistence for kubeconfig documents.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt::Display;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use ks_core::{ConfigStore, CoreError, CoreResult, KubeConfig};
use ks_utils::first_path_entry;

/// Environment variable that overrides the kubeconfig location.
pub const KUBECONFIG_ENV: &str = "KUBECONFIG";

/// Filesystem kubeconfig store.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsConfigStore;

impl FsConfigStore {
    /// Create a new filesystem store.
    pub fn new() -> Self {
        Self
    }

    /// Resolve the default kubeconfig path (~/.kube/config).
    pub fn default_path() -> CoreResult<PathBuf> {
        if let Some(dir) = dirs::home_dir() {
            return Ok(dir.join(".kube").join("config"));
        }
        Err(CoreError::Storage(
            "unable to determine a default kubeconfig path".into(),
        ))
    }
}

/// Resolve the kubeconfig path: explicit flag, then `KUBECONFIG`, then the default.
pub fn resolve_kubeconfig_path(explicit: Option<&Path>) -> CoreResult<PathBuf> {
    resolve_with_env(explicit, std::env::var_os(KUBECONFIG_ENV))
}

fn resolve_with_env(explicit: Option<&Path>, env: Option<OsString>) -> CoreResult<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = env.as_deref().and_then(first_path_entry) {
        return Ok(path);
    }
    FsConfigStore::default_path()
}

/// Parse kubeconfig YAML. Empty input yields an empty document.
pub fn parse_kubeconfig(contents: &str) -> CoreResult<KubeConfig> {
    if contents.trim().is_empty() {
        return Ok(KubeConfig::default());
    }
    let config: KubeConfig =
        serde_yaml::from_str(contents).map_err(|err| CoreError::Parse(err.to_string()))?;

    let mut seen = HashSet::new();
    for name in config.context_names() {
        if !seen.insert(name) {
            return Err(CoreError::Parse(format!("duplicate context '{name}'")));
        }
    }
    Ok(config)
}

/// Render a kubeconfig document as YAML.
pub fn render_kubeconfig(config: &KubeConfig) -> CoreResult<String> {
    serde_yaml::to_string(config).map_err(|err| CoreError::Write(err.to_string()))
}

impl ConfigStore for FsConfigStore {
    fn load(&self, path: &Path) -> CoreResult<KubeConfig> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(CoreError::NotFound(path.to_path_buf()));
            }
            Err(err) => {
                return Err(CoreError::Read(format!("{}: {err}", path.display())));
            }
        };
        let config = parse_kubeconfig(&contents)?;
        log::debug!(
            "loaded {} contexts from {}",
            config.contexts.len(),
            path.display()
        );
        Ok(config)
    }

    fn save(&self, config: &KubeConfig, path: &Path) -> CoreResult<()> {
        let contents = render_kubeconfig(config)?;
        // Write through a symlinked kubeconfig instead of replacing the link.
        let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|err| write_error(&target, err))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|err| write_error(&target, err))?;
        if let Ok(metadata) = fs::metadata(&target) {
            temp.as_file()
                .set_permissions(metadata.permissions())
                .map_err(|err| write_error(&target, err))?;
        }
        temp.write_all(contents.as_bytes())
            .map_err(|err| write_error(&target, err))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| write_error(&target, err))?;
        temp.persist(&target)
            .map_err(|err| write_error(&target, err.error))?;

        log::debug!("saved kubeconfig to {}", target.display());
        Ok(())
    }
}

fn write_error(path: &Path, err: impl Display) -> CoreError {
    CoreError::Write(format!("{}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
apiVersion: v1
kind: Config
clusters:
- name: east
  cluster:
    server: https://east.example
users:
- name: ops
  user:
    token: abc
contexts:
- name: dev-a
  context:
    cluster: dev
    user: alice
- name: prod-east
  context:
    cluster: east
    user: ops
    namespace: default
current-context: dev-a
preferences: {}
";

    fn write_sample(temp: &TempDir) -> PathBuf {
        let path = temp.path().join("config");
        fs::write(&path, SAMPLE).expect("write sample");
        path
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let temp = TempDir::new().expect("temp dir");
        let result = FsConfigStore::new().load(&temp.path().join("absent"));
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn load_malformed_file_is_parse_failure() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("config");
        fs::write(&path, "contexts: [unterminated").expect("write");
        let result = FsConfigStore::new().load(&path);
        assert!(matches!(result, Err(CoreError::Parse(_))));
        assert!(result.unwrap_err().is_load_failure());
    }

    #[test]
    fn empty_file_loads_as_empty_document() {
        let config = parse_kubeconfig("  \n").expect("parse");
        assert!(config.contexts.is_empty());
        assert!(config.current_context.is_empty());
    }

    #[test]
    fn duplicate_context_names_are_rejected() {
        let yaml = "contexts:\n- name: a\n  context: {cluster: x}\n- name: a\n  context: {cluster: y}\n";
        assert!(matches!(parse_kubeconfig(yaml), Err(CoreError::Parse(_))));
    }

    #[test]
    fn save_keeps_unmodelled_keys() {
        let temp = TempDir::new().expect("temp dir");
        let path = write_sample(&temp);
        let store = FsConfigStore::new();

        let mut config = store.load(&path).expect("load");
        config.set_current_context("prod-east").expect("switch");
        config.set_namespace("prod-east", "monitoring").expect("namespace");
        store.save(&config, &path).expect("save");

        let reloaded = store.load(&path).expect("reload");
        assert_eq!(reloaded, config);
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("server: https://east.example"));
        assert!(raw.contains("token: abc"));
        assert!(raw.contains("current-context: prod-east"));
        assert!(raw.contains("namespace: monitoring"));
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let temp = TempDir::new().expect("temp dir");
        let path = write_sample(&temp);
        let store = FsConfigStore::new();
        let config = store.load(&path).expect("load");
        store.save(&config, &path).expect("save");

        let files = fs::read_dir(temp.path()).expect("read dir").count();
        assert_eq!(files, 1);
    }

    #[test]
    fn save_into_unwritable_location_is_write_failure() {
        let temp = TempDir::new().expect("temp dir");
        let blocker = temp.path().join("file");
        fs::write(&blocker, "").expect("write");
        let result = FsConfigStore::new().save(&KubeConfig::default(), &blocker.join("config"));
        assert!(matches!(result, Err(CoreError::Write(_))));
    }

    #[cfg(unix)]
    #[test]
    fn save_preserves_permissions_and_symlinks() {
        use std::os::unix::fs::{symlink, PermissionsExt};

        let temp = TempDir::new().expect("temp dir");
        let real = write_sample(&temp);
        fs::set_permissions(&real, fs::Permissions::from_mode(0o640)).expect("chmod");
        let link = temp.path().join("link");
        symlink(&real, &link).expect("symlink");

        let store = FsConfigStore::new();
        let mut config = store.load(&link).expect("load");
        config.set_current_context("prod-east").expect("switch");
        store.save(&config, &link).expect("save");

        assert!(fs::symlink_metadata(&link)
            .expect("link metadata")
            .file_type()
            .is_symlink());
        let mode = fs::metadata(&real).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
        assert_eq!(store.load(&real).expect("load").current_context, "prod-east");
    }

    #[test]
    fn explicit_path_beats_environment() {
        let explicit = PathBuf::from("/tmp/explicit");
        let resolved = resolve_with_env(Some(&explicit), Some(OsString::from("/tmp/env")))
            .expect("resolve");
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn environment_beats_default() {
        let resolved =
            resolve_with_env(None, Some(OsString::from("/tmp/env"))).expect("resolve");
        assert_eq!(resolved, PathBuf::from("/tmp/env"));
    }

    #[test]
    fn empty_environment_falls_back_to_default() {
        if let Ok(default) = FsConfigStore::default_path() {
            let resolved = resolve_with_env(None, Some(OsString::new())).expect("resolve");
            assert_eq!(resolved, default);
            assert!(resolved.ends_with(".kube/config"));
        }
    }
}
