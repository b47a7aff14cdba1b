//! Writing credentials and shell variables into the workspace.

use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{EnvError, Result};
use crate::workspace::{self, vars};

use super::Environment;

const SECRET_MODE: u32 = 0o600;

/// Write `data` to `path` as an owner-only file, replacing any previous content.
pub(super) fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(SECRET_MODE)
        .open(path)?;
    file.write_all(data)?;
    // mode() only applies on creation
    fs::set_permissions(path, Permissions::from_mode(SECRET_MODE))
}

/// Write `data` into a file `ensure_file` just created, removing the file if
/// the write fails so the next setup starts from scratch.
fn write_or_discard(mut file: impl Write, path: &Path, data: &[u8]) -> Result<()> {
    let written = file.write_all(data).and_then(|()| file.flush());
    drop(file);
    written.map_err(|e| {
        if let Err(remove) = fs::remove_file(path) {
            warn!("Failed to remove partial {}: {}", path.display(), remove);
        }
        EnvError::setup(path, e)
    })
}

impl Environment {
    /// Copy the kubeconfig source into `kubeconfig.json` with mode 0600.
    ///
    /// Without a source this does nothing and the login helper is expected
    /// to produce credentials instead.
    pub fn create_kubeconfig(&self) -> Result<()> {
        let Some(source) = self.credentials.kubeconfig() else {
            return Ok(());
        };
        let target = self.workspace.kubeconfig_path();

        let data = source.read().map_err(|e| match source {
            super::KubeconfigSource::File(path) => EnvError::setup(path, e),
            super::KubeconfigSource::Bytes(_) => EnvError::setup(&target, e),
        })?;
        write_private(&target, &data).map_err(|e| EnvError::setup(&target, e))?;

        debug!("Wrote kubeconfig to {}", target.display());
        Ok(())
    }

    /// Copy the user's OCM config into the workspace unless one is there.
    ///
    /// Missing or unreadable sources only produce a warning.
    pub fn copy_ocm_config(&self, source: &Path) {
        let target = self.workspace.ocm_config_path();
        if target.exists() || source == target {
            return;
        }
        match fs::read(source) {
            Ok(data) => {
                if let Err(e) = write_private(&target, &data) {
                    warn!("Failed to copy OCM config to {}: {}", target.display(), e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to read OCM config {}: {}", source.display(), e),
        }
    }

    /// Variables exported into the workspace shell, in file order.
    pub fn env_variables(&self) -> Vec<(&'static str, String)> {
        let inherited_path = std::env::var("PATH").unwrap_or_default();
        let path = if inherited_path.is_empty() {
            self.workspace.bin_path().display().to_string()
        } else {
            format!("{}:{}", self.workspace.bin_path().display(), inherited_path)
        };

        let mut vars = vec![
            (
                "KUBECONFIG",
                self.workspace.kubeconfig_path().display().to_string(),
            ),
            (
                "OCM_CONFIG",
                self.workspace.ocm_config_path().display().to_string(),
            ),
            ("PS1", format!("[{} $(kube_ps1)] $ ", self.alias)),
            ("PATH", path),
        ];
        if let Some(cluster_id) = self.credentials.cluster_id() {
            vars.push(("CLUSTERID", cluster_id.to_string()));
        }
        if let Some(external_id) = &self.external_id {
            vars.push(("EXTERNALID", external_id.clone()));
        }
        if let Some(base_domain) = &self.base_domain {
            vars.push(("BASEDOMAIN", base_domain.clone()));
        }
        vars
    }

    /// Write `.ocenv` and `.zshenv` if they do not exist yet.
    ///
    /// Existing files are never appended to, so re-running setup does not
    /// duplicate lines.
    pub fn ensure_env_variables(&self) -> Result<()> {
        let vars_path = self.workspace.vars_path();
        if let Some(file) = workspace::ensure_file(&vars_path)? {
            let content: String = self
                .env_variables()
                .iter()
                .map(|(key, value)| vars::encode_line(key, value))
                .collect();
            write_or_discard(file, &vars_path, content.as_bytes())?;
        }

        let init_path = self.workspace.shell_init_path();
        if let Some(file) = workspace::ensure_file(&init_path)? {
            write_or_discard(file, &init_path, b"setopt PROMPT_SUBST\nsource .ocenv\n")?;
        }
        Ok(())
    }

    /// The `export KUBECONFIG=...` line for use outside the managed shell.
    pub fn kubeconfig_export(&self) -> String {
        format!(
            "export KUBECONFIG={}/{}\n",
            self.workspace.root().display(),
            workspace::KUBECONFIG_FILE
        )
    }

    pub fn print_kubeconfig_export(&self, out: &mut impl Write) -> io::Result<()> {
        out.write_all(self.kubeconfig_export().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::env::Options;

    fn env_in(root: &Path, opts: Options) -> Environment {
        let env = Environment::new(root, opts).unwrap();
        env.workspace().create().unwrap();
        env
    }

    fn mode(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn test_print_kubeconfig_export() {
        let env = Environment::new(
            Path::new("/home/user/ocenv"),
            Options {
                alias: Some("test".to_string()),
                kubeconfig: Some(PathBuf::from("/tmp/kc")),
                ..Options::default()
            },
        )
        .unwrap();

        let mut buf = Vec::new();
        env.print_kubeconfig_export(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "export KUBECONFIG=/home/user/ocenv/test/kubeconfig.json\n"
        );
    }

    #[test]
    fn test_create_kubeconfig_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("test-kubeconfig");
        fs::write(&source, b"test-kubeconfig-content").unwrap();

        let env = env_in(
            dir.path(),
            Options {
                alias: Some("kc".to_string()),
                kubeconfig: Some(source),
                ..Options::default()
            },
        );
        env.create_kubeconfig().unwrap();

        let target = env.workspace().kubeconfig_path();
        assert_eq!(fs::read(&target).unwrap(), b"test-kubeconfig-content");
        assert_eq!(mode(&target), 0o600);
    }

    #[test]
    fn test_create_kubeconfig_tightens_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_in(
            dir.path(),
            Options {
                alias: Some("kc".to_string()),
                cluster_id: Some("abc".to_string()),
                kubeconfig_bytes: Some(b"fetched".to_vec()),
                ..Options::default()
            },
        );
        let target = env.workspace().kubeconfig_path();
        fs::write(&target, "old").unwrap();
        fs::set_permissions(&target, Permissions::from_mode(0o644)).unwrap();

        env.create_kubeconfig().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"fetched");
        assert_eq!(mode(&target), 0o600);
    }

    #[test]
    fn test_no_kubeconfig_source() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_in(
            dir.path(),
            Options {
                alias: Some("none".to_string()),
                ..Options::default()
            },
        );
        env.create_kubeconfig().unwrap();
        assert!(!env.workspace().kubeconfig_path().exists());
    }

    #[test]
    fn test_missing_kubeconfig_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_in(
            dir.path(),
            Options {
                alias: Some("broken".to_string()),
                kubeconfig: Some(dir.path().join("does-not-exist")),
                ..Options::default()
            },
        );
        assert!(matches!(env.create_kubeconfig(), Err(EnvError::Setup { .. })));
    }

    #[test]
    fn test_ensure_env_variables() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [
            (None, false),
            (Some("test-cluster".to_string()), true),
        ];

        for (i, (cluster_id, expect_cluster)) in cases.into_iter().enumerate() {
            let env = env_in(
                dir.path(),
                Options {
                    alias: Some(format!("env-{i}")),
                    cluster_id,
                    ..Options::default()
                },
            );
            env.ensure_env_variables().unwrap();

            let content = fs::read_to_string(env.workspace().vars_path()).unwrap();
            for key in ["KUBECONFIG=", "OCM_CONFIG=", "PS1=", "PATH="] {
                assert!(content.contains(key), "missing {key} in {content}");
            }
            assert_eq!(content.contains("CLUSTERID=test-cluster"), expect_cluster);
            assert_eq!(content.contains("CLUSTERID="), expect_cluster);

            let init = fs::read_to_string(env.workspace().shell_init_path()).unwrap();
            assert!(init.contains("source .ocenv"));
        }
    }

    #[test]
    fn test_ensure_env_variables_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_in(
            dir.path(),
            Options {
                alias: Some("twice".to_string()),
                cluster_id: Some("abc".to_string()),
                ..Options::default()
            },
        );
        env.ensure_env_variables().unwrap();
        let first = fs::read_to_string(env.workspace().vars_path()).unwrap();
        env.ensure_env_variables().unwrap();
        let second = fs::read_to_string(env.workspace().vars_path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.matches("KUBECONFIG=").count(), 1);
    }

    #[test]
    fn test_vars_load_back_with_bin_first_on_path() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_in(
            dir.path(),
            Options {
                alias: Some("parsed".to_string()),
                external_id: Some("ext-1".to_string()),
                ..Options::default()
            },
        );
        env.ensure_env_variables().unwrap();

        let parsed = vars::load(&env.workspace().vars_path()).unwrap().unwrap();
        let get = |key: &str| {
            parsed
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(get("PS1"), "[parsed $(kube_ps1)] $ ");
        assert!(get("PATH").starts_with(&env.workspace().bin_path().display().to_string()));
        assert_eq!(get("EXTERNALID"), "ext-1");
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from_raw_os_error(28))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ocenv");
        fs::write(&path, "KUBECONFIG=/half").unwrap();

        let err = write_or_discard(FullDisk, &path, b"KUBECONFIG=/full\n").unwrap_err();
        assert!(matches!(err, EnvError::Setup { .. }));
        assert!(!path.exists());

        // The next run creates the file again instead of skipping it.
        let file = workspace::ensure_file(&path).unwrap().unwrap();
        write_or_discard(file, &path, b"KUBECONFIG=/full\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "KUBECONFIG=/full\n");
    }

    #[test]
    fn test_copy_ocm_config_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("ocm.json");
        fs::write(&source, r#"{"access_token":"x"}"#).unwrap();
        let env = env_in(
            dir.path(),
            Options {
                alias: Some("ocm".to_string()),
                ..Options::default()
            },
        );

        env.copy_ocm_config(&source);
        let target = env.workspace().ocm_config_path();
        assert_eq!(fs::read_to_string(&target).unwrap(), r#"{"access_token":"x"}"#);
        assert_eq!(mode(&target), 0o600);

        fs::write(&source, "changed").unwrap();
        env.copy_ocm_config(&source);
        assert_eq!(fs::read_to_string(&target).unwrap(), r#"{"access_token":"x"}"#);

        // Missing sources are tolerated.
        env.copy_ocm_config(&dir.path().join("missing.json"));
    }
}
