//! Helper scripts written into the workspace `bin/` directory.

use std::fs::{self, OpenOptions, Permissions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use tracing::debug;

use crate::error::{EnvError, Result};
use crate::workspace::vars::quote;

use super::Environment;

const SCRIPT_MODE: u32 = 0o700;
const PROMETHEUS_PORT: u16 = 9090;

/// Companion file for `kube_ps1`; defines the prompt function.
const KUBE_PS1_LIB: &str = r#"# Prompt segment showing the current kube context and namespace.
kube_ps1() {
  local ctx ns
  ctx="$(oc config current-context 2>/dev/null)" || ctx=""
  if [ -z "$ctx" ]; then
    printf '(no context)'
    return 0
  fi
  ns="$(oc config view --minify -o 'jsonpath={..namespace}' 2>/dev/null)"
  printf '(%s:%s)' "${ctx##*/}" "${ns:-default}"
}
"#;

fn write_script(path: &Path, body: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(SCRIPT_MODE)
        .open(path)
        .map_err(|e| EnvError::setup(path, e))?;
    file.write_all(body.as_bytes())
        .map_err(|e| EnvError::setup(path, e))?;
    fs::set_permissions(path, Permissions::from_mode(SCRIPT_MODE))
        .map_err(|e| EnvError::setup(path, e))
}

impl Environment {
    /// Script names and bodies for this environment's credential mode.
    pub fn scripts(&self) -> Vec<(&'static str, String)> {
        let root = self.workspace.root().display().to_string();
        let bin = self.workspace.bin_path().display().to_string();
        let pids = self.workspace.pids_path().display().to_string();

        let mut scripts = Vec::with_capacity(5);

        if let Some(login) = self.credentials.login_command() {
            scripts.push((
                "ocl",
                format!("#!/usr/bin/env bash\nset -euo pipefail\ncd {}\n{}\n", quote(&root), login),
            ));
        }

        scripts.push((
            "ocb",
            format!(
                r#"#!/usr/bin/env bash
set -euo pipefail
port="${{1:-{port}}}"
oc -n openshift-monitoring port-forward svc/prometheus-k8s "${{port}}:9091" >/dev/null 2>&1 &
echo "$!" >> {pids}
sleep 2
url="http://localhost:${{port}}"
if command -v xdg-open >/dev/null 2>&1; then
  xdg-open "$url"
elif command -v open >/dev/null 2>&1; then
  open "$url"
else
  echo "$url"
fi
"#,
                port = PROMETHEUS_PORT,
                pids = quote(&pids),
            ),
        ));

        let describe = match self.credentials.cluster_id() {
            Some(cluster_id) => format!("ocm describe cluster {} \"$@\"", quote(cluster_id)),
            None => "oc get clusterversion,infrastructure -o wide \"$@\"".to_string(),
        };
        scripts.push((
            "ocd",
            format!("#!/usr/bin/env bash\nset -euo pipefail\n{describe}\n"),
        ));

        scripts.push((
            "kube_ps1",
            format!(
                "#!/usr/bin/env bash\nsource {}\nkube_ps1\n",
                quote(&format!("{bin}/kube-ps1.sh"))
            ),
        ));
        scripts.push(("kube-ps1.sh", KUBE_PS1_LIB.to_string()));

        scripts
    }

    /// Write every helper script into `bin/` with mode 0700.
    ///
    /// Existing scripts are overwritten, never appended to.
    pub fn create_bins(&self) -> Result<()> {
        let bin = self.workspace.bin_path();
        for (name, body) in self.scripts() {
            let path = bin.join(name);
            write_script(&path, &body)?;
            debug!("Wrote helper {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use super::*;
    use crate::env::Options;

    fn bins_for(root: &Path, alias: &str, opts: Options) -> BTreeSet<String> {
        let env = Environment::new(
            root,
            Options {
                alias: Some(alias.to_string()),
                ..opts
            },
        )
        .unwrap();
        env.workspace().create().unwrap();
        env.create_bins().unwrap();

        let mut names = BTreeSet::new();
        for entry in fs::read_dir(env.workspace().bin_path()).unwrap() {
            let entry = entry.unwrap();
            let mode = entry.metadata().unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700, "{:?} has mode {:o}", entry.file_name(), mode);
            names.insert(entry.file_name().to_string_lossy().to_string());
        }
        names
    }

    #[test]
    fn test_create_bins_per_mode() {
        let dir = tempfile::tempdir().unwrap();

        let token = bins_for(
            dir.path(),
            "token",
            Options {
                cluster_id: Some("test-cluster".to_string()),
                ..Options::default()
            },
        );
        let kubeconfig = bins_for(
            dir.path(),
            "kubeconfig",
            Options {
                kubeconfig: Some(PathBuf::from("test-kubeconfig")),
                ..Options::default()
            },
        );

        let expected_token: BTreeSet<String> = ["ocl", "ocb", "ocd", "kube_ps1", "kube-ps1.sh"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(token, expected_token);
        assert!(!kubeconfig.contains("ocl"));
        assert!(kubeconfig.is_subset(&token));
        assert!(kubeconfig.len() < token.len());
    }

    #[test]
    fn test_create_bins_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::new(
            dir.path(),
            Options {
                alias: Some("again".to_string()),
                cluster_id: Some("abc".to_string()),
                ..Options::default()
            },
        )
        .unwrap();
        env.workspace().create().unwrap();

        env.create_bins().unwrap();
        let ocl = env.workspace().bin_path().join("ocl");
        let first = fs::read_to_string(&ocl).unwrap();
        env.create_bins().unwrap();

        assert_eq!(fs::read_to_string(&ocl).unwrap(), first);
        assert!(first.contains("ocm cluster login --token abc"));
    }

    #[test]
    fn test_browser_helper_records_pid() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::new(
            dir.path(),
            Options {
                alias: Some("prom".to_string()),
                ..Options::default()
            },
        )
        .unwrap();

        let scripts = env.scripts();
        let (_, ocb) = scripts.iter().find(|(name, _)| *name == "ocb").unwrap();
        let pids = env.workspace().pids_path().display().to_string();
        assert!(ocb.contains(&format!("echo \"$!\" >> {}", quote(&pids))));
        assert!(ocb.contains("port=\"${1:-9090}\""));
    }
}
