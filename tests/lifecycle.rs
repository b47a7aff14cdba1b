//! End-to-end workspace lifecycle through the public API.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use ocenv::{Environment, Options, Supervisor, workspace};

fn mode(path: &Path) -> u32 {
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[test]
fn test_setup_then_delete_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let kubeconfig = dir.path().join("kc");
    fs::write(&kubeconfig, "apiVersion: v1\nkind: Config\n").unwrap();

    let env = Environment::new(
        &dir.path().join("envs"),
        Options {
            alias: Some("test".to_string()),
            kubeconfig: Some(kubeconfig),
            ..Options::default()
        },
    )
    .unwrap();

    env.setup().unwrap();
    let root = env.path().to_path_buf();
    assert_eq!(mode(&root.join("kubeconfig.json")), 0o600);
    assert_eq!(mode(&root.join("bin").join("ocd")), 0o700);
    assert!(!root.join("bin").join("ocl").exists());
    assert_eq!(workspace::list(&dir.path().join("envs")).unwrap(), vec!["test"]);

    let mut export = Vec::new();
    env.print_kubeconfig_export(&mut export).unwrap();
    assert_eq!(
        String::from_utf8(export).unwrap(),
        format!("export KUBECONFIG={}/kubeconfig.json\n", root.display())
    );

    env.delete();
    assert!(!root.exists());
    env.delete();
    assert!(!root.exists());
}

#[test]
fn test_setup_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::new(
        dir.path(),
        Options {
            cluster_id: Some("abc123".to_string()),
            ..Options::default()
        },
    )
    .unwrap();

    env.setup().unwrap();
    let vars = fs::read_to_string(env.workspace().vars_path()).unwrap();
    env.setup().unwrap();

    assert_eq!(fs::read_to_string(env.workspace().vars_path()).unwrap(), vars);
    assert_eq!(vars.matches("CLUSTERID=abc123").count(), 1);
    assert!(env.workspace().bin_path().join("ocl").exists());
}

#[test]
fn test_session_in_prepared_workspace() {
    let dir = tempfile::tempdir().unwrap();
    let env = Environment::new(
        &dir.path().join("envs"),
        Options {
            alias: Some("session".to_string()),
            cluster_id: Some("abc123".to_string()),
            ..Options::default()
        },
    )
    .unwrap();
    env.setup().unwrap();

    let shell = dir.path().join("shell.sh");
    fs::write(
        &shell,
        "#!/bin/sh\nprintf '%s\\n%s\\n' \"$CLUSTERID\" \"$KUBECONFIG\" > env.out\n",
    )
    .unwrap();
    fs::set_permissions(&shell, fs::Permissions::from_mode(0o755)).unwrap();

    let mut supervisor = Supervisor::new(
        env.workspace().clone(),
        env.alias(),
        &shell.display().to_string(),
        Vec::new(),
    )
    .job_control(false);
    assert!(supervisor.start().unwrap().success());

    let seen = fs::read_to_string(env.path().join("env.out")).unwrap();
    assert_eq!(
        seen,
        format!(
            "abc123\n{}\n",
            env.workspace().kubeconfig_path().display()
        )
    );
}
