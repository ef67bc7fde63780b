use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use robodeploy::defaults::TransportConfig;
use robodeploy::hosts::{HostConfig, HostSessionFactory};
use robodeploy::local::LocalSession;
use robodeploy::{DeployTarget, DeploymentRun, Orchestrator, Session};
use tempfile::TempDir;

fn local_factory() -> HostSessionFactory {
    let mut hosts = BTreeMap::new();
    hosts.insert("local".to_string(), HostConfig::local());
    HostSessionFactory::new(hosts, TransportConfig::default())
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn replacing_lib_removes_stale_files() {
    let build = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let root = remote.path().join("app");

    write(&build.path().join("lib/a.jar"), "a2");
    write(&build.path().join("lib/b.jar"), "b");
    write(&root.join("lib/a.jar"), "a1");
    write(&root.join("lib/stale.jar"), "old");

    let target = DeployTarget::builder("local", root.to_string_lossy())
        .ensure_empty_dir("lib")
        .copy(build.path().join("lib"), "lib")
        .run(format!("ls {}", root.join("lib").display()))
        .build()
        .unwrap();

    let factory = local_factory();
    let report = Orchestrator::new(&factory)
        .run(&DeploymentRun::single(target))
        .unwrap();

    assert_eq!(listing(&root.join("lib")), vec!["a.jar", "b.jar"]);
    assert_eq!(fs::read_to_string(root.join("lib/a.jar")).unwrap(), "a2");
    let output = report.targets[0].steps[3].output.as_ref().unwrap();
    assert!(output.stdout.contains("b.jar"));
}

#[test]
fn copy_without_clear_merges_into_existing_tree() {
    let build = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let dest = remote.path().join("bin");

    write(&build.path().join("bin/valkyrie"), "new");
    write(&dest.join("valkyrie"), "old");
    write(&dest.join("extra.sh"), "keep");

    let mut session = LocalSession::new("local");
    let dest_str = dest.to_string_lossy().to_string();
    session.copy_to(&build.path().join("bin"), &dest_str).unwrap();
    // Copying the same tree twice leaves the same result.
    session.copy_to(&build.path().join("bin"), &dest_str).unwrap();

    assert_eq!(listing(&dest), vec!["extra.sh", "valkyrie"]);
    assert_eq!(fs::read_to_string(dest.join("valkyrie")).unwrap(), "new");
    assert_eq!(fs::read_to_string(dest.join("extra.sh")).unwrap(), "keep");
}

#[test]
fn remove_then_mkdir_yields_empty_dir_from_any_state() {
    let remote = TempDir::new().unwrap();
    let mut session = LocalSession::new("local");

    let absent = remote.path().join("absent");
    let file = remote.path().join("file");
    let tree = remote.path().join("tree");
    fs::write(&file, "x").unwrap();
    write(&tree.join("deep/nested/file"), "x");

    for path in [&absent, &file, &tree] {
        let p = path.to_string_lossy().to_string();
        session.remove_path(&p).unwrap();
        session.create_dir(&p).unwrap();
        assert!(path.is_dir());
        assert!(listing(path).is_empty());
    }
}

#[test]
fn failing_local_command_aborts_with_exit_status() {
    let remote = TempDir::new().unwrap();
    let root = remote.path().to_string_lossy().to_string();

    let target = DeployTarget::builder("local", root)
        .run("exit 7")
        .mkdir("never")
        .build()
        .unwrap();

    let factory = local_factory();
    let err = Orchestrator::new(&factory)
        .run(&DeploymentRun::single(target))
        .unwrap_err();

    assert_eq!(err.details["stepIndex"], 0);
    assert_eq!(err.details["cause"]["details"]["exitCode"], 7);
    assert!(!remote.path().join("never").exists());
}
