use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use robodeploy::error::ErrorCode;
use robodeploy::utils::command::CapturedOutput;
use robodeploy::{DeployTarget, DeploymentRun, Error, Orchestrator, Result, Session, SessionFactory};
use tempfile::TempDir;

type Log = Rc<RefCell<Vec<String>>>;

/// Records every call; fails the step whose call index matches `fail_at`.
struct RecordingSession {
    alias: String,
    log: Log,
    calls: usize,
    fail_at: Option<usize>,
    exit_code: i32,
}

impl RecordingSession {
    fn record(&mut self, entry: String) -> Result<()> {
        self.log.borrow_mut().push(format!("{}: {}", self.alias, entry));
        let index = self.calls;
        self.calls += 1;
        if self.fail_at == Some(index) {
            return Err(Error::step_execution_failed("fake", entry, "injected failure"));
        }
        Ok(())
    }
}

impl Session for RecordingSession {
    fn host_alias(&self) -> &str {
        &self.alias
    }

    fn remove_path(&mut self, path: &str) -> Result<()> {
        self.record(format!("remove {}", path))
    }

    fn create_dir(&mut self, path: &str) -> Result<()> {
        self.record(format!("mkdir {}", path))
    }

    fn copy_to(&mut self, local: &Path, remote: &str) -> Result<()> {
        self.record(format!("copy {} {}", local.display(), remote))
    }

    fn run_command(&mut self, command: &str) -> Result<CapturedOutput> {
        self.record(format!("run {}", command))?;
        Ok(CapturedOutput::new(self.exit_code, "out".to_string(), "err".to_string()))
    }

    fn close(&mut self) -> Result<()> {
        self.log.borrow_mut().push(format!("{}: close", self.alias));
        Ok(())
    }
}

struct RecordingFactory {
    log: Log,
    fail_at: Option<(String, usize)>,
    exit_code: i32,
    unreachable: Option<String>,
}

impl RecordingFactory {
    fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
            fail_at: None,
            exit_code: 0,
            unreachable: None,
        }
    }

    fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl SessionFactory for RecordingFactory {
    fn open(&self, host_alias: &str) -> Result<Box<dyn Session>> {
        if self.unreachable.as_deref() == Some(host_alias) {
            return Err(Error::session_open_failed(host_alias, None, "Connection refused"));
        }
        self.log.borrow_mut().push(format!("{}: open", host_alias));
        let fail_at = match &self.fail_at {
            Some((alias, index)) if alias == host_alias => Some(*index),
            _ => None,
        };
        Ok(Box::new(RecordingSession {
            alias: host_alias.to_string(),
            log: Rc::clone(&self.log),
            calls: 0,
            fail_at,
            exit_code: self.exit_code,
        }))
    }
}

fn two_target_run(lib: &Path) -> DeploymentRun {
    let link = DeployTarget::builder("link", "/srv/app")
        .ensure_empty_dir("lib")
        .copy(lib, "lib")
        .run("ls -la /srv/app/lib")
        .build()
        .unwrap();
    let zelda = DeployTarget::builder("zelda", "/srv/app")
        .mkdir("bin")
        .build()
        .unwrap();
    DeploymentRun::single(link).then(DeploymentRun::single(zelda))
}

#[test]
fn steps_run_in_order_with_one_session_per_target() {
    let tmp = TempDir::new().unwrap();
    let factory = RecordingFactory::new();
    let run = two_target_run(tmp.path());

    let report = Orchestrator::new(&factory).run(&run).unwrap();

    assert_eq!(
        factory.entries(),
        vec![
            "link: open".to_string(),
            "link: remove /srv/app/lib".to_string(),
            "link: mkdir /srv/app/lib".to_string(),
            format!("link: copy {} /srv/app/lib", tmp.path().display()),
            "link: run ls -la /srv/app/lib".to_string(),
            "link: close".to_string(),
            "zelda: open".to_string(),
            "zelda: mkdir /srv/app/bin".to_string(),
            "zelda: close".to_string(),
        ]
    );
    assert_eq!(report.summary.targets, 2);
    assert_eq!(report.summary.steps, 5);
    assert_eq!(report.targets[0].steps[3].output.as_ref().unwrap().stdout, "out");
}

#[test]
fn failure_stops_target_and_skips_later_targets() {
    let tmp = TempDir::new().unwrap();
    let mut factory = RecordingFactory::new();
    factory.fail_at = Some(("link".to_string(), 1));
    let run = two_target_run(tmp.path());

    let err = Orchestrator::new(&factory).run(&run).unwrap_err();

    assert_eq!(err.code, ErrorCode::DeployFailed);
    assert_eq!(err.details["target"], "link");
    assert_eq!(err.details["stepIndex"], 1);
    assert_eq!(err.details["cause"]["code"], "step.execution_failed");

    let entries = factory.entries();
    assert_eq!(entries.last().unwrap(), "link: close");
    assert_eq!(entries.iter().filter(|e| e.ends_with("close")).count(), 1);
    assert!(!entries.iter().any(|e| e.starts_with("zelda")));
    assert!(!entries.iter().any(|e| e.contains("copy")));
}

#[test]
fn nonzero_exit_aborts_the_run() {
    let tmp = TempDir::new().unwrap();
    let mut factory = RecordingFactory::new();
    factory.exit_code = 2;
    let run = two_target_run(tmp.path());

    let err = Orchestrator::new(&factory).run(&run).unwrap_err();

    assert_eq!(err.details["stepIndex"], 3);
    assert_eq!(err.details["cause"]["code"], "remote.command_failed");
    assert_eq!(err.details["cause"]["details"]["exitCode"], 2);
    assert_eq!(err.details["cause"]["details"]["stderr"], "err");
    assert!(!factory.entries().iter().any(|e| e.starts_with("zelda")));
}

#[test]
fn missing_local_source_fails_before_session_opens() {
    let tmp = TempDir::new().unwrap();
    let factory = RecordingFactory::new();
    let run = two_target_run(&tmp.path().join("missing"));

    let err = Orchestrator::new(&factory).run(&run).unwrap_err();

    assert_eq!(err.code, ErrorCode::DeployFailed);
    assert_eq!(err.details["stepIndex"], 2);
    assert_eq!(err.details["cause"]["code"], "config.local_path_missing");
    assert!(factory.entries().is_empty());
}

#[test]
fn missing_local_source_without_preflight_fails_at_copy_step() {
    let tmp = TempDir::new().unwrap();
    let factory = RecordingFactory::new();
    let run = two_target_run(&tmp.path().join("missing"));

    let err = Orchestrator::new(&factory)
        .without_preflight()
        .run(&run)
        .unwrap_err();

    assert_eq!(err.details["stepIndex"], 2);
    assert_eq!(err.details["cause"]["code"], "step.execution_failed");
    let entries = factory.entries();
    assert!(!entries.iter().any(|e| e.contains("copy")));
    assert_eq!(entries.last().unwrap(), "link: close");
}

#[test]
fn unreachable_host_fails_without_step_index() {
    let tmp = TempDir::new().unwrap();
    let mut factory = RecordingFactory::new();
    factory.unreachable = Some("zelda".to_string());
    let run = two_target_run(tmp.path());

    let err = Orchestrator::new(&factory).run(&run).unwrap_err();

    assert_eq!(err.details["target"], "zelda");
    assert!(err.details.get("stepIndex").is_none());
    assert_eq!(err.details["cause"]["code"], "session.open_failed");
    // The first target finished and closed before the second was attempted.
    assert!(factory.entries().contains(&"link: close".to_string()));
}

#[test]
fn resumed_run_starts_at_named_target() {
    let tmp = TempDir::new().unwrap();
    let factory = RecordingFactory::new();
    let run = two_target_run(tmp.path()).starting_from("zelda").unwrap();

    Orchestrator::new(&factory).run(&run).unwrap();

    assert_eq!(factory.entries()[0], "zelda: open");
}
