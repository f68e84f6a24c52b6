#![allow(dead_code)]

use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[derive(Debug)]
pub struct IssuesRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl IssuesRun {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(extract_json_payload(&self.stdout).as_str())
            .unwrap_or_else(|e| panic!("invalid JSON ({e}): {}", self.stdout))
    }
}

/// A temporary directory used as both working directory and `$HOME`.
pub struct IssuesWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl IssuesWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }

    /// Workspace with `init` done and `alice` registered and logged in.
    pub fn logged_in() -> Self {
        let workspace = Self::new();
        let init = run_issues(&workspace, ["init"], "init");
        assert!(init.status.success(), "init failed: {}", init.stderr);
        for (args, label) in [
            (["user", "register", "alice", "-p", "secret1"], "register"),
            (["user", "login", "alice", "-p", "secret1"], "login"),
        ] {
            let run = run_issues(&workspace, args, label);
            assert!(run.status.success(), "{label} failed: {}", run.stderr);
        }
        workspace
    }
}

pub fn run_issues<I, S>(workspace: &IssuesWorkspace, args: I, label: &str) -> IssuesRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_issues_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_issues_with_env<I, S, E, K, V>(
    workspace: &IssuesWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> IssuesRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("issues"));
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    cmd.env_remove("ISSUES_DIR");
    cmd.env_remove("ISSUES_ACTOR");
    cmd.env_remove("ISSUES_DB");
    cmd.env_remove("ISSUES_PASSWORD");
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "issue_tracker=debug");
    cmd.env("HOME", &workspace.root);

    let start = Instant::now();
    let output = cmd.output().expect("run issues");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let log_body = format!(
        "label: {label}\nduration: {duration:?}\nstatus: {}\nargs: {:?}\n\nstdout:\n{stdout}\n\nstderr:\n{stderr}\n",
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
    );
    fs::write(&log_path, log_body).expect("write log");

    IssuesRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

/// Strip any leading non-JSON lines.
pub fn extract_json_payload(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    stdout.trim().to_string()
}
