//! Git binary operations
//!
//! Thin wrappers around subprocess calls to `git`, used by the CLI-text
//! source to keep a local clone of the proposals repository current and to
//! read its patch history.

mod log;
mod repo;

pub use log::{log_patch_args, read_patch_log};
pub use repo::{
    check_git_version, clone_repo, get_remote_url, is_git_repo, parse_git_version, pull_changes,
    GitVersion, MIN_GIT_VERSION,
};

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{PipelineError, Result};
use crate::source::SourceKind;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Run a git command and return stdout as string
pub fn git_command(args: &[&str], cwd: Option<&Path>) -> Result<String> {
    git_command_with_timeout(args, cwd, None)
}

/// Run a git command, killing it when `timeout` elapses first
pub fn git_command_with_timeout(
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| unavailable(format!("Failed to execute git: {}", e)))?;

    // Drain both pipes off-thread so a chatty command cannot block on a
    // full pipe while we wait for it.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if timeout.is_some_and(|limit| started.elapsed() >= limit) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(unavailable(format!(
                "git {} timed out after {:?}",
                args.join(" "),
                started.elapsed()
            )));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr);
        return Err(unavailable(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
}

/// Run a git command, returning None if it fails (for optional queries)
pub fn git_command_optional(args: &[&str], cwd: Option<&Path>) -> Option<String> {
    git_command(args, cwd).ok()
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn unavailable(message: String) -> PipelineError {
    PipelineError::unavailable(SourceKind::Cli, message)
}
