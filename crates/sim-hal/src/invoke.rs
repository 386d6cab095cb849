use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use sim_types::{SimError, SimResult};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// How much of stdout/stderr we keep per stream after a run.
pub const LOG_TAIL_CHARS: usize = 4096;

/// Default subprocess timeout for backend invocations that don't override it.
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Environment variable naming the WSL distribution to bridge through when
/// a backend executable isn't directly on `PATH`.
pub const WSL_DISTRO_ENV: &str = "SIM_WSL_DISTRO";

pub struct RunOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub logs: Vec<String>,
}

fn tail(s: &str, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= n {
        s.to_string()
    } else {
        chars[chars.len() - n..].iter().collect()
    }
}

/// Translates a Windows-style path (`C:/foo/bar`) into its WSL mount-point
/// form (`/mnt/c/foo/bar`). Paths without a drive letter pass through
/// unchanged.
pub fn to_wsl_path(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    match s.find(':') {
        Some(idx) if idx == 1 => {
            let drive = s[..idx].to_lowercase();
            let tail = &s[idx + 1..];
            format!("/mnt/{drive}{tail}")
        }
        _ => s,
    }
}

/// Resolves and invokes a backend executable, following the same fallback
/// order every adapter uses: an environment-variable override (falling
/// back to `default_cmd`) resolved against `PATH`, then a WSL bridge with
/// drive-letter path translation, then failure.
pub async fn run_backend(
    env_var: &str,
    default_cmd: &str,
    args: &[String],
    cwd: &Path,
    wsl_distro_env: &str,
    timeout_secs: u64,
) -> SimResult<RunOutcome> {
    let cmd = std::env::var(env_var).unwrap_or_else(|_| default_cmd.to_string());

    if let Ok(exe) = which::which(&cmd) {
        debug!(executable = %exe.display(), "invoking backend directly");
        return run_direct(exe.to_string_lossy().as_ref(), args, cwd, timeout_secs).await;
    }

    if let Ok(wsl) = which::which("wsl") {
        let distro = std::env::var(wsl_distro_env).unwrap_or_else(|_| "Ubuntu".to_string());
        let wsl_dir = to_wsl_path(cwd);
        let joined_args = args.join(" ");
        let cmdline = format!("cd '{wsl_dir}' && {cmd} {joined_args}").trim_end().to_string();
        warn!(%cmd, distro, "executable not on PATH, falling back to WSL bridge");
        let wsl_args = vec!["-d".to_string(), distro, "bash".to_string(), "-lc".to_string(), cmdline];
        return run_direct(wsl.to_string_lossy().as_ref(), &wsl_args, cwd, timeout_secs).await;
    }

    Err(SimError::Execution(format!(
        "executable not found: {cmd} (set {env_var} or install WSL + a Linux distro)"
    )))
}

async fn run_direct(program: &str, args: &[String], cwd: &Path, timeout_secs: u64) -> SimResult<RunOutcome> {
    let mut command = Command::new(program);
    command.args(args).current_dir(cwd).stdout(Stdio::piped()).stderr(Stdio::piped());

    let output = timeout(Duration::from_secs(timeout_secs), command.output())
        .await
        .map_err(|_| SimError::Execution(format!("{program} timed out after {timeout_secs}s")))?
        .map_err(|e| SimError::Execution(format!("failed to spawn {program}: {e}")))?;

    let mut logs = Vec::new();
    if !output.stdout.is_empty() {
        logs.push(tail(&String::from_utf8_lossy(&output.stdout), LOG_TAIL_CHARS));
    }
    if !output.stderr.is_empty() {
        logs.push(tail(&String::from_utf8_lossy(&output.stderr), LOG_TAIL_CHARS));
    }

    Ok(RunOutcome {
        success: output.status.success(),
        exit_code: output.status.code(),
        logs,
    })
}
