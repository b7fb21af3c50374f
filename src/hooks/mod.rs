// ABOUTME: Lifecycle hooks run around the pre and swap phases.
// ABOUTME: Configured shell commands executed with deployment environment variables.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::types::AppName;

/// Hook execution points in the deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    /// Before the idle slot receives the new revision.
    BeforePre,
    /// After the deploy command succeeded.
    AfterPre,
    /// Before the idle slot is scaled to the target topology.
    BeforeScale,
    /// After the idle slot converged.
    AfterScale,
    /// Before cnames move.
    BeforeSwap,
    /// After cnames moved to the idle slot.
    AfterSwap,
}

impl HookPoint {
    pub const ALL: [HookPoint; 6] = [
        HookPoint::BeforePre,
        HookPoint::AfterPre,
        HookPoint::BeforeScale,
        HookPoint::AfterScale,
        HookPoint::BeforeSwap,
        HookPoint::AfterSwap,
    ];

    /// Configuration key for this point.
    pub fn name(&self) -> &'static str {
        match self {
            HookPoint::BeforePre => "before_pre",
            HookPoint::AfterPre => "after_pre",
            HookPoint::BeforeScale => "before_scale",
            HookPoint::AfterScale => "after_scale",
            HookPoint::BeforeSwap => "before_swap",
            HookPoint::AfterSwap => "after_swap",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `hooks:` block of the configuration. Unset points are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub before_pre: Option<String>,
    #[serde(default)]
    pub after_pre: Option<String>,
    #[serde(default)]
    pub before_scale: Option<String>,
    #[serde(default)]
    pub after_scale: Option<String>,
    #[serde(default)]
    pub before_swap: Option<String>,
    #[serde(default)]
    pub after_swap: Option<String>,
    /// Abort the running phase when a hook fails.
    #[serde(default)]
    pub abort_on_failure: bool,
}

impl HooksConfig {
    /// Command configured for a point; blank strings count as unset.
    pub fn command(&self, point: HookPoint) -> Option<&str> {
        let command = match point {
            HookPoint::BeforePre => &self.before_pre,
            HookPoint::AfterPre => &self.after_pre,
            HookPoint::BeforeScale => &self.before_scale,
            HookPoint::AfterScale => &self.after_scale,
            HookPoint::BeforeSwap => &self.before_swap,
            HookPoint::AfterSwap => &self.after_swap,
        };
        command.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub app: AppName,
    pub live: Option<AppName>,
    pub idle: AppName,
    pub tag: Option<String>,
}

impl HookContext {
    /// Convert context to environment variables for `point`.
    pub fn to_env(&self, point: HookPoint) -> HashMap<String, String> {
        let mut env = self.command_env();
        env.insert("BLUEGREEN_HOOK".to_string(), point.name().to_string());
        env
    }

    /// Environment for the deploy command: everything but the hook name.
    pub fn command_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("BLUEGREEN_APP".to_string(), self.app.to_string());
        env.insert("BLUEGREEN_IDLE_APP".to_string(), self.idle.to_string());
        if let Some(ref live) = self.live {
            env.insert("BLUEGREEN_LIVE_APP".to_string(), live.to_string());
        }
        if let Some(ref tag) = self.tag {
            env.insert("BLUEGREEN_TAG".to_string(), tag.clone());
        }
        env
    }
}

/// Result of running a hook or the deploy command.
#[derive(Debug, Clone)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Receives command output one line at a time, without the newline.
pub type LineSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Runs a command string with extra environment variables.
#[async_trait]
pub trait HookExecutor: Send + Sync {
    async fn run_command(&self, command: &str, env: &HashMap<String, String>) -> HookResult;

    /// Like `run_command`, also handing each stdout line to `on_line`.
    ///
    /// The default replays stdout after the command exits.
    async fn run_streaming(
        &self,
        command: &str,
        env: &HashMap<String, String>,
        on_line: LineSink<'_>,
    ) -> HookResult {
        let result = self.run_command(command, env).await;
        for line in result.stdout.lines() {
            on_line(line);
        }
        result
    }
}

/// Executes commands through `sh -c` from a working directory.
pub struct ShellHookRunner {
    working_dir: PathBuf,
}

impl ShellHookRunner {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn command(&self, command: &str, env: &HashMap<String, String>) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

fn log_result(result: &HookResult) {
    if result.success {
        tracing::info!("Command completed successfully");
    } else {
        tracing::warn!("Command failed with exit code {:?}", result.exit_code);
    }
}

fn spawn_failure(e: std::io::Error) -> HookResult {
    tracing::error!("Failed to execute command: {}", e);
    HookResult {
        success: false,
        exit_code: None,
        stdout: String::new(),
        stderr: e.to_string(),
    }
}

/// Read `reader` to the end, handing every line to `on_line`.
async fn forward_lines<R: AsyncRead + Unpin>(reader: Option<R>, on_line: LineSink<'_>) -> String {
    let mut captured = String::new();
    let Some(reader) = reader else {
        return captured;
    };
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        on_line(&line);
        captured.push_str(&line);
        captured.push('\n');
    }
    captured
}

async fn read_all<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        let _ = reader.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait]
impl HookExecutor for ShellHookRunner {
    async fn run_command(&self, command: &str, env: &HashMap<String, String>) -> HookResult {
        tracing::info!("Running command: {}", command);

        match self.command(command, env).output().await {
            Ok(output) => {
                let result = HookResult {
                    success: output.status.success(),
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };
                log_result(&result);
                result
            }
            Err(e) => spawn_failure(e),
        }
    }

    async fn run_streaming(
        &self,
        command: &str,
        env: &HashMap<String, String>,
        on_line: LineSink<'_>,
    ) -> HookResult {
        tracing::info!("Running command: {}", command);

        let mut child = match self.command(command, env).spawn() {
            Ok(child) => child,
            Err(e) => return spawn_failure(e),
        };
        let (stdout, stderr) = tokio::join!(
            forward_lines(child.stdout.take(), on_line),
            read_all(child.stderr.take()),
        );

        let result = match child.wait().await {
            Ok(status) => HookResult {
                success: status.success(),
                exit_code: status.code(),
                stdout,
                stderr,
            },
            Err(e) => spawn_failure(e),
        };
        log_result(&result);
        result
    }
}
