//! Cross-platform process runner.
//!
//! On Windows the program goes through `cmd /c` so batch shims such as
//! `npm.cmd` resolve the same way as native executables.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::binaries::Platform;
use crate::error::{ProvisionError, Result};
use crate::terminal::Terminal;

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Overrides applied on top of the inherited process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Working directory for the child.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables. The parent environment is always inherited.
    pub env: Vec<(String, String)>,
}

impl SpawnOptions {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: Some(dir.into()),
            env: Vec::new(),
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Spawns external programs and streams their output.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    platform: Platform,
    cancel: CancellationToken,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            platform: Platform::detect(),
            cancel: CancellationToken::new(),
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kills the child and fails with `Cancelled` once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs `name` with `args` and returns everything it printed to stdout.
    ///
    /// Stdout chunks are forwarded to `terminal.write` and collected; stderr
    /// chunks go to `terminal.write_error` only. A non-zero exit fails with
    /// `"<name> failed"`. A spawn failure is returned as the raw I/O error.
    pub async fn run<S: AsRef<OsStr>>(
        &self,
        name: &str,
        args: &[S],
        options: &SpawnOptions,
        terminal: &dyn Terminal,
    ) -> Result<String> {
        let mut cmd = build_command(self.platform, name, args, options);
        info!(program = %name, cwd = ?options.cwd, "Spawning process");

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let collect_stdout = async {
            let mut collected = Vec::new();
            if let Some(stdout) = stdout {
                pump(stdout, |chunk| {
                    terminal.write(&String::from_utf8_lossy(chunk));
                    collected.extend_from_slice(chunk);
                })
                .await?;
            }
            Ok::<_, std::io::Error>(collected)
        };

        let forward_stderr = async {
            if let Some(stderr) = stderr {
                pump(stderr, |chunk| {
                    terminal.write_error(&String::from_utf8_lossy(chunk));
                })
                .await?;
            }
            Ok::<_, std::io::Error>(())
        };

        let outcome = tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            outcome = async { tokio::join!(collect_stdout, forward_stderr, child.wait()) } => {
                Some(outcome)
            }
        };

        let Some((collected, forwarded, status)) = outcome else {
            if let Err(e) = child.kill().await {
                debug!("Failed to kill cancelled {}: {}", name, e);
            }
            return Err(ProvisionError::Cancelled);
        };

        let status = status?;
        forwarded?;
        let collected = collected?;

        debug!(program = %name, code = ?status.code(), "Process exited");
        if !status.success() {
            return Err(ProvisionError::ProcessFailed {
                name: name.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&collected).into_owned())
    }
}

/// Runs a program with a default, never-cancelled runner.
pub async fn run<S: AsRef<OsStr>>(
    name: &str,
    args: &[S],
    options: &SpawnOptions,
    terminal: &dyn Terminal,
) -> Result<String> {
    ProcessRunner::default()
        .run(name, args, options, terminal)
        .await
}

fn build_command<S: AsRef<OsStr>>(
    platform: Platform,
    name: &str,
    args: &[S],
    options: &SpawnOptions,
) -> Command {
    let mut cmd = if platform.is_windows() {
        let mut cmd = Command::new("cmd");
        cmd.arg("/c").arg(name);
        cmd
    } else {
        Command::new(name)
    };

    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = &options.cwd {
        cmd.current_dir(dir);
    }
    cmd.envs(options.env.iter().map(|(k, v)| (k, v)));
    cmd
}

/// Reads `reader` to the end, handing each chunk to `on_chunk` in order.
async fn pump<R, F>(mut reader: R, mut on_chunk: F) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        on_chunk(&buf[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::MemoryTerminal;

    #[test]
    fn test_windows_goes_through_cmd() {
        let cmd = build_command(
            Platform::Win32,
            "npm",
            &["install", "-g"],
            &SpawnOptions::default(),
        );
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "cmd");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, vec!["/c", "npm", "install", "-g"]);
    }

    #[test]
    fn test_other_platforms_spawn_directly() {
        let options = SpawnOptions::in_dir("/tmp").env("TONDEV_TEST", "1");
        let cmd = build_command(Platform::Linux, "tar", &["xvf", "se.tar"], &options);
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "tar");
        assert_eq!(std_cmd.get_current_dir(), Some(std::path::Path::new("/tmp")));
        let envs: Vec<_> = std_cmd.get_envs().collect();
        assert_eq!(
            envs,
            vec![(OsStr::new("TONDEV_TEST"), Some(OsStr::new("1")))]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_collects_stdout() {
        let terminal = MemoryTerminal::new();
        let script = ["-c", "echo hello; echo oops >&2"];
        let output = run("sh", &script, &SpawnOptions::default(), &terminal)
            .await
            .unwrap();

        assert_eq!(output, "hello\n");
        assert_eq!(terminal.output(), "hello\n");
        assert_eq!(terminal.errors(), "oops\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_inherits_and_extends_env() {
        let terminal = MemoryTerminal::new();
        let options = SpawnOptions::default().env("TONDEV_GREETING", "hi");
        let script = ["-c", "echo $TONDEV_GREETING; test -n \"$PATH\""];
        let output = run("sh", &script, &options, &terminal).await.unwrap();

        assert_eq!(output, "hi\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_in_working_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("marker.txt"), "").unwrap();

        let options = SpawnOptions::in_dir(temp_dir.path());
        let output = run("ls", &[] as &[&str], &options, &MemoryTerminal::new())
            .await
            .unwrap();

        assert!(output.contains("marker.txt"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let terminal = MemoryTerminal::new();
        let err = run("sh", &["-c", "echo broken >&2; exit 1"], &SpawnOptions::default(), &terminal)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "sh failed");
        assert_eq!(terminal.errors(), "broken\n");
    }

    #[tokio::test]
    async fn test_run_missing_executable() {
        let err = run(
            "tondev-definitely-not-installed",
            &["--version"],
            &SpawnOptions::default(),
            &MemoryTerminal::new(),
        )
        .await
        .unwrap_err();

        #[cfg(unix)]
        assert!(matches!(
            err,
            ProvisionError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound
        ));
        #[cfg(windows)]
        assert!(matches!(err, ProvisionError::ProcessFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_cancelled() {
        let cancel = CancellationToken::new();
        let runner = ProcessRunner::new().with_cancellation(cancel.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let err = runner
            .run("sleep", &["5"], &SpawnOptions::default(), &MemoryTerminal::new())
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, ProvisionError::Cancelled));
    }
}
