use std::{
    ffi::OsString,
    io::ErrorKind,
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{
    application::convert::{ProcessOutput, Renderer, RendererError},
    config::RenderSettings,
};

const TARGET: &str = "infra::process";

/// Runs the draw.io binary as a child process, optionally behind a virtual
/// display wrapper such as `xvfb-run`.
#[derive(Debug, Clone)]
pub struct ProcessRenderer {
    renderer_path: PathBuf,
    display_wrapper: Option<PathBuf>,
    timeout: Duration,
}

impl ProcessRenderer {
    pub fn new(renderer_path: PathBuf, display_wrapper: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            renderer_path,
            display_wrapper,
            timeout,
        }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self::new(
            settings.renderer_path.clone(),
            settings.display_wrapper.clone(),
            settings.timeout,
        )
    }

    fn command(&self, args: &[OsString]) -> Command {
        let mut command = match &self.display_wrapper {
            Some(wrapper) => {
                let mut command = Command::new(wrapper);
                command.arg(&self.renderer_path);
                command
            }
            None => Command::new(&self.renderer_path),
        };
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // `xvfb-run` forks Xvfb and the renderer; a group lets them all be
        // signalled together.
        #[cfg(unix)]
        command.process_group(0);
        command
    }
}

/// Kills a spawned process group when dropped, unless the leader exited on
/// its own. Covers both an expired timeout and a cancelled request future.
struct GroupKillGuard {
    pgid: Option<u32>,
}

impl GroupKillGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for GroupKillGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::{
        errno::Errno,
        sys::signal::{Signal, killpg},
        unistd::Pid,
    };

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(err) => warn!(
            target = TARGET,
            op = "renderer::kill_group",
            result = "error",
            pgid,
            error = %err,
            "Failed to kill renderer process group"
        ),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

#[async_trait]
impl Renderer for ProcessRenderer {
    async fn run(&self, args: &[OsString]) -> Result<ProcessOutput, RendererError> {
        let started_at = Instant::now();
        let program = self
            .display_wrapper
            .as_ref()
            .unwrap_or(&self.renderer_path);

        let child = self.command(args).spawn().map_err(|err| {
            warn!(
                target = TARGET,
                op = "renderer::spawn",
                result = "error",
                program = %program.display(),
                error_code = "spawn_cli",
                error = %err,
                "Failed to spawn renderer"
            );
            if err.kind() == ErrorKind::NotFound {
                RendererError::NotFound(err)
            } else {
                RendererError::Io(err)
            }
        })?;

        let group = GroupKillGuard::new(child.id());
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                group.disarm();
                output
            }
            Ok(Err(err)) => return Err(RendererError::Io(err)),
            Err(_) => {
                warn!(
                    target = TARGET,
                    op = "renderer::wait",
                    result = "timeout",
                    program = %program.display(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Renderer exceeded its time limit and was killed"
                );
                return Err(RendererError::TimedOut(self.timeout));
            }
        };

        let output = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            target = TARGET,
            op = "renderer::wait",
            result = "exited",
            program = %program.display(),
            exit_code = output.exit_code.map(i64::from).unwrap_or(-1),
            cli_elapsed_ms = started_at.elapsed().as_millis() as u64,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "Renderer process finished"
        );
        Ok(output)
    }
}
