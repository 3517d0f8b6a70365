use std::{
    ffi::OsString,
    io,
    num::NonZeroU32,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use bytes::Bytes;
use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{info, warn};

use super::{
    job::RenderJob,
    outcome::{FailureKind, RenderFailure, RenderOutcome, RenderedFile},
};
use crate::domain::ConversionRequest;

/// The exact line `xvfb-run` prints when its X server does not come up. It
/// is intermittent, so the whole invocation is retried.
pub const DISPLAY_START_FAILURE: &str = "xvfb-run: error: Xvfb failed to start";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const TARGET: &str = "application::convert::invoker";

/// Captured result of one renderer process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("renderer executable not found: {0}")]
    NotFound(io::Error),
    #[error("failed to run renderer: {0}")]
    Io(io::Error),
    #[error("renderer did not finish within {0:?}")]
    TimedOut(Duration),
}

/// The external renderer, seen only through its command line and its
/// captured output.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn run(&self, args: &[OsString]) -> Result<ProcessOutput, RendererError>;
}

/// Turns a validated request into a rendered file: owns the job directory,
/// runs the renderer with a bounded retry for display start failures and
/// classifies what came back.
#[derive(Clone)]
pub struct RenderInvoker {
    renderer: Arc<dyn Renderer>,
    max_attempts: NonZeroU32,
    work_dir: Option<PathBuf>,
}

impl RenderInvoker {
    pub fn new(renderer: Arc<dyn Renderer>, max_attempts: NonZeroU32) -> Self {
        Self {
            renderer,
            max_attempts,
            work_dir: None,
        }
    }

    /// Create job directories under `dir` instead of the system temp dir.
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub async fn render(&self, request: &ConversionRequest) -> RenderOutcome {
        let started_at = Instant::now();
        let outcome = self.render_inner(request).await;
        let result = match &outcome {
            Ok(_) => "ok",
            Err(failure) => failure.kind.as_str(),
        };
        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        counter!(
            "drawio_renderer_conversions_total",
            "format" => request.format.as_str(),
            "result" => result
        )
        .increment(1);
        histogram!("drawio_renderer_render_ms").record(elapsed_ms as f64);

        match &outcome {
            Ok(file) => info!(
                target = TARGET,
                op = "render",
                result,
                format = %request.format,
                elapsed_ms,
                output_bytes = file.bytes.len(),
                "diagram rendered"
            ),
            Err(failure) => warn!(
                target = TARGET,
                op = "render",
                result,
                format = %request.format,
                elapsed_ms,
                error = %failure,
                "diagram render failed"
            ),
        }
        outcome
    }

    async fn render_inner(&self, request: &ConversionRequest) -> RenderOutcome {
        let job = RenderJob::prepare(request, self.work_dir.as_deref())
            .await
            .map_err(|err| {
                RenderFailure::infrastructure(format!("failed to prepare render job: {err}"))
            })?;

        let output = self.run_with_retry(&job).await?;
        verify_output_marker(&output.stdout, job.output_path())?;

        // Read before `job` drops and removes the directory.
        let bytes = tokio::fs::read(job.output_path()).await.map_err(|err| {
            RenderFailure::infrastructure(format!("failed to read rendered output: {err}"))
        })?;

        Ok(RenderedFile {
            bytes: Bytes::from(bytes),
            file_name: request.output_file_name(),
            format: request.format,
        })
    }

    async fn run_with_retry(&self, job: &RenderJob) -> Result<ProcessOutput, RenderFailure> {
        let max_attempts = self.max_attempts.get();
        let mut attempt = 1;
        loop {
            let started_at = Instant::now();
            counter!("drawio_renderer_render_attempts_total").increment(1);
            let output = self
                .renderer
                .run(job.args())
                .await
                .map_err(|err| RenderFailure::infrastructure(err.to_string()))?;

            match classify_stderr(&output.stderr) {
                StderrClass::Clean => return Ok(output),
                StderrClass::DisplayUnavailable if attempt < max_attempts => {
                    counter!("drawio_renderer_display_retries_total").increment(1);
                    warn!(
                        target = TARGET,
                        op = "run_renderer",
                        result = "retry",
                        attempt,
                        max_attempts,
                        exit_code = output.exit_code.map(i64::from).unwrap_or(-1),
                        cli_elapsed_ms = started_at.elapsed().as_millis() as u64,
                        "virtual display failed to start; retrying"
                    );
                    attempt += 1;
                }
                StderrClass::DisplayUnavailable => {
                    return Err(RenderFailure::infrastructure(format!(
                        "Error executing draw.io: {DISPLAY_START_FAILURE} (after {attempt} attempts)"
                    )));
                }
                StderrClass::Failed(failure) => return Err(failure),
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StderrClass {
    Clean,
    DisplayUnavailable,
    Failed(RenderFailure),
}

fn classify_stderr(stderr: &str) -> StderrClass {
    if stderr.trim().is_empty() {
        return StderrClass::Clean;
    }
    if stderr
        .lines()
        .any(|line| line.trim() == DISPLAY_START_FAILURE)
    {
        return StderrClass::DisplayUnavailable;
    }

    let first_line = stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let message = format!("Error executing draw.io: {first_line}");
    if is_out_of_memory(stderr) {
        StderrClass::Failed(RenderFailure::new(FailureKind::ResourceExhausted, message))
    } else {
        StderrClass::Failed(RenderFailure::conversion(message))
    }
}

fn is_out_of_memory(stderr: &str) -> bool {
    stderr.contains("ENOMEM") || stderr.to_ascii_lowercase().contains("out of memory")
}

/// The renderer reports success as `<input> -> <output>` on its last stdout
/// line; anything else means it did not export the file.
fn verify_output_marker(stdout: &str, output_path: &Path) -> Result<(), RenderFailure> {
    let last_line = stdout
        .lines()
        .rev()
        .map(str::trim_end)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let marker = format!(" -> {}", output_path.display());
    if last_line.contains(&marker) {
        Ok(())
    } else {
        Err(RenderFailure::conversion(format!(
            "Error processing input: {last_line}"
        )))
    }
}
