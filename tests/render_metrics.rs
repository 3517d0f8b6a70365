use std::{
    collections::HashMap,
    ffi::OsString,
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use drawio_renderer::{
    application::convert::{
        DISPLAY_START_FAILURE, ProcessOutput, RenderInvoker, Renderer, RendererError,
    },
    domain::{ConversionRequest, OutputFormat},
};

/// Fails to start the display `display_failures` times, then exports.
struct FlakyDisplayRenderer {
    display_failures: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl Renderer for FlakyDisplayRenderer {
    async fn run(&self, args: &[OsString]) -> Result<ProcessOutput, RendererError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.display_failures {
            return Ok(ProcessOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: format!("{DISPLAY_START_FAILURE}\n"),
            });
        }

        let output = args
            .iter()
            .position(|arg| arg == "-o")
            .and_then(|index| args.get(index + 1))
            .expect("output path argument");
        tokio::fs::write(output, b"PNG")
            .await
            .map_err(RendererError::Io)?;
        let input = &args[args.len() - 2];
        Ok(ProcessOutput {
            exit_code: Some(0),
            stdout: format!(
                "{} -> {}\n",
                input.to_string_lossy(),
                output.to_string_lossy()
            ),
            stderr: String::new(),
        })
    }
}

#[tokio::test]
async fn render_metrics_are_emitted() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let renderer = Arc::new(FlakyDisplayRenderer {
        display_failures: 1,
        calls: AtomicUsize::new(0),
    });
    let invoker = RenderInvoker::new(renderer.clone(), NonZeroU32::new(3).unwrap());
    let request = ConversionRequest::from_raw_upload(
        Bytes::from_static(b"<mxfile/>"),
        OutputFormat::Png,
        &[],
    )
    .expect("valid request");

    let file = invoker.render(&request).await.expect("rendered");
    assert_eq!(file.bytes.as_ref(), b"PNG");
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);

    let snapshot = snapshotter.snapshot().into_vec();
    let names: Vec<String> = snapshot
        .iter()
        .map(|(key, _, _, _)| key.key().name().to_string())
        .collect();
    let counters: HashMap<String, u64> = snapshot
        .into_iter()
        .filter_map(|(key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((key.key().name().to_string(), count)),
            _ => None,
        })
        .collect();

    assert_eq!(counters.get("drawio_renderer_render_attempts_total"), Some(&2));
    assert_eq!(counters.get("drawio_renderer_display_retries_total"), Some(&1));
    assert_eq!(counters.get("drawio_renderer_conversions_total"), Some(&1));
    assert!(
        names.iter().any(|name| name == "drawio_renderer_render_ms"),
        "{names:?}"
    );
}
