use std::{process, sync::Arc};

use bytes::Bytes;
use drawio_renderer::{
    application::{
        convert::{ConvertError, RenderInvoker},
        error::AppError,
    },
    config,
    domain::ConversionRequest,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        process::ProcessRenderer,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::config(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Convert(args) => run_convert(settings, args).await,
    }
}

fn build_invoker(settings: &config::RenderSettings) -> RenderInvoker {
    let renderer = Arc::new(ProcessRenderer::from_settings(settings));
    let invoker = RenderInvoker::new(renderer, settings.max_attempts);
    match settings.work_dir.as_ref() {
        Some(dir) => invoker.with_work_dir(dir),
        None => invoker,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = HttpState::new(build_invoker(&settings.render));
    let router = http::build_router(state, settings.server.body_limit());

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "drawio_renderer::serve",
        addr = %settings.server.addr,
        renderer = %settings.render.renderer_path.display(),
        display_wrapper = settings
            .render
            .display_wrapper
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default(),
        max_attempts = settings.render.max_attempts.get(),
        timeout_secs = settings.render.timeout.as_secs(),
        "Listening for conversion requests"
    );

    http::serve_with_grace(
        listener,
        router,
        shutdown_signal(),
        settings.server.graceful_shutdown,
    )
    .await
    .map_err(AppError::from)?;

    info!(target = "drawio_renderer::serve", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(
            target = "drawio_renderer::serve",
            error = %err,
            "Failed to listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}

async fn run_convert(settings: config::Settings, args: config::ConvertArgs) -> Result<(), AppError> {
    let source = tokio::fs::read(&args.input)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let request = ConversionRequest::from_raw_upload(Bytes::from(source), args.format, &args.params)
        .map_err(ConvertError::from)?;

    let file = build_invoker(&settings.render)
        .render(&request)
        .await
        .map_err(ConvertError::from)?;

    tokio::fs::write(&args.output, &file.bytes)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "drawio_renderer::convert",
        input = %args.input.display(),
        output = %args.output.display(),
        format = %file.format,
        bytes = file.bytes.len(),
        "Diagram converted"
    );
    Ok(())
}
