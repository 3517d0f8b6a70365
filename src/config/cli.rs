use std::path::PathBuf;

use clap::{
    Args, Parser, Subcommand, ValueHint,
    builder::{BoolishValueParser, OsStringValueParser, TypedValueParser},
};

use crate::domain::OutputFormat;

/// Command-line arguments for the drawio-renderer binary.
#[derive(Debug, Parser)]
#[command(
    name = "drawio-renderer",
    version,
    about = "Convert draw.io diagrams to images over HTTP"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "DRAWIO_RENDERER_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP conversion service.
    Serve(Box<ServeArgs>),
    /// Convert one diagram file locally and exit.
    Convert(ConvertArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the draw.io executable path.
    #[arg(long = "renderer-path", value_name = "PATH")]
    pub renderer_path: Option<PathBuf>,

    /// Override the virtual display wrapper; pass an empty string to run the
    /// renderer directly.
    #[arg(
        long = "display-wrapper",
        value_name = "PATH",
        value_parser = OsStringValueParser::new().map(PathBuf::from)
    )]
    pub display_wrapper: Option<PathBuf>,

    /// Override the directory that holds per-request job directories.
    #[arg(long = "render-work-dir", value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    /// Override how many times a render is attempted when the virtual
    /// display fails to start.
    #[arg(long = "render-max-attempts", value_name = "COUNT")]
    pub max_attempts: Option<u32>,

    /// Override the per-attempt renderer time limit.
    #[arg(long = "render-timeout-seconds", value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the maximum request body size in bytes.
    #[arg(long = "server-max-request-bytes", value_name = "BYTES")]
    pub server_max_request_bytes: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Diagram file to convert.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Where to write the rendered file.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Output format (png|jpeg|svg|pdf).
    #[arg(short, long, default_value = "png", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Renderer option as KEY=VALUE, using the same names and ranges as the
    /// HTTP query string (quality, transparent, embed, border, scale, width,
    /// height, crop).
    #[arg(
        short = 'p',
        long = "param",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value
    )]
    pub params: Vec<(String, String)>,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    value.parse().map_err(|err: crate::domain::ValidationError| err.to_string())
}

fn parse_key_value(value: &str) -> Result<(String, String), String> {
    let (key, value) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{value}`"))?;
    if key.is_empty() {
        return Err("option name must not be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}
