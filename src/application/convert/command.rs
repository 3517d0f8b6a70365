use std::{ffi::OsString, path::Path};

use crate::domain::ConversionRequest;

/// Always the final argument; the renderer refuses to start under Xvfb
/// without it.
pub const NO_SANDBOX_FLAG: &str = "--no-sandbox";

/// Build the renderer argument list for `request`.
///
/// Layout: `-x -f <fmt> -o <output> [modifiers…] <input> --no-sandbox`. The
/// renderer's parser expects the input path second-to-last.
pub fn build_args(request: &ConversionRequest, input: &Path, output: &Path) -> Vec<OsString> {
    let options = &request.options;
    let mut args: Vec<OsString> = vec![
        "-x".into(),
        "-f".into(),
        request.format.as_str().into(),
        "-o".into(),
        output.into(),
    ];

    if let Some(quality) = options.quality {
        push_pair(&mut args, "-q", quality);
    }
    if options.transparent_background == Some(true) {
        args.push("-t".into());
    }
    if options.embed_resources == Some(true) {
        args.push("-e".into());
    }
    if let Some(border) = options.border {
        push_pair(&mut args, "-b", border);
    }
    if let Some(scale) = options.scale {
        push_pair(&mut args, "-s", scale);
    }
    if let Some(width) = options.width {
        push_pair(&mut args, "--width", width);
    }
    if let Some(height) = options.height {
        push_pair(&mut args, "--height", height);
    }
    if options.crop == Some(true) {
        args.push("--crop".into());
    }

    args.push(input.into());
    args.push(NO_SANDBOX_FLAG.into());
    args
}

fn push_pair(args: &mut Vec<OsString>, flag: &str, value: impl ToString) {
    args.push(flag.into());
    args.push(value.to_string().into());
}
