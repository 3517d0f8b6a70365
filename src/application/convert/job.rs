use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use tempfile::TempDir;

use super::command::build_args;
use crate::domain::ConversionRequest;

const JOB_DIR_PREFIX: &str = "drawio-render-";
const INPUT_FILE_NAME: &str = "input.drawio";

/// Per-request working state: a private temporary directory holding the
/// input document and the renderer's output, plus the argument list that
/// points at both.
///
/// Dropping the job removes the directory and everything in it, so every
/// exit path of a request (including a cancelled future) cleans up.
#[derive(Debug)]
pub struct RenderJob {
    dir: TempDir,
    input_path: PathBuf,
    output_path: PathBuf,
    args: Vec<OsString>,
}

impl RenderJob {
    /// Create the job directory (under `parent`, or the system temp dir) and
    /// write the request's source into it.
    pub async fn prepare(request: &ConversionRequest, parent: Option<&Path>) -> io::Result<Self> {
        let dir = create_private_dir(parent)?;
        let input_path = dir.path().join(INPUT_FILE_NAME);
        let output_path = dir.path().join(request.output_file_name());

        tokio::fs::write(&input_path, &request.source).await?;

        let args = build_args(request, &input_path, &output_path);
        Ok(Self {
            dir,
            input_path,
            output_path,
            args,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

fn create_private_dir(parent: Option<&Path>) -> io::Result<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(JOB_DIR_PREFIX);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o700));
    }
    match parent {
        Some(parent) => builder.tempdir_in(parent),
        None => builder.tempdir(),
    }
}
