use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use ffcli::FFmpegDefaultArgs;
use log::Level;
use tokio::process::Command;

use crate::error::PipelineError;
use crate::tools::{display_command, Tool};

/// Where the converted file goes: `input` with its extension swapped for `target`, or
/// `<stem>.converted.<target>` when that would overwrite the input.
pub fn output_path(input: &Path, target: &str) -> PathBuf {
    let output = input.with_extension(target);
    if output != input {
        return output;
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned());
    input.with_file_name(format!("{}.converted.{}", stem, target))
}

pub fn ffmpeg_args(input: &Path, output: &Path, codec: &str) -> Vec<OsString> {
    let input = input.to_string_lossy();
    ffcli::FFmpegArgs::new(Level::Info)
        .default_args(Some(FFmpegDefaultArgs::Quiet))
        .i(&*input)
        .c(codec, "")
        .raw("-y".to_owned())
        .raw(output.to_string_lossy().into_owned())
        .build()
        .into_iter()
        .map(|arg| OsString::from(arg.to_string()))
        .collect()
}

pub async fn transcode(ffmpeg: &Path, args: &[OsString]) -> Result<(), PipelineError> {
    log::debug!("{}", display_command(ffmpeg, args));

    let status = Command::new(ffmpeg)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|source| PipelineError::Spawn {
            tool: Tool::Ffmpeg,
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(PipelineError::StepFailed {
            tool: Tool::Ffmpeg,
            code: status.code(),
        })
    }
}
