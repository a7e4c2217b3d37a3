use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// External programs the pipeline drives.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Tool {
    YtDlp,
    Aria2c,
    Ffmpeg,
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::YtDlp => "yt-dlp",
            Tool::Aria2c => "aria2c",
            Tool::Ffmpeg => "ffmpeg",
        }
    }

    /// Environment variable that overrides the `PATH` lookup.
    pub fn env_var(self) -> &'static str {
        match self {
            Tool::YtDlp => "YTDLP_PATH",
            Tool::Aria2c => "ARIA2C_PATH",
            Tool::Ffmpeg => "FFMPEG_PATH",
        }
    }

    pub fn locate(self) -> Result<PathBuf, PipelineError> {
        self.locate_with(std::env::var_os(self.env_var()), std::env::var_os("PATH"))
    }

    fn locate_with(
        self,
        overridden: Option<OsString>,
        search_path: Option<OsString>,
    ) -> Result<PathBuf, PipelineError> {
        if let Some(path) = overridden.filter(|p| !p.is_empty()) {
            let path = PathBuf::from(path);
            return if path.is_file() {
                Ok(path)
            } else {
                Err(PipelineError::ToolPathMissing {
                    tool: self,
                    path: path.display().to_string(),
                })
            };
        }

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        which::which_in(self.name(), search_path, cwd).map_err(|_| PipelineError::ToolNotFound(self))
    }
}

/// Resolved binaries for one job. Tools the job does not need stay `None`.
#[derive(Debug, Clone, Default)]
pub struct Toolchain {
    pub ytdlp: PathBuf,
    pub aria2c: Option<PathBuf>,
    pub ffmpeg: Option<PathBuf>,
}

impl Toolchain {
    pub fn resolve(accelerator: bool, transcode: bool) -> Result<Self, PipelineError> {
        let ytdlp = Tool::YtDlp.locate()?;
        let aria2c = if accelerator {
            Some(Tool::Aria2c.locate()?)
        } else {
            None
        };
        let ffmpeg = if transcode {
            Some(Tool::Ffmpeg.locate()?)
        } else {
            None
        };

        for (tool, path) in [
            (Tool::YtDlp, Some(&ytdlp)),
            (Tool::Aria2c, aria2c.as_ref()),
            (Tool::Ffmpeg, ffmpeg.as_ref()),
        ]
        .iter()
        {
            if let Some(path) = path {
                log::debug!("{}: {}", tool.name(), path.display());
            }
        }

        Ok(Toolchain {
            ytdlp,
            aria2c,
            ffmpeg,
        })
    }

    /// Toolchain that uses the bare program names, for printing commands.
    pub fn unresolved(accelerator: bool, transcode: bool) -> Self {
        let bare = |tool: Tool| Path::new(tool.name()).to_path_buf();
        Toolchain {
            ytdlp: bare(Tool::YtDlp),
            aria2c: if accelerator { Some(bare(Tool::Aria2c)) } else { None },
            ffmpeg: if transcode { Some(bare(Tool::Ffmpeg)) } else { None },
        }
    }
}

/// Shell-like rendering of a command line for logs and `--dry-run`.
pub fn display_command(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if !arg.is_empty() && arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c)) {
                arg.into_owned()
            } else {
                format!("'{}'", arg.replace('\'', "'\\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
