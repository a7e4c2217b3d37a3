use thiserror::Error;

use crate::tools::Tool;

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INVALID_JOB: i32 = 2;
pub const EXIT_TOOL_NOT_FOUND: i32 = 127;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("cannot find {} executable. install it or set {}", .0.name(), .0.env_var())]
    ToolNotFound(Tool),

    #[error("{} does not exist (from {})", .path, .tool.env_var())]
    ToolPathMissing { tool: Tool, path: String },

    #[error("failed to start {}: {}", .tool.name(), .source)]
    Spawn {
        tool: Tool,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exited with {}", .tool.name(), describe_code(.code))]
    StepFailed { tool: Tool, code: Option<i32> },

    #[error("{} finished but did not report a downloaded file", .0.name())]
    NoOutput(Tool),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_owned(),
    }
}

impl PipelineError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::InvalidUrl { .. } | PipelineError::InvalidOption(_) => EXIT_INVALID_JOB,
            PipelineError::ToolNotFound(_) | PipelineError::ToolPathMissing { .. } => {
                EXIT_TOOL_NOT_FOUND
            }
            PipelineError::StepFailed {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => EXIT_FAILURE,
        }
    }
}

/// Exit code for any error that reached `main`.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map(PipelineError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn step_failure_keeps_tool_code() {
        let err = PipelineError::StepFailed {
            tool: Tool::YtDlp,
            code: Some(3),
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "yt-dlp exited with code 3");
    }

    #[test]
    fn killed_step_is_generic_failure() {
        let err = PipelineError::StepFailed {
            tool: Tool::Ffmpeg,
            code: None,
        };
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert_eq!(err.to_string(), "ffmpeg exited with a signal");
    }

    #[test]
    fn exit_code_through_context() {
        let err = Err::<(), _>(PipelineError::ToolNotFound(Tool::Aria2c))
            .context("resolving tools")
            .unwrap_err();
        assert_eq!(exit_code(&err), EXIT_TOOL_NOT_FOUND);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), EXIT_FAILURE);
    }

    #[test]
    fn invalid_job() {
        let err = PipelineError::InvalidOption("connections must be 1..=16".into());
        assert_eq!(err.exit_code(), EXIT_INVALID_JOB);
    }
}
