use std::path::PathBuf;

use url::Url;

use crate::args::Args;
use crate::error::PipelineError;

pub const MAX_CONNECTIONS: u8 = 16;

/// One download-and-convert request.
#[derive(Debug, Clone)]
pub struct Job {
    pub url: Url,
    pub format: String,
    pub template: String,
    pub output_dir: PathBuf,
    pub cookies: Option<PathBuf>,
    pub live_from_start: bool,
    pub accelerator: Option<Accelerator>,
    pub transcode: Option<Transcode>,
}

#[derive(Debug, Clone)]
pub struct Accelerator {
    pub connections: u8,
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Transcode {
    pub target: String,
    pub codec: String,
    pub remove_source: bool,
}

impl Job {
    pub fn from_args(args: &Args) -> Result<Self, PipelineError> {
        let url = parse_url(&args.url)?;

        if args.connections == 0 || args.connections > MAX_CONNECTIONS {
            return Err(PipelineError::InvalidOption(format!(
                "--connections must be between 1 and {}, got {}",
                MAX_CONNECTIONS, args.connections
            )));
        }

        let target = args.target.trim_start_matches('.').to_owned();
        if !args.no_transcode && (target.is_empty() || target.contains(&['/', '\\'][..])) {
            return Err(PipelineError::InvalidOption(format!(
                "--target must be a file extension, got `{}`",
                args.target
            )));
        }

        Ok(Job {
            url,
            format: args.format.clone(),
            template: args.output.clone(),
            output_dir: args.output_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            cookies: args.cookies.clone(),
            live_from_start: !args.live_edge,
            accelerator: if args.no_accelerator {
                None
            } else {
                Some(Accelerator {
                    connections: args.connections,
                    dir: args.cache_dir.clone(),
                })
            },
            transcode: if args.no_transcode {
                None
            } else {
                Some(Transcode {
                    target,
                    codec: args.codec.clone(),
                    remove_source: args.remove_source,
                })
            },
        })
    }
}

fn parse_url(input: &str) -> Result<Url, PipelineError> {
    let invalid = |reason: String| PipelineError::InvalidUrl {
        url: input.to_owned(),
        reason,
    };

    let url = Url::parse(input.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(url),
        "http" | "https" => Err(invalid("missing host".to_owned())),
        other => Err(invalid(format!("unsupported scheme `{}`", other))),
    }
}
