use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::PipelineError;
use crate::job::Job;
use crate::progress::{Progress, ProgressDisplay};
use crate::tools::{display_command, Tool};

/// Container yt-dlp merges separate video and audio streams into.
pub const MERGE_FORMAT: &str = "mkv";

/// aria2c split size; yt-dlp's own default for aria2c is 1M as well.
const MIN_SPLIT_SIZE: &str = "1M";

/// Builds the yt-dlp argument list for `job`, delegating transfers to `aria2c` when the job
/// has an accelerator.
pub fn ytdlp_args(job: &Job, aria2c: Option<&Path>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-f".into(),
        job.format.clone().into(),
        "--merge-output-format".into(),
        MERGE_FORMAT.into(),
    ];

    if let Some(accelerator) = &job.accelerator {
        args.push("--downloader".into());
        args.push(aria2c.unwrap_or_else(|| Path::new(Tool::Aria2c.name())).into());
        args.push("--downloader-args".into());
        args.push(
            format!(
                "aria2c:--dir={} -x {n} -s {n} -k {}",
                accelerator.dir.display(),
                MIN_SPLIT_SIZE,
                n = accelerator.connections
            )
            .into(),
        );
    }

    if job.live_from_start {
        args.push("--live-from-start".into());
    }

    if let Some(cookies) = &job.cookies {
        args.push("--cookies".into());
        args.push(cookies.into());
    }

    args.extend(
        [
            "--no-playlist",
            "--no-warnings",
            "--newline",
            "--progress",
            "--print",
            "after_move:filepath",
        ]
        .iter()
        .map(OsString::from),
    );

    args.push("-P".into());
    args.push(job.output_dir.clone().into());
    args.push("-o".into());
    args.push(job.template.clone().into());
    args.push(job.url.as_str().into());
    args
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Runs yt-dlp and returns the files it produced, in the order it reported them.
pub async fn download(ytdlp: &Path, args: &[OsString]) -> Result<Vec<PathBuf>, PipelineError> {
    log::debug!("{}", display_command(ytdlp, args));

    let mut child = Command::new(ytdlp)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| PipelineError::Spawn {
            tool: Tool::YtDlp,
            source,
        })?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, Stream::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, Stream::Stderr, tx));
    }

    let mut display = ProgressDisplay::default();
    let mut reported = Vec::new();
    while let Some((stream, line)) = rx.recv().await {
        let text = String::from_utf8_lossy(&line);
        if let Some(progress) = Progress::parse(&text) {
            display.update(&progress);
            continue;
        }
        match stream {
            Stream::Stdout => reported.push(path_from_bytes(line)),
            Stream::Stderr => log_stderr(&text),
        }
    }
    display.finish();

    let status = child.wait().await.map_err(|source| PipelineError::Spawn {
        tool: Tool::YtDlp,
        source,
    })?;
    if !status.success() {
        return Err(PipelineError::StepFailed {
            tool: Tool::YtDlp,
            code: status.code(),
        });
    }

    let files: Vec<PathBuf> = reported
        .into_iter()
        .filter(|path| {
            let exists = path.is_file();
            if !exists {
                log::warn!("yt-dlp reported {} but it does not exist", path.display());
            }
            exists
        })
        .collect();
    if files.is_empty() {
        return Err(PipelineError::NoOutput(Tool::YtDlp));
    }
    Ok(files)
}

/// Sends every non-empty line of `reader` down `tx` as raw bytes; yt-dlp prints titles and
/// paths in the locale encoding. Carriage-return redraws keep only their last frame.
async fn forward_lines<R>(reader: R, stream: Stream, tx: mpsc::UnboundedSender<(Stream, Vec<u8>)>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("reading yt-dlp output: {}", e);
                break;
            }
        }

        let last = buf
            .split(|b| *b == b'\r')
            .map(trim_ascii)
            .filter(|frame| !frame.is_empty())
            .last();
        if let Some(last) = last {
            if tx.send((stream, last.to_vec())).is_err() {
                break;
            }
        }
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::os::unix::ffi::OsStringExt;

    PathBuf::from(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}

fn log_stderr(line: &str) {
    let line = line.trim_end();
    if let Some(msg) = line.strip_prefix("ERROR:") {
        log::error!("yt-dlp:{}", msg);
    } else if let Some(msg) = line.strip_prefix("WARNING:") {
        log::warn!("yt-dlp:{}", msg);
    } else if !line.is_empty() {
        log::info!("{}", line);
    }
}
