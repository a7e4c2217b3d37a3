use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;

use crate::download::{self, MERGE_FORMAT};
use crate::job::Job;
use crate::tools::{display_command, Toolchain};
use crate::transcode;

/// Runs one job: yt-dlp (with aria2c) first, then ffmpeg on whatever yt-dlp produced.
pub struct Invoker {
    job: Job,
    tools: Toolchain,
}

impl Invoker {
    pub fn new(job: Job, tools: Toolchain) -> Self {
        Invoker { job, tools }
    }

    /// The command lines `run` would execute. The downloaded file name is only known after
    /// yt-dlp finishes, so the ffmpeg line uses a placeholder.
    pub fn commands(&self) -> Vec<String> {
        let mut commands = vec![display_command(&self.tools.ytdlp, &self.download_args())];

        if let (Some(transcode), Some(ffmpeg)) = (&self.job.transcode, &self.tools.ffmpeg) {
            let input = self
                .job
                .output_dir
                .join(format!("<downloaded>.{}", MERGE_FORMAT));
            let output = transcode::output_path(&input, &transcode.target);
            commands.push(display_command(
                ffmpeg,
                &transcode::ffmpeg_args(&input, &output, &transcode.codec),
            ));
        }
        commands
    }

    fn download_args(&self) -> Vec<std::ffi::OsString> {
        download::ytdlp_args(&self.job, self.tools.aria2c.as_deref())
    }

    /// Returns the final files: the converted ones, or the downloads when there is no
    /// transcode step.
    pub async fn run(&self) -> anyhow::Result<Vec<PathBuf>> {
        println!("{} {}", "Downloading".green(), self.job.url);

        let downloaded = download::download(&self.tools.ytdlp, &self.download_args())
            .await
            .with_context(|| format!("downloading {}", self.job.url))?;
        for file in &downloaded {
            println!("{} {}", "Downloaded".green(), file.display());
        }

        let (transcode, ffmpeg) = match (&self.job.transcode, &self.tools.ffmpeg) {
            (Some(transcode), Some(ffmpeg)) => (transcode, ffmpeg),
            _ => return Ok(downloaded),
        };

        let mut outputs = Vec::with_capacity(downloaded.len());
        for file in &downloaded {
            let output = transcode::output_path(file, &transcode.target);
            println!("Transcoding to {} with ffmpeg...", transcode.target);
            transcode::transcode(
                ffmpeg,
                &transcode::ffmpeg_args(file, &output, &transcode.codec),
            )
            .await
            .with_context(|| format!("converting {}", file.display()))?;

            if transcode.remove_source {
                remove_source(file).await;
            }
            outputs.push(output);
        }
        Ok(outputs)
    }
}

async fn remove_source(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => log::info!("removed {}", path.display()),
        Err(e) => log::warn!("cannot remove {}: {}", path.display(), e),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use argh::FromArgs;
    use tempfile::TempDir;

    use super::*;
    use crate::args::Args;
    use crate::error::{exit_code, PipelineError};
    use crate::tools::Tool;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Fake yt-dlp that reports progress and writes `clip.mkv` into `dir`.
    fn fake_ytdlp(dir: &Path) -> PathBuf {
        let clip = dir.join("clip.mkv");
        script(
            dir,
            "yt-dlp",
            &format!(
                "echo '[download]  50.0% of 1.00MiB at 1.00MiB/s ETA 00:01'\n\
                 echo 'WARNING: fake warning' >&2\n\
                 printf data > '{clip}'\n\
                 echo '[download] 100% of 1.00MiB in 00:00:01 at 1.00MiB/s'\n\
                 echo '{clip}'",
                clip = clip.display()
            ),
        )
    }

    /// Fake ffmpeg that creates every `.mp4` argument.
    fn fake_ffmpeg(dir: &Path) -> PathBuf {
        script(
            dir,
            "ffmpeg",
            "for a in \"$@\"; do case \"$a\" in *.mp4) printf converted > \"$a\";; esac; done",
        )
    }

    fn invoker(dir: &TempDir, extra: &[&str], ytdlp: PathBuf, ffmpeg: PathBuf) -> Invoker {
        let out = dir.path().display().to_string();
        let mut args = vec!["https://example.com/watch?v=1", "-d", out.as_str()];
        args.extend_from_slice(extra);
        let job = Job::from_args(&Args::from_args(&["stream-dl"], &args).unwrap()).unwrap();
        Invoker::new(
            job,
            Toolchain {
                ytdlp,
                aria2c: Some(PathBuf::from("/usr/bin/aria2c")),
                ffmpeg: Some(ffmpeg),
            },
        )
    }

    #[tokio::test]
    async fn downloads_then_converts() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = fake_ytdlp(dir.path());
        let ffmpeg = fake_ffmpeg(dir.path());

        let outputs = invoker(&dir, &[], ytdlp, ffmpeg).run().await.unwrap();

        assert_eq!(outputs, vec![dir.path().join("clip.mp4")]);
        assert_eq!(std::fs::read_to_string(&outputs[0]).unwrap(), "converted");
        assert!(dir.path().join("clip.mkv").is_file());
    }

    #[tokio::test]
    async fn removes_source_after_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = fake_ytdlp(dir.path());
        let ffmpeg = fake_ffmpeg(dir.path());

        let outputs = invoker(&dir, &["--remove-source"], ytdlp, ffmpeg)
            .run()
            .await
            .unwrap();

        assert!(outputs[0].is_file());
        assert!(!dir.path().join("clip.mkv").exists());
    }

    #[tokio::test]
    async fn failed_download_stops_the_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ffmpeg-ran");
        let ytdlp = script(dir.path(), "yt-dlp", "echo 'ERROR: unsupported url' >&2\nexit 3");
        let ffmpeg = script(
            dir.path(),
            "ffmpeg",
            &format!("touch '{}'", marker.display()),
        );

        let err = invoker(&dir, &[], ytdlp, ffmpeg).run().await.unwrap_err();

        assert_eq!(exit_code(&err), 3);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn failed_conversion_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = fake_ytdlp(dir.path());
        let ffmpeg = script(dir.path(), "ffmpeg", "exit 5");

        let err = invoker(&dir, &["--remove-source"], ytdlp, ffmpeg)
            .run()
            .await
            .unwrap_err();

        assert_eq!(exit_code(&err), 5);
        assert!(dir.path().join("clip.mkv").is_file());
    }

    #[tokio::test]
    async fn download_without_reported_file() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = script(dir.path(), "yt-dlp", "echo '[download]  10.0% of 1.00MiB'");
        let ffmpeg = fake_ffmpeg(dir.path());

        let err = invoker(&dir, &[], ytdlp, ffmpeg).run().await.unwrap_err();

        let cause = err.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(cause, PipelineError::NoOutput(Tool::YtDlp)));
    }

    #[tokio::test]
    async fn download_only() {
        let dir = tempfile::tempdir().unwrap();
        let ytdlp = fake_ytdlp(dir.path());
        let ffmpeg = script(dir.path(), "ffmpeg", "exit 9");

        let mut invoker = invoker(&dir, &["--no-transcode"], ytdlp, ffmpeg);
        invoker.tools.ffmpeg = None;
        let outputs = invoker.run().await.unwrap();

        assert_eq!(outputs, vec![dir.path().join("clip.mkv")]);
    }

    #[tokio::test]
    async fn undecodable_output_keeps_draining() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mkv");
        let ytdlp = script(
            dir.path(),
            "yt-dlp",
            &format!(
                "printf 'caf\\351 title\\n'\n\
                 printf 'caf\\351 warning\\n' >&2\n\
                 printf data > '{clip}'\n\
                 echo '{clip}'",
                clip = clip.display()
            ),
        );
        let ffmpeg = fake_ffmpeg(dir.path());

        let outputs = invoker(&dir, &["--no-transcode"], ytdlp, ffmpeg)
            .run()
            .await
            .unwrap();

        assert_eq!(outputs, vec![clip]);
    }

    #[tokio::test]
    async fn converts_every_reported_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("one.mkv");
        let second = dir.path().join("two.mkv");
        let ytdlp = script(
            dir.path(),
            "yt-dlp",
            &format!(
                "printf data > '{a}'\n\
                 printf data > '{b}'\n\
                 echo '{a}'\n\
                 echo '{b}'",
                a = first.display(),
                b = second.display()
            ),
        );
        let ffmpeg = fake_ffmpeg(dir.path());

        let outputs = invoker(&dir, &["--remove-source"], ytdlp, ffmpeg)
            .run()
            .await
            .unwrap();

        assert_eq!(
            outputs,
            vec![dir.path().join("one.mp4"), dir.path().join("two.mp4")]
        );
        assert!(outputs.iter().all(|o| o.is_file()));
        assert!(!first.exists());
        assert!(!second.exists());
    }

    #[test]
    fn dry_run_commands() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = invoker(
            &dir,
            &["--cache-dir", "/tmp"],
            PathBuf::from("yt-dlp"),
            PathBuf::from("ffmpeg"),
        );

        let commands = invoker.commands();
        assert_eq!(commands.len(), 2);
        assert!(commands[0].starts_with("yt-dlp -f bestvideo+bestaudio/best"));
        assert!(commands[0].contains("--downloader /usr/bin/aria2c"));
        assert!(commands[0].contains("--live-from-start"));
        assert!(commands[0].ends_with("'https://example.com/watch?v=1'"));
        assert!(commands[1].starts_with("ffmpeg "));
        assert!(commands[1].contains("<downloaded>.mp4"));
    }
}
