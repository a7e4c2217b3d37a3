use std::path::PathBuf;

use argh::FromArgs;

pub const DEFAULT_FORMAT: &str = "bestvideo+bestaudio/best";
pub const DEFAULT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

#[derive(FromArgs, Debug)]
/// download online video with yt-dlp (aria2c as transfer backend) and convert it with ffmpeg
pub struct Args {
    #[argh(positional)]
    /// video page or stream url
    pub url: String,

    #[argh(option, short = 'f', default = "DEFAULT_FORMAT.to_owned()")]
    /// yt-dlp format selector. default: bestvideo+bestaudio/best
    pub format: String,

    #[argh(option, short = 'o', default = "DEFAULT_TEMPLATE.to_owned()")]
    /// yt-dlp output template.
    /// `-o "%(id)s.%(ext)s"`
    pub output: String,

    #[argh(option, short = 'd')]
    /// directory for downloaded and converted files. default: current directory
    pub output_dir: Option<PathBuf>,

    #[argh(option, short = 'c', default = "16")]
    /// aria2c connections per server. default: 16
    pub connections: u8,

    #[argh(option)]
    /// netscape cookie file passed to yt-dlp
    pub cookies: Option<PathBuf>,

    #[argh(option, default = "std::env::temp_dir()")]
    /// aria2c working dir
    pub cache_dir: PathBuf,

    #[argh(switch)]
    /// start live streams at the live edge instead of the beginning
    pub live_edge: bool,

    #[argh(switch)]
    /// do not use aria2c, let yt-dlp download by itself
    pub no_accelerator: bool,

    #[argh(option, short = 't', default = "String::from(\"mp4\")")]
    /// target container for ffmpeg. default: mp4
    pub target: String,

    #[argh(option, default = "String::from(\"copy\")")]
    /// ffmpeg codec. default: copy
    pub codec: String,

    #[argh(switch)]
    /// only download, skip ffmpeg
    pub no_transcode: bool,

    #[argh(switch)]
    /// delete the downloaded file after a successful conversion
    pub remove_source: bool,

    #[argh(switch)]
    /// print the commands instead of running them
    pub dry_run: bool,

    #[argh(switch, short = 'v')]
    /// debug output
    pub verbose: bool,
}
