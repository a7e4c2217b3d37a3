use std::io::Stdout;

use pbr::ProgressBar;

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// `None` for transfers of unknown size, e.g. live streams.
    pub percent: Option<f32>,
    pub detail: String,
}

impl Progress {
    /// Recognises yt-dlp `[download]` lines and aria2c `[#gid ...]` summary lines.
    pub fn parse(line: &str) -> Option<Progress> {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("[download]") {
            return parse_ytdlp(rest.trim());
        }
        if line.starts_with("[#") && line.ends_with(']') {
            return parse_aria2c(&line[2..line.len() - 1]);
        }
        None
    }
}

fn parse_ytdlp(rest: &str) -> Option<Progress> {
    let first = rest.split_whitespace().next()?;
    if let Some(percent) = first.strip_suffix('%') {
        let percent = percent.parse::<f32>().ok()?;
        return Some(Progress {
            percent: Some(clamp(percent)),
            detail: rest.to_owned(),
        });
    }

    // live: `[download]   12.34MiB at  1.00MiB/s (00:00:10)`
    if is_size(first) && rest.contains(" at ") {
        return Some(Progress {
            percent: None,
            detail: rest.to_owned(),
        });
    }
    None
}

fn parse_aria2c(inner: &str) -> Option<Progress> {
    let mut parts = inner.split_whitespace();
    let _gid = parts.next()?;
    let transfer = parts.next()?;

    let percent = match (transfer.find('('), transfer.find("%)")) {
        (Some(open), Some(close)) if open < close => {
            Some(clamp(transfer[open + 1..close].parse::<f32>().ok()?))
        }
        _ => None,
    };
    if percent.is_none() && !transfer.split('/').next().map_or(false, is_size) {
        return None;
    }

    Some(Progress {
        percent,
        detail: inner.to_owned(),
    })
}

fn is_size(token: &str) -> bool {
    let token = token.trim_start_matches('~');
    let unit_at = match token.find(|c: char| c.is_ascii_alphabetic()) {
        Some(i) if i > 0 => i,
        _ => return false,
    };
    let (number, unit) = token.split_at(unit_at);
    number.parse::<f64>().is_ok()
        && matches!(
            unit,
            "B" | "KiB" | "MiB" | "GiB" | "TiB" | "KB" | "MB" | "GB" | "TB"
        )
}

fn clamp(percent: f32) -> f32 {
    percent.max(0.0).min(100.0)
}

/// Terminal progress bar, created on the first report.
#[derive(Default)]
pub struct ProgressDisplay {
    bar: Option<ProgressBar<Stdout>>,
}

impl ProgressDisplay {
    pub fn update(&mut self, progress: &Progress) {
        let bar = self.bar.get_or_insert_with(|| {
            let mut pb = ProgressBar::new(100);
            pb.show_speed = false;
            pb.show_time_left = false;
            pb
        });
        match progress.percent {
            Some(percent) => {
                bar.message("");
                bar.set(percent.round() as u64);
            }
            None => {
                bar.message(&format!("{} ", progress.detail));
                bar.tick();
            }
        }
    }

    pub fn finish(&mut self) {
        if let Some(mut bar) = self.bar.take() {
            bar.finish();
        }
    }
}
