//! Progress bars driven by update events.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use modsync_lib::{UpdateEvent, UpdateListener};
use std::sync::Mutex;

fn style(template: &str, chars: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(chars)
}

#[derive(Default)]
struct Bars {
    main: Option<ProgressBar>,
    download: Option<ProgressBar>,
}

/// Renders check and update progress on the terminal.
pub struct ConsoleListener {
    multi: MultiProgress,
    bars: Mutex<Bars>,
}

impl ConsoleListener {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(Bars::default()),
        }
    }

    fn main_bar(&self, len: u64) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(style("[{bar:40.cyan/blue}] {pos}/{len} {msg}", "#>-"));
        pb
    }

    fn line(&self, msg: String) {
        if self.multi.println(&msg).is_err() {
            eprintln!("{}", msg);
        }
    }
}

impl UpdateListener for ConsoleListener {
    fn on_event(&self, event: UpdateEvent) {
        let mut bars = self.bars.lock().unwrap_or_else(|p| p.into_inner());

        match event {
            UpdateEvent::UpdateCheckStarted { artifact_count } => {
                bars.main = Some(self.main_bar(artifact_count as u64));
            }
            UpdateEvent::CheckingMod {
                name, position, ..
            } => {
                if let Some(pb) = &bars.main {
                    pb.set_position(position.saturating_sub(1) as u64);
                    pb.set_message(format!("checking {}", name));
                }
            }
            UpdateEvent::UpdateCheckCompleted { .. } => {
                if let Some(pb) = bars.main.take() {
                    pb.finish_and_clear();
                }
            }
            UpdateEvent::BatchUpdateProgress {
                current,
                total,
                name,
            } => {
                let pb = bars
                    .main
                    .get_or_insert_with(|| self.main_bar(total as u64));
                pb.set_position(current.saturating_sub(1) as u64);
                pb.set_message(name);
            }
            UpdateEvent::UpdateStarted { name } => {
                let pb = self.multi.add(ProgressBar::new(100));
                pb.set_style(style("  [{bar:40.green/yellow}] {pos}% {msg}", "█▉▊▋▌▍▎▏  "));
                pb.set_message(name);
                bars.download = Some(pb);
            }
            UpdateEvent::Downloading { percent, .. } => {
                if let Some(pb) = &bars.download {
                    pb.set_position(percent as u64);
                }
            }
            UpdateEvent::UpdateCompleted {
                name,
                old_version,
                new_version,
            } => {
                if let Some(pb) = bars.download.take() {
                    pb.finish_and_clear();
                }
                if let Some(pb) = &bars.main {
                    pb.inc(1);
                }
                self.line(format!("updated {} {} -> {}", name, old_version, new_version));
            }
            UpdateEvent::UpdateFailed { name, error } => {
                if let Some(pb) = bars.download.take() {
                    pb.abandon();
                }
                if let Some(pb) = &bars.main {
                    pb.inc(1);
                }
                self.line(format!("failed  {}: {}", name, error));
            }
            UpdateEvent::BatchUpdateCompleted { .. } => {
                if let Some(pb) = bars.main.take() {
                    pb.finish_and_clear();
                }
            }
        }
    }
}
