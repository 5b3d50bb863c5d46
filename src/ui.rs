use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::i18n::{Lang, Msg, StatusKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
    lang: Lang,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool, lang: Lang) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
            lang,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool, lang: Lang) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty, lang)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Progress bar counting finished probes. Hidden in plain mode.
    pub fn probe_progress(&self, total: usize) -> ProgressBar {
        if !self.use_pretty() {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total as u64);
        bar.set_draw_target(ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(Msg::ProbeRunning.text(self.lang));
        bar
    }

    /// Print a status line on stderr in the operator's language.
    pub fn status(&self, msg: &Msg) {
        let text = msg.text(self.lang);
        let marker = status_marker(msg.kind());
        if self.use_pretty() {
            eprintln!("{} {}", marker, text);
        } else {
            eprintln!("[{}] {}", plain_marker(msg.kind()), text);
        }
        match msg.kind() {
            StatusKind::Bad => log::warn!("{}", msg),
            _ => log::debug!("{}", msg),
        }
    }
}

fn status_marker(kind: StatusKind) -> &'static str {
    match kind {
        StatusKind::Info => "·",
        StatusKind::Good => "✔",
        StatusKind::Warn => "!",
        StatusKind::Bad => "✘",
    }
}

fn plain_marker(kind: StatusKind) -> &'static str {
    match kind {
        StatusKind::Info => "info",
        StatusKind::Good => "ok",
        StatusKind::Warn => "warn",
        StatusKind::Bad => "fail",
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
