use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
    Quiet,
}

impl UiMode {
    pub fn parse(flag: &str) -> Option<Self> {
        match flag {
            "auto" => Some(UiMode::Auto),
            "plain" => Some(UiMode::Plain),
            "pretty" => Some(UiMode::Pretty),
            "quiet" => Some(UiMode::Quiet),
            _ => None,
        }
    }
}

/// Stage reporting on stderr: spinners on a terminal, `==>` lines otherwise.
#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    fn pretty(&self) -> bool {
        self.is_tty && matches!(self.mode, UiMode::Auto | UiMode::Pretty)
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.mode == UiMode::Quiet {
            return StageGuard::new(name, None, true);
        }
        if self.pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name, Some(spinner), false)
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name, None, false)
        }
    }

    /// A stage with a known amount of work, advanced with `StageGuard::inc`.
    pub fn counted_stage(&self, name: &str, total: u64) -> StageGuard {
        if self.mode == UiMode::Quiet || !self.pretty() {
            return self.stage(name);
        }
        let bar = ProgressBar::new(total);
        bar.set_draw_target(ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(name.to_string());
        StageGuard::new(name, Some(bar), false)
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    bar: Option<ProgressBar>,
    silent: bool,
}

impl StageGuard {
    fn new(name: &str, bar: Option<ProgressBar>, silent: bool) -> Self {
        Self {
            name: name.to_string(),
            start: Instant::now(),
            bar,
            silent,
        }
    }

    pub fn inc(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        if self.silent {
            return;
        }
        let message = format!("✔ {} ({})", self.name, format_elapsed(self.start.elapsed()));
        match &self.bar {
            Some(bar) => {
                bar.set_style(ProgressStyle::default_spinner());
                bar.finish_with_message(message);
            }
            None => eprintln!("{message}"),
        }
    }
}

fn format_elapsed(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
