use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use anyhow::Error;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub interactive: bool,
}

impl Context {
    pub fn detect() -> Self {
        Self {
            interactive: io::stderr().is_terminal(),
        }
    }

    pub fn with_quiet(self, quiet: bool) -> Self {
        if quiet { Self { interactive: false } } else { self }
    }
}

/// Step spinner for interactive runs; silent otherwise.
pub struct Progress {
    bar: Option<ProgressBar>,
    interactive: bool,
    start: Instant,
}

impl Progress {
    pub fn new(interactive: bool) -> Self {
        Self {
            bar: None,
            interactive,
            start: Instant::now(),
        }
    }

    pub fn step(&mut self, description: &str) {
        if !self.interactive {
            return;
        }
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .expect("invalid template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.set_message(format!("{description}..."));
        self.bar = Some(bar);
    }

    pub fn complete_step(&mut self, description: &str) {
        if !self.interactive {
            return;
        }
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "  \x1b[32m✓\x1b[0m {description}");
    }

    pub fn finish(mut self) {
        if !self.interactive {
            return;
        }
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        let mut stderr = io::stderr().lock();
        let _ = writeln!(
            stderr,
            "  \x1b[32m✓\x1b[0m Done ({:.2}s)",
            self.start.elapsed().as_secs_f64()
        );
    }
}

pub fn print_error(err: &Error) {
    let mut stderr = io::stderr().lock();

    let _ = writeln!(stderr);
    let _ = writeln!(stderr, "  \x1b[31m✗ Error:\x1b[0m {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "    caused by: {cause}");
        source = cause.source();
    }

    for hint in collect_hints(err) {
        let _ = writeln!(stderr, "    \x1b[2mhint: {hint}\x1b[0m");
    }
    let _ = writeln!(stderr);
}

fn collect_hints(err: &Error) -> Vec<String> {
    use traj_mend::MendError;
    use traj_mend::io::Error as IoError;

    let mut hints = Vec::new();

    if let Some(mend_err) = err.downcast_ref::<MendError>() {
        match mend_err {
            MendError::Geometry { .. } => {
                hints.push("check the six cell values passed via --cell".into());
            }
            MendError::UnknownElement { .. } => {
                hints.push("no radius data for this element; try --geometric weights or a topology file".into());
            }
            MendError::TooManyAtoms { limit, .. } => {
                hints.push(format!(
                    "dense pair matrices are capped at {limit} atoms; split the system first"
                ));
            }
            MendError::BrokenTopology { .. } => {
                hints.push("drop --strict to continue with the detected partition".into());
                hints.push("or adjust --bond-scale to change the bond criterion".into());
            }
            MendError::JoinFailure { molecule, .. } => {
                hints.push(format!(
                    "molecule {molecule} could not be joined; inspect it with `tmend inspect`"
                ));
            }
        }
    } else if let Some(io_err) = err.downcast_ref::<IoError>() {
        match io_err {
            IoError::Parse { line, .. } => {
                hints.push(format!("inspect the input around line {line}"));
            }
            IoError::TopologyMismatch(_) => {
                hints.push("regenerate the topology file with `tmend topology`".into());
            }
            _ => {}
        }
    }

    hints
}
