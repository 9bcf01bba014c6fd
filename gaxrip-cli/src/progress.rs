//! Terminal progress bars for scan phases

use gaxrip_core::progress::{Phase, Progress, ProgressSink};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// One progress bar per scan phase, replaced as phases change
pub struct PhaseBars {
    quiet: bool,
    current: Option<(Phase, ProgressBar)>,
}

impl PhaseBars {
    /// Create bars; `quiet` hides them entirely
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            current: None,
        }
    }

    fn start(&self, phase: Phase, total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        if self.quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }

        let template = match phase {
            Phase::Index => "{prefix:>8} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            _ => "{prefix:>8} [{bar:40.cyan/blue}] {pos}/{len} targets",
        };
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix(phase_label(phase));
        bar
    }

    /// Clear whatever bar is still showing
    pub fn finish(&mut self) {
        if let Some((_, bar)) = self.current.take() {
            bar.finish_and_clear();
        }
    }
}

impl ProgressSink for PhaseBars {
    fn report(&mut self, progress: Progress) {
        let same_phase = matches!(&self.current, Some((phase, _)) if *phase == progress.phase);
        if !same_phase {
            self.finish();
            let bar = self.start(progress.phase, progress.total);
            self.current = Some((progress.phase, bar));
        }

        if let Some((_, bar)) = &self.current {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.position as u64);
        }
        if progress.is_complete() {
            self.finish();
        }
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Index => "index",
        Phase::Probe => "probe",
        Phase::Scan => "scan",
        Phase::Orphans => "orphans",
    }
}
