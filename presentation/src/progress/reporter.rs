//! Progress reporting for step execution

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use solver_application::StepProgressNotifier;
use solver_domain::Step;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Reports step progress with a progress bar on stderr
pub struct StepProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
    /// Bytes streamed during the current step
    streamed: AtomicUsize,
}

impl StepProgressReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            streamed: AtomicUsize::new(0),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let mut guard = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        let bar = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new(Step::ORDER.len() as u64);
            pb.set_style(Self::style());
            pb.enable_steady_tick(std::time::Duration::from_millis(120));
            pb
        });
        f(bar);
    }

    fn step_display_name(step: Step) -> &'static str {
        match step {
            Step::Understand => "Understanding",
            Step::Plan => "Planning",
            Step::Implement => "Implementing",
            Step::Verify => "Verifying",
            Step::End => "Finishing",
        }
    }
}

impl Default for StepProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StepProgressNotifier for StepProgressReporter {
    fn on_step_start(&self, step: Step, attempt: u32) {
        self.streamed.store(0, Ordering::Relaxed);
        self.with_bar(|pb| {
            pb.set_prefix(Self::step_display_name(step));
            if attempt > 1 {
                pb.set_message(format!("attempt {}", attempt));
            } else {
                pb.set_message("");
            }
        });
    }

    fn on_step_complete(&self, step: Step) {
        self.with_bar(|pb| {
            pb.set_message(format!("{} {}", "v".green(), step));
            pb.inc(1);
        });
    }

    fn on_step_retry(&self, step: Step, retry: u32, error: &str) {
        self.with_bar(|pb| {
            pb.println(format!(
                "  {} {} failed (retry {}): {}",
                "!".yellow(),
                step,
                retry,
                error
            ));
        });
    }

    fn on_chunk(&self, _step: Step, chunk: &str) {
        let total = self.streamed.fetch_add(chunk.len(), Ordering::Relaxed) + chunk.len();
        self.with_bar(|pb| pb.set_message(format!("{} bytes received", total).dimmed().to_string()));
    }

    fn on_provider_fallback(&self, from: &str, to: &str) {
        self.with_bar(|pb| {
            pb.println(format!(
                "  {} switching provider {} -> {}",
                "!".yellow(),
                from,
                to
            ));
        });
    }

    fn on_task_complete(&self, success: bool) {
        let bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(pb) = bar {
            if success {
                pb.finish_with_message(format!("{}", "done".green()));
            } else {
                pb.abandon_with_message(format!("{}", "failed".red()));
            }
        }
    }
}

/// Plain-text progress on stderr; streamed chunks are echoed as they arrive
pub struct SimpleProgress;

impl StepProgressNotifier for SimpleProgress {
    fn on_step_start(&self, step: Step, attempt: u32) {
        let name = StepProgressReporter::step_display_name(step);
        if attempt > 1 {
            eprintln!("{} {} (attempt {})", "->".cyan(), name.bold(), attempt);
        } else {
            eprintln!("{} {}", "->".cyan(), name.bold());
        }
    }

    fn on_step_complete(&self, _step: Step) {
        eprintln!();
    }

    fn on_step_retry(&self, step: Step, retry: u32, error: &str) {
        eprintln!("  {} {} failed (retry {}): {}", "x".red(), step, retry, error);
    }

    fn on_chunk(&self, _step: Step, chunk: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "{}", chunk.dimmed());
        let _ = stderr.flush();
    }

    fn on_provider_fallback(&self, from: &str, to: &str) {
        eprintln!("  {} switching provider {} -> {}", "!".yellow(), from, to);
    }
}
