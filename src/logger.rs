use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::counters::CounterSnapshot;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,   // Only the final completion line
    Summary = 1,  // Results-saved notices (default)
    Detailed = 2, // Per-batch timing and the counter summary (-v)
    Debug = 3,    // Everything, including dropped subdomains (-vv)
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }
}

/// Operator-facing output for a scan: timestamped messages, a progress bar
/// over all subdomains, per-batch timing and the closing summary.
#[derive(Clone)]
pub struct ScanLogger {
    verbosity: VerbosityLevel,
    progress_bar: Arc<RwLock<Option<ProgressBar>>>,
}

impl ScanLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(RwLock::new(None)),
        }
    }

    /// True when the operator asked for verbose output (`-v` or more)
    pub fn is_verbose(&self) -> bool {
        self.verbosity >= VerbosityLevel::Detailed
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn error(&self, message: &str) {
        // Errors are shown at every verbosity
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let msg = format!("[{}] {}: {}", self.get_timestamp(), level, message);

        // Route through the progress bar so its redraws do not clobber the line
        if let Ok(guard) = self.progress_bar.try_read() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }

        eprintln!("{}", msg);
    }

    fn get_timestamp(&self) -> String {
        chrono::Local::now().format("%H:%M:%S%.3f").to_string()
    }

    pub async fn start_progress(&self, total: u64) {
        if self.verbosity == VerbosityLevel::Silent {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        pb.set_message("resolving");

        *self.progress_bar.write().await = Some(pb);
    }

    pub async fn update_progress(&self, message: &str) {
        if let Some(pb) = self.progress_bar.read().await.as_ref() {
            pb.set_message(message.to_string());
        }
    }

    pub async fn advance_progress(&self, steps: u64) {
        if let Some(pb) = self.progress_bar.read().await.as_ref() {
            pb.inc(steps);
        }
    }

    pub async fn finish_progress(&self) {
        if let Some(pb) = self.progress_bar.write().await.take() {
            pb.finish_and_clear();
        }
    }

    pub fn log_startup(&self, subdomains: usize, batch_size: usize, concurrency: usize) {
        self.info(&format!(
            "Scanning {} subdomains in batches of {} with {} concurrent workers",
            subdomains, batch_size, concurrency
        ));
    }

    pub fn log_task_dropped(&self, subdomain: &str, category: &str, error: &str) {
        self.debug(&format!("Dropped {} ({}): {}", subdomain, category, error));
    }

    pub fn log_batch_complete(&self, batch: usize, elapsed: Duration) {
        if self.is_verbose() {
            self.print_message(
                "INFO",
                &format!("--- Validated batch {} completed in {:.2}s ---", batch, elapsed.as_secs_f64()),
            );
        }
    }

    pub fn log_results_saved(&self, path: &str, rows: usize) {
        self.info(&format!("Results saved: {} ({} rows)", path, rows));
    }

    pub fn log_write_failed(&self, path: &str, error: &str) {
        self.error(&format!("Failed to write results to {}: {}", path, error));
    }

    /// Closing output. The counter table is printed only in verbose mode.
    pub fn print_final_summary(&self, counters: &CounterSnapshot, elapsed: Duration, output: &str) {
        if self.is_verbose() {
            println!("\n=== SCAN SUMMARY ===");
            println!("Batches Completed:    {}", counters.batches);
            println!("Subdomains Processed: {}", counters.processed);
            println!("Tasks Dropped:        {}", counters.failures);
            println!("Registry Lookups:     {}", counters.oracle_queries);
            println!("Service Matches:      {}", counters.service_matches);
            println!("Hijackable Found:     {}", counters.hijackable);
            println!("Output File:          {}", output);
            println!("====================\n");
        }

        println!(
            "--- Validated {} subdomains in {:.2}s: {} hijackable ---",
            counters.processed,
            elapsed.as_secs_f64(),
            counters.hijackable
        );
    }
}
