//! Wordlist loading and windowed batch scheduling
//!
//! The wordlist is split into fixed-size windows. Each window is processed
//! with bounded concurrency and fully drained before the next begins: its
//! results are appended to the output file and its tally merged into the
//! run counters at that barrier. A worker that fails or panics costs only
//! its own row.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::classifier::ClassificationResult;
use crate::counters::{RunCounters, WindowTally};
use crate::logger::ScanLogger;
use crate::result_sink::ResultSink;
use crate::scanner::ScanError;

/// Read a wordlist: one subdomain per line, surrounding whitespace trimmed,
/// blank lines and `#` comments dropped.
pub fn read_wordlist(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read wordlist: {}", path.display()))?;
    Ok(parse_wordlist(&content))
}

pub fn parse_wordlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Drop subdomains that already have a row in a previous output file
pub fn remaining_subdomains(subdomains: Vec<String>, recorded: &HashSet<String>) -> Vec<String> {
    if recorded.is_empty() {
        return subdomains;
    }
    subdomains
        .into_iter()
        .filter(|s| !recorded.contains(&crate::domain_utils::normalize_hostname(s)))
        .collect()
}

/// What a completed run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub batches: usize,
    pub rows_written: usize,
    pub write_failures: usize,
    pub elapsed: Duration,
}

pub struct BatchScheduler {
    batch_size: usize,
    concurrency: usize,
}

impl BatchScheduler {
    /// Zero sizes are raised to one
    pub fn new(batch_size: usize, concurrency: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Run `worker` over every subdomain, one window at a time.
    ///
    /// Output write failures are logged and counted; the run continues with
    /// the next window.
    pub async fn run<F, Fut>(
        &self,
        subdomains: &[String],
        worker: F,
        sink: &ResultSink,
        counters: &RunCounters,
        logger: &ScanLogger,
    ) -> BatchReport
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<ClassificationResult, ScanError>>,
    {
        let started = Instant::now();
        let mut report = BatchReport::default();

        if subdomains.is_empty() {
            return report;
        }

        logger.log_startup(subdomains.len(), self.batch_size, self.concurrency);
        logger.start_progress(subdomains.len() as u64).await;

        for (index, window) in subdomains.chunks(self.batch_size).enumerate() {
            let batch_number = index + 1;
            let window_started = Instant::now();
            logger.update_progress(&format!("batch {}", batch_number)).await;

            let (results, tally) = self.process_window(window, &worker, logger).await;

            match sink.write(&results) {
                Ok(rows) => {
                    report.rows_written += rows;
                    if rows > 0 {
                        logger.log_results_saved(&sink.path().display().to_string(), rows);
                    }
                }
                Err(e) => {
                    error!("Batch {} results could not be written: {:#}", batch_number, e);
                    logger.log_write_failed(&sink.path().display().to_string(), &format!("{:#}", e));
                    report.write_failures += 1;
                }
            }

            counters.merge(&tally);
            report.batches += 1;

            logger.advance_progress(window.len() as u64).await;
            logger.log_batch_complete(batch_number, window_started.elapsed());
        }

        logger.finish_progress().await;
        report.elapsed = started.elapsed();
        report
    }

    async fn process_window<F, Fut>(
        &self,
        window: &[String],
        worker: &F,
        logger: &ScanLogger,
    ) -> (Vec<ClassificationResult>, WindowTally)
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<ClassificationResult, ScanError>>,
    {
        let outcomes: Vec<(String, Result<ClassificationResult, ScanError>)> = stream::iter(window.iter().cloned())
            .map(|subdomain| async move {
                let outcome = AssertUnwindSafe(async { worker(subdomain.clone()).await })
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        Err(ScanError::Panicked {
                            subdomain: subdomain.clone(),
                            message: panic_message(payload.as_ref()),
                        })
                    });
                (subdomain, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut tally = WindowTally::default();
        let mut results = Vec::with_capacity(outcomes.len());

        for (subdomain, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    tally.record(&result);
                    results.push(result);
                }
                Err(e) => {
                    match &e {
                        ScanError::Panicked { .. } => warn!(category = e.category(), "{}", e),
                        _ => debug!(category = e.category(), "{}", e),
                    }
                    logger.log_task_dropped(&subdomain, e.category(), &e.to_string());
                    tally.record_failure();
                }
            }
        }

        (results, tally)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
