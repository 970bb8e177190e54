pub mod batch;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod counters;
pub mod dns;
pub mod domain_utils;
pub mod fingerprint;
pub mod logger;
pub mod rate_limit;
pub mod rdap;
pub mod result_sink;
pub mod scanner;

pub use classifier::{ClassificationResult, CnameLookup, RegistrationStatus, Verdict};
pub use scanner::{ScanError, Scanner};
