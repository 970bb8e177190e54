use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hijackfinder")]
#[command(about = "Find subdomains whose CNAME points at an unregistered domain or an unclaimed service")]
#[command(version)]
pub struct Cli {
    /// Wordlist with one subdomain per line
    #[arg(short = 'f', long, value_name = "FILE", required_unless_present = "init")]
    pub filepath: Option<PathBuf>,

    /// JSON catalog of service fingerprints
    #[arg(short = 'p', long, value_name = "FILE", default_value = "fingerprints.json")]
    pub fingerprints: PathBuf,

    /// CSV file results are appended to
    #[arg(short = 'o', long, value_name = "FILE", default_value = "results.csv")]
    pub outfile: PathBuf,

    /// Verbose output: write every result (not just hijackable ones) and
    /// report per-batch timing. Use -vv for debug logging.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file (defaults to ./config/hijackfinder.toml, falling
    /// back to built-in defaults when it does not exist)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subdomains per window (overrides config)
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Concurrent workers per window (overrides config)
    #[arg(short = 'c', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Skip subdomains that already have a row in the output file. Without
    /// -v only hijackable rows are written, so other subdomains are scanned again.
    #[arg(long)]
    pub resume: bool,

    /// Create default configuration file at ./config/hijackfinder.toml (or --config)
    #[arg(long)]
    pub init: bool,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose > 0
    }
}
