//! Search options shared by every demo binary.

use clap::Args;
use protomc::RunConfig;
use tracing_subscriber::EnvFilter;

#[derive(Args, Debug)]
pub struct SearchOpts {
    /// Maximum search depth; -1 explores without bound
    #[arg(short = 'd', long = "depth", default_value_t = -1, allow_negative_numbers = true)]
    pub depth: i64,

    /// Disable symmetry reduction
    #[arg(short = 'o', long = "no-symmetry")]
    pub no_symmetry: bool,

    /// Suppress progress output
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Time the run with a monotonic clock (implies --quiet)
    #[arg(short = 't', long = "time")]
    pub time: bool,
}

impl SearchOpts {
    /// Whether output beyond the violation report should be suppressed.
    /// Timing runs are quiet so the clock measures the search, not stdout.
    pub fn is_quiet(&self) -> bool {
        self.quiet || self.time
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            max_depth: usize::try_from(self.depth).ok(),
            symmetry_reduction: !self.no_symmetry,
        }
    }

    /// Initialize logging the same way in every binary: progress events at
    /// info level unless quiet, warnings always.
    pub fn init_tracing(&self) {
        let filter = if self.is_quiet() {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        };
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .init();
    }
}
