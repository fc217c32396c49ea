//! Console tracing setup for embedders and tests.

use tracing_subscriber::EnvFilter;

/// Initialize console tracing.
///
/// Honors `RUST_LOG` when set; otherwise logs the engram crates at `debug`
/// (verbose) or `info`. Safe to call more than once; later calls are no-ops.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "engram_agent=debug,engram_memory=debug,engram_graph=debug,engram_config=debug,info"
    } else {
        "engram_agent=info,engram_memory=info,engram_graph=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(filter)
        .try_init();
}
