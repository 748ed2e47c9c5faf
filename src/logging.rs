//! Logging initialization.
//!
//! Log output goes to stderr so it never mixes with command output. The
//! level follows `-v`, and `RUST_LOG` overrides it entirely:
//!
//! ```bash
//! git hulahoop -v issue list
//! RUST_LOG=git_hulahoop=trace,reqwest=debug git hulahoop issue show 12
//! ```

use tracing_subscriber::EnvFilter;

/// Initialize the logging subsystem.
///
/// - no `-v`: warnings and errors only
/// - `-v`: debug output of this tool
/// - `-vv`: trace output of this tool, debug output of its dependencies
pub fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "warn,git_hulahoop=debug",
        _ => "debug,git_hulahoop=trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
