//! Command modules for the wallmountd CLI
//!
//! - `serve` - run the HTTP server
//! - `sweep` - offline retention sweep
//! - `status` - print live and staged versions (and the effective config with `-v`)
//!
//! Every handler takes the resolved `WallmountConfig` and returns the text to
//! print on stdout.

pub mod serve;
pub mod status;
pub mod sweep;

pub use serve::{bootstrap, run_serve};
pub use status::run_status;
pub use sweep::run_sweep;

use tracing_subscriber::EnvFilter;

use crate::config::WallmountConfig;

/// Initialize tracing to stderr. `RUST_LOG` directives take precedence over
/// the configured level.
pub fn init_tracing(config: &WallmountConfig) {
    let directive = format!("wallmount={}", config.logging.level);
    let filter = match directive.parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    // May already be initialized (tests); that is fine
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
