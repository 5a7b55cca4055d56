//! # Boardcam
//!
//! Turns the gerber and drill files KiCad exports for a two-sided board into
//! a FlatCAM shell script that writes one G-code file per machining step.
//!
//! ## Architecture
//!
//! Boardcam is organized as a workspace with multiple crates:
//!
//! 1. **boardcam-core** - Layer identity, bounds, drill tool tables and hits
//! 2. **boardcam-settings** - Job specs, tool profiles, layered config documents
//! 3. **boardcam-camtools** - Command model, tool matching, process generation, FlatCAM
//! 4. **boardcam** - Command-line binary that ties the crates together

pub mod cli;

pub use boardcam_camtools::{
    CamToolError, Command, DirectoryLayerSource, FlatcamRunner, ProcessGenerator,
};
pub use boardcam_core::{BoardProject, Layer, LayerSet, LayerSource, LayerType};
pub use boardcam_settings::{ConfigDocument, ConfigRegistry, EnvironmentConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Version line shown by `--version`
pub const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")");

/// Initialize logging
///
/// Sets up structured logging with:
/// - Output on stderr, so stdout stays usable for piping
/// - RUST_LOG environment variable support
/// - `info` by default, `debug` when `verbose` is set
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
