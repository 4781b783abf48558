//! Toolpath post-processor for the Charly Robot and other G-code dialects
//!
//! A CAM job ([`toolpath::PathNode`] tree) goes in, controller-ready
//! G-code text comes out. What differs between controllers lives in a
//! [`post::DialectPolicy`]; how the program is laid out lives in a
//! [`config::Config`].

pub mod codegen;
pub mod config;
pub mod error;
pub mod post;
pub mod toolpath;
pub mod units;

pub use codegen::{EmitError, Emitter};
pub use config::Config;
pub use error::Error;
pub use post::{DialectKind, DialectPolicy};
pub use toolpath::{Command, PathNode, Quantity};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Post-process `nodes` into one program. Nothing is returned when any
/// node fails; partial programs are never handed out.
pub fn export(
    nodes: &[PathNode],
    policy: &DialectPolicy,
    config: &Config,
) -> Result<String, EmitError> {
    Emitter::new(policy, config).generate(nodes)
}

/// Same as [`export`], with the configuration given as an option string
pub fn export_with_args(
    nodes: &[PathNode],
    policy: &DialectPolicy,
    options: &str,
) -> Result<String, Error> {
    let config = Config::parse(options)?;
    Ok(export(nodes, policy, &config)?)
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`)
pub fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // A second call (tests, embedding hosts) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
