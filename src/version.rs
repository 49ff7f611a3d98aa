// Build-time version from Cargo.toml

/// Agent version, reported in the startup log.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");
