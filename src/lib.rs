pub mod claims;
pub mod client;
pub mod commands;
pub mod config;
pub mod doctor;
pub mod logging;
pub mod paths;
pub mod session;
pub mod toolkit;
pub mod ui;
pub mod uid;

#[cfg(test)]
pub mod test_utils;

/// Package version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short commit SHA captured at build time
pub const GIT_COMMIT: &str = env!("FBAUTH_GIT_COMMIT");

/// `--version` string: version plus build commit
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("FBAUTH_GIT_COMMIT"),
    ")"
);
