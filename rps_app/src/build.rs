//! Provides constants about the build environment.

/// The cargo package version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The short git hash of the repo at the time of the build.
///
/// Falls back to "&lt;unknown&gt;" when the build script could not query git,
/// so this is only meant for display.
pub const GIT_HASH: &str = match option_env!("GIT_HASH") {
    Some(git_hash) => git_hash,
    None => "<unknown>",
};
