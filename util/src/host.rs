//! Host platform (linux for example) utility functions

use std::env;
use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software tree.
///
/// The `params` and `sessions` directories are resolved relative to this root.
pub const SW_ROOT_ENV_VAR: &str = "PNP_SW_ROOT";

/// Retrieve uname information.
pub fn get_uname() -> std::io::Result<uname::Info> {
    uname::uname()
}

/// Get the root directory of the software from the `PNP_SW_ROOT` environment variable.
pub fn get_pnp_sw_root() -> Result<PathBuf, env::VarError> {
    env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
