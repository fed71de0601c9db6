//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software checkout.
pub const SW_ROOT_ENV_VAR: &str = "DEEPSPACE_SW_ROOT";

/// Get the root directory of the software, from the `DEEPSPACE_SW_ROOT` environment variable.
///
/// Parameter files are found in `<root>/params` and sessions are created under `<root>/sessions`.
pub fn get_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}
