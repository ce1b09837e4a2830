//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software checkout.
pub const SW_ROOT_ENV_VAR: &str = "ARM_SW_ROOT";

/// Get the software root directory, under which `params/` and `sessions/` live.
pub fn get_arm_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Get a short description of the host this executable is running on.
pub fn get_host_info() -> String {
    format!(
        "{} ({}, {})",
        std::env::var("HOSTNAME").unwrap_or_else(|_| String::from("unknown host")),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
