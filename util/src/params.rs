//! Parameter file loading
//!
//! Parameters are TOML files in `$ARM_SW_ROOT/params`, deserialised straight into the owning
//! module's parameter struct.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (ARM_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot open the parameter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot parse the parameter file: {0}")]
    DeserialiseError(toml::de::Error),

    /// The file parsed but the values are not consistent, raised by the owning module's checks.
    #[error("The parameter file contains an invalid value: {0}")]
    InvalidValue(String),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load `$ARM_SW_ROOT/params/<file_name>`.
pub fn load<P>(file_name: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let mut path = crate::host::get_arm_sw_root().map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(file_name);

    let params_str = read_to_string(path).map_err(LoadError::FileLoadError)?;

    from_str(&params_str)
}

/// Parse parameters from a TOML string.
pub fn from_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Endpoint {
        endpoint: String,
        timeout_ms: i32,
    }

    #[test]
    fn test_from_str() {
        let p: Endpoint = from_str("endpoint = \"tcp://*:5110\"\ntimeout_ms = 2000").unwrap();
        assert_eq!(p.endpoint, "tcp://*:5110");
        assert_eq!(p.timeout_ms, 2000);

        // Missing field
        assert!(matches!(
            from_str::<Endpoint>("endpoint = \"tcp://*:5110\""),
            Err(LoadError::DeserialiseError(_))
        ));
    }
}
