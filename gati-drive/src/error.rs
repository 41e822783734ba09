//! Error types for gati-drive

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// gati-drive error types
///
/// Obstacle contact and operator aborts are not errors; they surface as
/// controller states and run outcomes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Configuration parsed but is semantically invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Circuit rejected before a run
    #[error("Invalid circuit: {0}")]
    InvalidCircuit(String),

    /// Transient sensor read failure (one bad or missing sample)
    #[error("Sensor read failed: {0}")]
    SensorRead(&'static str),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidCircuit("5 segments (max 4)".to_string());
        assert_eq!(err.to_string(), "Invalid circuit: 5 segments (max 4)");

        let err = Error::SensorRead("bump");
        assert_eq!(err.to_string(), "Sensor read failed: bump");
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse: std::result::Result<toml::Value, toml::de::Error> = toml::from_str("a = [");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
