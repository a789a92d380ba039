use crate::config::resolution::ResolutionParseError;

use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    DateParse(chrono::ParseError),
    Resolution(ResolutionParseError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Threshold(&'static str),
    ThresholdOrder,
    Iterations(&'static str),
    Tolerance,
    CellSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DateParse(e) => write!(f, "Failed to parse date: {}", e),
            ConfigError::Resolution(e) => write!(f, "{}", e),
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to parse JSON: {}", e),
            ConfigError::Threshold(name) => write!(f, "{} must be in (0, 1]", name),
            ConfigError::ThresholdOrder => {
                write!(f, "refine_threshold cannot be lower than visibility_threshold")
            }
            ConfigError::Iterations(name) => write!(f, "{} must be positive", name),
            ConfigError::Tolerance => write!(f, "brent_tolerance must be positive"),
            ConfigError::CellSize => write!(f, "cell_size must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> ConfigError {
        ConfigError::Io(err)
    }
}

impl From<chrono::ParseError> for ConfigError {
    fn from(err: chrono::ParseError) -> ConfigError {
        ConfigError::DateParse(err)
    }
}

impl From<ResolutionParseError> for ConfigError {
    fn from(err: ResolutionParseError) -> ConfigError {
        ConfigError::Resolution(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> ConfigError {
        ConfigError::Json(err)
    }
}
