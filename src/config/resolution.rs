use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::constants::{FR_PIXELS_PER_CELL, RR_PIXELS_PER_CELL};

/// Product resolution of the input scene.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    #[serde(rename(deserialize = "reduced"))]
    Reduced,
    #[serde(rename(deserialize = "full"))]
    Full,
}

impl Resolution {
    /// Cell side in pixels for a 30 km cell.
    pub fn pixels_per_cell(&self) -> usize {
        match self {
            Resolution::Reduced => RR_PIXELS_PER_CELL,
            Resolution::Full => FR_PIXELS_PER_CELL,
        }
    }
}

impl FromStr for Resolution {
    type Err = ResolutionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reduced" | "rr" => Ok(Resolution::Reduced),
            "full" | "fr" => Ok(Resolution::Full),
            _ => Err(ResolutionParseError(s.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct ResolutionParseError(String);

impl fmt::Display for ResolutionParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid resolution '{}', expected 'reduced' or 'full'", self.0)
    }
}

impl std::error::Error for ResolutionParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!("reduced".parse::<Resolution>().unwrap(), Resolution::Reduced);
        assert_eq!("FR".parse::<Resolution>().unwrap(), Resolution::Full);
        assert!("medium".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_pixels_per_cell() {
        assert_eq!(Resolution::Reduced.pixels_per_cell(), 30);
        assert_eq!(Resolution::Full.pixels_per_cell(), 120);
    }
}
