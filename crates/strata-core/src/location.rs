use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a tensor's memory (or a caller's source data) lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Host-visible memory (CPU engines).
    #[default]
    Host,
    /// Accelerator-resident memory.
    Device,
}

impl Location {
    /// Whether this is host memory.
    pub fn is_host(&self) -> bool {
        matches!(self, Location::Host)
    }

    /// Whether this is accelerator memory.
    pub fn is_device(&self) -> bool {
        matches!(self, Location::Device)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Host => write!(f, "host"),
            Location::Device => write!(f, "device"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_properties() {
        assert!(Location::Host.is_host());
        assert!(!Location::Host.is_device());
        assert!(Location::Device.is_device());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Location::Host), "host");
        assert_eq!(format!("{}", Location::Device), "device");
    }

    #[test]
    fn test_default() {
        assert_eq!(Location::default(), Location::Host);
    }
}
