use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Security classification derived from a face's dominant emotion.
///
/// Variants are ordered by severity, so `max` picks the most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreatCategory {
    Safe,
    Offensive,
    Threat,
}

impl ThreatCategory {
    pub const ALL: [ThreatCategory; 3] = [
        ThreatCategory::Safe,
        ThreatCategory::Offensive,
        ThreatCategory::Threat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThreatCategory::Safe => "Safe",
            ThreatCategory::Offensive => "Offensive",
            ThreatCategory::Threat => "Threat",
        }
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThreatCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThreatCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown threat category '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(ThreatCategory::Threat > ThreatCategory::Offensive);
        assert!(ThreatCategory::Offensive > ThreatCategory::Safe);
    }

    #[test]
    fn test_round_trips_through_display() {
        for c in ThreatCategory::ALL {
            assert_eq!(c.to_string().parse::<ThreatCategory>().unwrap(), c);
        }
    }
}
