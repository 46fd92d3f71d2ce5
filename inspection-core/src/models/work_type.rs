use std::fmt;

use serde::{Deserialize, Serialize};

/// Labour-intensity classification that selects the hourly rate curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkType {
    Surface,
    Demolition,
    Construction,
    Subfloor,
}

impl WorkType {
    pub fn all() -> &'static [WorkType] {
        &[
            WorkType::Surface,
            WorkType::Demolition,
            WorkType::Construction,
            WorkType::Subfloor,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Surface => "SURFACE",
            Self::Demolition => "DEMOLITION",
            Self::Construction => "CONSTRUCTION",
            Self::Subfloor => "SUBFLOOR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SURFACE" => Some(Self::Surface),
            "DEMOLITION" => Some(Self::Demolition),
            "CONSTRUCTION" => Some(Self::Construction),
            "SUBFLOOR" => Some(Self::Subfloor),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Surface => "Surface treatment",
            Self::Demolition => "Demolition",
            Self::Construction => "Construction",
            Self::Subfloor => "Subfloor",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
