use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Canonical courier identifiers used in events, signals and config entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Courier {
    Inpost,
    Dpd,
    Dhl,
    Pocztex,
}

impl Courier {
    pub const ALL: [Self; 4] = [Self::Inpost, Self::Dpd, Self::Dhl, Self::Pocztex];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inpost => "inpost",
            Self::Dpd => "dpd",
            Self::Dhl => "dhl",
            Self::Pocztex => "pocztex",
        }
    }
}

impl Display for Courier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Courier {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inpost" => Ok(Self::Inpost),
            "dpd" => Ok(Self::Dpd),
            "dhl" => Ok(Self::Dhl),
            "pocztex" => Ok(Self::Pocztex),
            other => Err(ValidationError::UnknownCourier {
                value: other.to_owned(),
            }),
        }
    }
}
