use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Investment time frame. Selects the weight row and the target-price model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Horizon {
    Intraday,
    OneYear,
    ThreeYear,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Intraday, Horizon::OneYear, Horizon::ThreeYear];

    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::Intraday => "INTRADAY",
            Horizon::OneYear => "ONE_YEAR",
            Horizon::ThreeYear => "THREE_YEAR",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Horizon {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "INTRADAY" | "1D" => Ok(Horizon::Intraday),
            "ONE_YEAR" | "1Y" => Ok(Horizon::OneYear),
            "THREE_YEAR" | "3Y" => Ok(Horizon::ThreeYear),
            _ => anyhow::bail!("unknown horizon: {s} (expected INTRADAY, ONE_YEAR or THREE_YEAR)"),
        }
    }
}
