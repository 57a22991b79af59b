use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CivilStatus {
    Single,
    Married,
    Divorced,
    Widowed,
    RegisteredPartnership,
}

impl CivilStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Married => "married",
            Self::Divorced => "divorced",
            Self::Widowed => "widowed",
            Self::RegisteredPartnership => "registered_partnership",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Some(Self::Single),
            "married" => Some(Self::Married),
            "divorced" => Some(Self::Divorced),
            "widowed" => Some(Self::Widowed),
            "registered_partnership" | "partnership" => Some(Self::RegisteredPartnership),
            _ => None,
        }
    }

    /// Couples assessed jointly: married and registered partners.
    pub fn is_joint(&self) -> bool {
        matches!(self, Self::Married | Self::RegisteredPartnership)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    #[default]
    Employed,
    SelfEmployed,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employed => "employed",
            Self::SelfEmployed => "self_employed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employed" => Some(Self::Employed),
            "self_employed" | "self-employed" => Some(Self::SelfEmployed),
            _ => None,
        }
    }
}

/// Confessions recognised for church tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confession {
    Protestant,
    RomanCatholic,
    ChristCatholic,
}

impl Confession {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Protestant => "protestant",
            Self::RomanCatholic => "roman_catholic",
            Self::ChristCatholic => "christ_catholic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "protestant" | "reformed" => Some(Self::Protestant),
            "roman_catholic" | "catholic" => Some(Self::RomanCatholic),
            "christ_catholic" => Some(Self::ChristCatholic),
            _ => None,
        }
    }
}
