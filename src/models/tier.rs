//! Competitive tiers and their total order.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Competitive rank bucket, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Bronze,
        Tier::Silver,
        Tier::Gold,
        Tier::Platinum,
        Tier::Diamond,
        Tier::Master,
    ];

    /// Parse an upstream tier name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Tier::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
            Tier::Diamond => "Diamond",
            Tier::Master => "Master",
        }
    }

    fn rank(&self) -> i32 {
        *self as i32
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-division inside a tier. `V` is lowest, `I` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubTier {
    V,
    IV,
    III,
    II,
    I,
}

impl SubTier {
    /// Parse roman ("II") or numeric ("2") sub-tiers.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "V" | "5" => Some(SubTier::V),
            "IV" | "4" => Some(SubTier::IV),
            "III" | "3" => Some(SubTier::III),
            "II" | "2" => Some(SubTier::II),
            "I" | "1" => Some(SubTier::I),
            _ => None,
        }
    }

    fn rank(&self) -> i32 {
        *self as i32
    }
}

impl fmt::Display for SubTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubTier::V => "V",
            SubTier::IV => "IV",
            SubTier::III => "III",
            SubTier::II => "II",
            SubTier::I => "I",
        };
        f.write_str(s)
    }
}

/// Numeric ordering key: tier dominates, a missing sub-tier sorts below `V`.
pub fn tier_value(tier: Tier, sub_tier: Option<SubTier>) -> i32 {
    tier.rank() * 10 + sub_tier.map(|s| s.rank()).unwrap_or(-1)
}

/// One mode's claim to a tier, gathered during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierCandidate {
    pub tier: Tier,
    pub sub_tier: Option<SubTier>,
    pub points: Option<f64>,
    /// Mode key the candidate came from ("squad-fpp", "squad-fpp-best")
    pub source_mode: String,
}

impl TierCandidate {
    pub fn value(&self) -> i32 {
        tier_value(self.tier, self.sub_tier)
    }

    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.value().cmp(&other.value())
    }
}

/// Highest candidate; ties keep the first one encountered.
pub fn pick_best_tier<'a, I>(candidates: I) -> Option<TierCandidate>
where
    I: IntoIterator<Item = &'a TierCandidate>,
{
    candidates.into_iter().fold(None, |best, cur| match best {
        Some(b) if cur.cmp_rank(&b) != Ordering::Greater => Some(b),
        _ => Some(cur.clone()),
    })
}
