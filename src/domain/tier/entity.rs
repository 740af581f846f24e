use serde::{Deserialize, Serialize};

/// One content wave of an article deck, unlocked in sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "core")]
    Core,
    #[serde(rename = "deep_dive_1")]
    DeepDive1,
    #[serde(rename = "deep_dive_2")]
    DeepDive2,
}

/// Unlock/progress status of one tier. Ordered: a status only ever moves up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    Locked,
    Unlockable,
    Unlocked,
    Complete,
}

/// Raw inputs to the status computation for one tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub total: u32,
    pub claimed: u32,
    /// Tier generation ran to completion (a partial tier never completes)
    pub generated: bool,
}

/// Progress of a single tier as exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierProgress {
    pub tier: Tier,
    pub status: TierStatus,
    pub claimed: u32,
    pub total: u32,
    pub complete: bool,
}

/// Progress of all three tiers of a deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckCompletion {
    pub deck_id: String,
    pub core: TierProgress,
    pub deep_dive_1: TierProgress,
    pub deep_dive_2: TierProgress,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Core, Tier::DeepDive1, Tier::DeepDive2];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Core => "core",
            Tier::DeepDive1 => "deep_dive_1",
            Tier::DeepDive2 => "deep_dive_2",
        }
    }

    pub fn next(&self) -> Option<Tier> {
        match self {
            Tier::Core => Some(Tier::DeepDive1),
            Tier::DeepDive1 => Some(Tier::DeepDive2),
            Tier::DeepDive2 => None,
        }
    }

    pub fn previous(&self) -> Option<Tier> {
        match self {
            Tier::Core => None,
            Tier::DeepDive1 => Some(Tier::Core),
            Tier::DeepDive2 => Some(Tier::DeepDive1),
        }
    }

    /// All tiers before this one, outermost first
    pub fn predecessors(&self) -> Vec<Tier> {
        Tier::ALL.iter().copied().filter(|t| t < self).collect()
    }
}

impl TierStatus {
    /// Status before any claim or unlock happened
    pub fn initial(tier: Tier) -> Self {
        match tier {
            Tier::Core => TierStatus::Unlockable,
            Tier::DeepDive1 | Tier::DeepDive2 => TierStatus::Locked,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TierStatus::Locked => "locked",
            TierStatus::Unlockable => "unlockable",
            TierStatus::Unlocked => "unlocked",
            TierStatus::Complete => "complete",
        }
    }

    pub fn is_open(&self) -> bool {
        *self >= TierStatus::Unlocked
    }
}

impl TierCounts {
    pub fn is_complete(&self) -> bool {
        self.generated && self.total > 0 && self.claimed >= self.total
    }
}

impl DeckCompletion {
    pub fn get(&self, tier: Tier) -> &TierProgress {
        match tier {
            Tier::Core => &self.core,
            Tier::DeepDive1 => &self.deep_dive_1,
            Tier::DeepDive2 => &self.deep_dive_2,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for TierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(Tier::Core),
            "deep_dive_1" | "deep-dive-1" | "dd1" => Ok(Tier::DeepDive1),
            "deep_dive_2" | "deep-dive-2" | "dd2" => Ok(Tier::DeepDive2),
            other => Err(format!("Invalid tier: {}", other)),
        }
    }
}

impl std::str::FromStr for TierStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locked" => Ok(TierStatus::Locked),
            "unlockable" => Ok(TierStatus::Unlockable),
            "unlocked" => Ok(TierStatus::Unlocked),
            "complete" => Ok(TierStatus::Complete),
            other => Err(format!("Invalid tier status: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_sequence() {
        assert_eq!(Tier::Core.next(), Some(Tier::DeepDive1));
        assert_eq!(Tier::DeepDive2.next(), None);
        assert_eq!(Tier::DeepDive1.previous(), Some(Tier::Core));
        assert_eq!(Tier::DeepDive2.predecessors(), vec![Tier::Core, Tier::DeepDive1]);
    }

    #[test]
    fn test_status_ordering_follows_progression() {
        assert!(TierStatus::Locked < TierStatus::Unlockable);
        assert!(TierStatus::Unlockable < TierStatus::Unlocked);
        assert!(TierStatus::Unlocked < TierStatus::Complete);
    }

    #[test]
    fn test_tier_serializes_with_wire_names() {
        assert_eq!(serde_json::to_string(&Tier::DeepDive1).unwrap(), "\"deep_dive_1\"");
        assert_eq!("deep_dive_2".parse::<Tier>().unwrap(), Tier::DeepDive2);
        assert!("deep_dive_3".parse::<Tier>().is_err());
    }
}
