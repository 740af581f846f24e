use super::entity::{Tier, TierCounts, TierStatus};
use crate::domain::{DomainError, DomainResult};

/// Compute the effective status of a tier.
///
/// `persisted` is the last status written for this tier, `previous` the effective
/// status of the tier before it (None for Core). The result is never lower than
/// `persisted`.
pub fn derive_status(
    tier: Tier,
    persisted: Option<TierStatus>,
    previous: Option<TierStatus>,
    counts: &TierCounts,
) -> TierStatus {
    let mut status = TierStatus::initial(tier).max(persisted.unwrap_or(TierStatus::Locked));

    if previous == Some(TierStatus::Complete) {
        status = status.max(TierStatus::Unlockable);
    }

    // Core has no previous tier to wait on
    if tier.previous().is_none() && status == TierStatus::Unlockable && counts.total > 0 {
        status = TierStatus::Unlocked;
    }

    if status.is_open() && counts.is_complete() {
        status = TierStatus::Complete;
    }

    status
}

/// Decide whether an explicit unlock request is valid.
/// Returns Ok(true) when the unlock changes state, Ok(false) when already open.
pub fn check_unlock(tier: Tier, current: TierStatus) -> DomainResult<bool> {
    match current {
        TierStatus::Locked => Err(DomainError::InvalidStateTransition(format!(
            "Tier {} is locked until the previous tier is complete",
            tier
        ))),
        TierStatus::Unlockable => Ok(true),
        TierStatus::Unlocked | TierStatus::Complete => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(total: u32, claimed: u32) -> TierCounts {
        TierCounts {
            total,
            claimed,
            generated: true,
        }
    }

    #[test]
    fn test_initial_statuses() {
        let empty = TierCounts::default();
        assert_eq!(derive_status(Tier::Core, None, None, &empty), TierStatus::Unlockable);
        assert_eq!(
            derive_status(Tier::DeepDive1, None, Some(TierStatus::Unlockable), &empty),
            TierStatus::Locked
        );
    }

    #[test]
    fn test_core_unlocks_itself_once_it_has_cards() {
        assert_eq!(derive_status(Tier::Core, None, None, &counts(5, 0)), TierStatus::Unlocked);
    }

    #[test]
    fn test_deep_dive_waits_for_explicit_unlock() {
        // Pre-generated content does not open the gate
        let status = derive_status(
            Tier::DeepDive1,
            None,
            Some(TierStatus::Complete),
            &counts(4, 0),
        );
        assert_eq!(status, TierStatus::Unlockable);
    }

    #[test]
    fn test_completion_requires_all_claims() {
        assert_eq!(derive_status(Tier::Core, None, None, &counts(5, 4)), TierStatus::Unlocked);
        assert_eq!(derive_status(Tier::Core, None, None, &counts(5, 5)), TierStatus::Complete);
    }

    #[test]
    fn test_partial_tier_never_completes() {
        let partial = TierCounts {
            total: 2,
            claimed: 2,
            generated: false,
        };
        assert_eq!(derive_status(Tier::Core, None, None, &partial), TierStatus::Unlocked);
    }

    #[test]
    fn test_locked_tier_cannot_complete_even_if_claimed() {
        let status = derive_status(Tier::DeepDive2, None, Some(TierStatus::Unlocked), &counts(3, 3));
        assert_eq!(status, TierStatus::Locked);
    }

    #[test]
    fn test_status_never_regresses() {
        // Persisted complete stays complete even if the inputs look empty
        let status = derive_status(Tier::DeepDive1, Some(TierStatus::Complete), None, &TierCounts::default());
        assert_eq!(status, TierStatus::Complete);
    }

    #[test]
    fn test_unlock_rules() {
        assert!(check_unlock(Tier::DeepDive1, TierStatus::Locked).is_err());
        assert!(check_unlock(Tier::DeepDive1, TierStatus::Unlockable).unwrap());
        assert!(!check_unlock(Tier::DeepDive1, TierStatus::Complete).unwrap());
    }
}
