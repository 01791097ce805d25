//! Provider status to local status mapping.
//!
//! The mapping reads provider state only, never local state, so applying it
//! any number of times with the same provider snapshot converges on the same
//! record. That is what makes reconciling after every webhook safe.
//!
//! | Provider status | Local status | `entitled_until` |
//! |---|---|---|
//! | `active` | `active` | `current_period_end` |
//! | `past_due` | `active` | `current_period_end` |
//! | `incomplete` | `active` | `current_period_end`, else unchanged |
//! | `canceled` | `canceled` | `ended_at`, else `current_period_end`, else unchanged |
//! | anything else | no change | no change |
//!
//! An `active`/`past_due` subscription whose renewal has been revoked
//! (`cancel_at_period_end`) maps to `canceled` with `entitled_until =
//! current_period_end`, matching what the cancellation workflow writes.

use crate::domain::foundation::Timestamp;

use super::{ProviderStatus, ProviderSubscription, SubscriptionStatus};

/// Local state derived from a provider subscription.
///
/// `entitled_until: None` means the stored value is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedState {
    pub status: SubscriptionStatus,
    pub entitled_until: Option<Timestamp>,
}

/// Maps a provider subscription onto local state.
///
/// Returns `None` for provider statuses that are not applied locally.
pub fn map_provider_state(subscription: &ProviderSubscription) -> Option<MappedState> {
    let period_end = subscription
        .current_period_end
        .and_then(Timestamp::from_unix_secs);

    match &subscription.status {
        ProviderStatus::Active | ProviderStatus::PastDue if subscription.cancel_at_period_end => {
            Some(MappedState {
                status: SubscriptionStatus::Canceled,
                entitled_until: period_end,
            })
        }
        ProviderStatus::Active | ProviderStatus::PastDue | ProviderStatus::Incomplete => {
            Some(MappedState {
                status: SubscriptionStatus::Active,
                entitled_until: period_end,
            })
        }
        ProviderStatus::Canceled => {
            let ended_at = subscription.ended_at.and_then(Timestamp::from_unix_secs);
            Some(MappedState {
                status: SubscriptionStatus::Canceled,
                entitled_until: ended_at.or(period_end),
            })
        }
        ProviderStatus::Other(_) => None,
    }
}
