//! Access decision: may this tenant's pages be served right now?

use crate::domain::foundation::Timestamp;

use super::{SubscriptionRecord, SubscriptionStatus};

/// Returns true if the tenant described by `record` is entitled at `now`.
///
/// Pure: reads only the record and the supplied clock.
///
/// - special (administratively exempt) tenants are always entitled
/// - `active` is entitled; payment retries are the provider's concern
/// - `trial` and `canceled` are entitled strictly before `entitled_until`
/// - `none` and `expired` are never entitled
pub fn is_entitled(record: &SubscriptionRecord, now: Timestamp) -> bool {
    if record.is_special {
        return true;
    }

    match record.status {
        SubscriptionStatus::Active => true,
        SubscriptionStatus::Trial | SubscriptionStatus::Canceled => record
            .entitled_until
            .map(|until| now.is_before(&until))
            .unwrap_or(false),
        SubscriptionStatus::Unsubscribed | SubscriptionStatus::Expired => false,
    }
}
