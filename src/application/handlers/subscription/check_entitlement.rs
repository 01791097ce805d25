//! CheckEntitlementHandler - Read-side access decision for the page-serving path.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::subscription::{is_entitled, SubscriptionError, SubscriptionStatus};
use crate::ports::SubscriptionRepository;

/// Query for a tenant's entitlement.
#[derive(Debug, Clone)]
pub struct CheckEntitlementQuery {
    pub tenant_id: TenantId,
}

/// Entitlement decision plus the state it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckEntitlementResult {
    pub entitled: bool,
    pub status: SubscriptionStatus,
    pub entitled_until: Option<Timestamp>,
    pub is_special: bool,
}

pub struct CheckEntitlementHandler {
    repository: Arc<dyn SubscriptionRepository>,
}

impl CheckEntitlementHandler {
    pub fn new(repository: Arc<dyn SubscriptionRepository>) -> Self {
        Self { repository }
    }

    /// A tenant without a record is reported as `none` and not entitled.
    pub async fn handle(
        &self,
        query: CheckEntitlementQuery,
    ) -> Result<CheckEntitlementResult, SubscriptionError> {
        let record = self.repository.find_by_tenant(&query.tenant_id).await?;

        Ok(match record {
            Some(record) => CheckEntitlementResult {
                entitled: is_entitled(&record, Timestamp::now()),
                status: record.status,
                entitled_until: record.entitled_until,
                is_special: record.is_special,
            },
            None => CheckEntitlementResult {
                entitled: false,
                status: SubscriptionStatus::Unsubscribed,
                entitled_until: None,
                is_special: false,
            },
        })
    }
}
