//! Mock billing gateway for testing.
//!
//! Provides a configurable in-process implementation of [`BillingGateway`]:
//! - Pre-configured subscriptions, customers and checkout sessions
//! - Error injection (one-shot or per method)
//! - Call tracking
//!
//! `cancel_subscription` behaves like Stripe's non-renewing cancel: the
//! subscription keeps its status and period, and `cancel_at_period_end` flips.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::foundation::TenantId;
use crate::domain::subscription::{ProviderCheckoutSession, ProviderCustomer, ProviderSubscription};
use crate::ports::{BillingGateway, GatewayError};

/// Mock billing gateway for testing.
///
/// # Example
///
/// ```ignore
/// let gateway = MockBillingGateway::new();
/// gateway.add_subscription(active_subscription("sub_1", "cus_1"));
/// gateway.fail_method("fetch_subscription", GatewayError::Timeout);
/// ```
#[derive(Clone, Default)]
pub struct MockBillingGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    subscriptions: HashMap<String, ProviderSubscription>,
    customers: HashMap<String, ProviderCustomer>,
    /// Checkout sessions by customer id, newest first.
    sessions: HashMap<String, Vec<ProviderCheckoutSession>>,
    /// Error returned by the next call of any method.
    next_error: Option<GatewayError>,
    /// Errors returned by every call of a method until cleared.
    method_errors: HashMap<String, GatewayError>,
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockBillingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    /// Adds or replaces a subscription.
    pub fn add_subscription(&self, subscription: ProviderSubscription) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Removes a subscription so later fetches return `NotFound`.
    pub fn remove_subscription(&self, subscription_id: &str) {
        self.state().subscriptions.remove(subscription_id);
    }

    /// Adds or replaces a customer.
    pub fn add_customer(&self, customer: ProviderCustomer) {
        self.state().customers.insert(customer.id.clone(), customer);
    }

    /// Adds a checkout session. The most recently added is listed first.
    pub fn add_checkout_session(&self, session: ProviderCheckoutSession) {
        if let Some(customer_id) = session.customer_id.clone() {
            self.state()
                .sessions
                .entry(customer_id)
                .or_default()
                .insert(0, session);
        }
    }

    /// Fails the next call, whatever it is.
    pub fn fail_next(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    /// Fails every call to `method` until [`clear_failures`](Self::clear_failures).
    pub fn fail_method(&self, method: &str, error: GatewayError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    pub fn subscription(&self, subscription_id: &str) -> Option<ProviderSubscription> {
        self.state().subscriptions.get(subscription_id).cloned()
    }

    pub fn customer(&self, customer_id: &str) -> Option<ProviderCustomer> {
        self.state().customers.get(customer_id).cloned()
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Number of calls made to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Records the call and returns any injected error.
    fn enter(&self, method: &str, args: &[&str]) -> Result<MutexGuard<'_, MockState>, GatewayError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });

        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        if let Some(err) = state.method_errors.get(method) {
            return Err(err.clone());
        }
        Ok(state)
    }
}

#[async_trait]
impl BillingGateway for MockBillingGateway {
    async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, GatewayError> {
        let state = self.enter("fetch_subscription", &[subscription_id])?;
        state
            .subscriptions
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("subscription {}", subscription_id)))
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, GatewayError> {
        let mut state = self.enter("cancel_subscription", &[subscription_id])?;
        let sub = state
            .subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| GatewayError::not_found(format!("subscription {}", subscription_id)))?;

        if !sub.cancel_at_period_end {
            sub.cancel_at_period_end = true;
            sub.canceled_at = Some(chrono::Utc::now().timestamp());
        }
        Ok(sub.clone())
    }

    async fn fetch_customer(&self, customer_id: &str) -> Result<ProviderCustomer, GatewayError> {
        let state = self.enter("fetch_customer", &[customer_id])?;
        state
            .customers
            .get(customer_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("customer {}", customer_id)))
    }

    async fn list_recent_checkout_sessions(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<ProviderCheckoutSession>, GatewayError> {
        let limit_arg = limit.to_string();
        let state = self.enter("list_recent_checkout_sessions", &[customer_id, &limit_arg])?;
        Ok(state
            .sessions
            .get(customer_id)
            .map(|sessions| sessions.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn tag_customer(
        &self,
        customer_id: &str,
        tenant_id: &TenantId,
    ) -> Result<(), GatewayError> {
        let mut state = self.enter("tag_customer", &[customer_id, tenant_id.as_str()])?;
        let customer = state
            .customers
            .get_mut(customer_id)
            .ok_or_else(|| GatewayError::not_found(format!("customer {}", customer_id)))?;
        customer.tenant_id = Some(tenant_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::subscription::ProviderStatus;

    fn subscription(id: &str) -> ProviderSubscription {
        ProviderSubscription {
            id: id.to_string(),
            customer_id: "cus_1".to_string(),
            status: ProviderStatus::Active,
            current_period_end: Some(1_800_000_000),
            ended_at: None,
            canceled_at: None,
            cancel_at_period_end: false,
            schedule_id: None,
        }
    }

    #[tokio::test]
    async fn cancel_is_non_renewing() {
        let gateway = MockBillingGateway::new();
        gateway.add_subscription(subscription("sub_1"));

        let canceled = gateway.cancel_subscription("sub_1").await.unwrap();

        assert_eq!(canceled.status, ProviderStatus::Active);
        assert!(canceled.cancel_at_period_end);
        assert_eq!(canceled.current_period_end, Some(1_800_000_000));
    }

    #[tokio::test]
    async fn missing_subscription_is_not_found() {
        let gateway = MockBillingGateway::new();
        let err = gateway.fetch_subscription("sub_x").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn fail_next_applies_once() {
        let gateway = MockBillingGateway::new();
        gateway.add_subscription(subscription("sub_1"));
        gateway.fail_next(GatewayError::Timeout);

        assert_eq!(
            gateway.fetch_subscription("sub_1").await,
            Err(GatewayError::Timeout)
        );
        assert!(gateway.fetch_subscription("sub_1").await.is_ok());
        assert_eq!(gateway.call_count("fetch_subscription"), 2);
    }

    #[tokio::test]
    async fn method_failure_persists_until_cleared() {
        let gateway = MockBillingGateway::new();
        gateway.add_subscription(subscription("sub_1"));
        gateway.fail_method("fetch_subscription", GatewayError::provider("503", true));

        assert!(gateway.fetch_subscription("sub_1").await.is_err());
        assert!(gateway.fetch_subscription("sub_1").await.is_err());

        gateway.clear_failures();
        assert!(gateway.fetch_subscription("sub_1").await.is_ok());
    }

    #[tokio::test]
    async fn sessions_listed_newest_first_and_limited() {
        let gateway = MockBillingGateway::new();
        for (i, id) in ["cs_old", "cs_mid", "cs_new"].iter().enumerate() {
            gateway.add_checkout_session(ProviderCheckoutSession {
                id: id.to_string(),
                customer_id: Some("cus_1".to_string()),
                subscription_id: None,
                tenant_id: None,
                created: i as i64,
            });
        }

        let sessions = gateway.list_recent_checkout_sessions("cus_1", 2).await.unwrap();
        let ids: Vec<_> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["cs_new", "cs_mid"]);
    }

    #[tokio::test]
    async fn tag_customer_sets_tenant() {
        let gateway = MockBillingGateway::new();
        gateway.add_customer(ProviderCustomer {
            id: "cus_1".to_string(),
            tenant_id: None,
        });
        let tenant = TenantId::new("tenant-1").unwrap();

        gateway.tag_customer("cus_1", &tenant).await.unwrap();

        assert_eq!(gateway.customer("cus_1").unwrap().tenant_id, Some(tenant));
    }
}
