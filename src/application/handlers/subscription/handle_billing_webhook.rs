//! HandleBillingWebhookHandler - Verifies and dispatches billing provider webhooks.
//!
//! Events are wake-up calls, not data: every subscription-affecting handler
//! finishes by calling [`ReconciliationService::reconcile`], which re-reads
//! the provider. Once a delivery is verified it is always acknowledged, and
//! handler failures are logged and left for the next event or a sync sweep
//! to repair.

use std::sync::Arc;

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::subscription::{
    map_provider_state, BillingEvent, BillingEventEnvelope, CheckoutCompleted, InvoiceReference,
    ProviderSubscription, StatusWrite, StripeWebhookVerifier, SubscriptionStatus, WebhookError,
    WriteSource,
};
use crate::ports::{BillingGateway, SubscriptionRepository};

use super::reconcile::ReconciliationService;

/// Command to handle a billing webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleBillingWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value.
    pub signature: Option<String>,
}

/// What a dispatched event did. Every variant is acknowledged to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Checkout completed; customer id recorded on the tenant.
    CustomerAttached { tenant_id: TenantId },
    /// Subscription state reconciled from the provider.
    Reconciled { tenant_id: TenantId, synced: bool },
    /// Deleted subscription could not be reconciled; record expired now.
    Expired { tenant_id: TenantId },
    /// Deleted subscription could not be reconciled; record already canceled.
    AlreadyCanceled { tenant_id: TenantId },
    /// No tenant could be attributed to the event.
    Unresolved,
    /// Logged only (payment failures, incomplete payloads).
    Logged,
    /// Event type this crate does not react to.
    Ignored { event_type: String },
    /// A handler step failed; the delivery is acknowledged regardless.
    Failed { reason: String },
}

/// Handler for billing provider webhooks.
pub struct HandleBillingWebhookHandler {
    repository: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn BillingGateway>,
    reconciler: Arc<ReconciliationService>,
    verifier: Arc<StripeWebhookVerifier>,
    session_scan_limit: usize,
}

impl HandleBillingWebhookHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn BillingGateway>,
        reconciler: Arc<ReconciliationService>,
        verifier: Arc<StripeWebhookVerifier>,
        session_scan_limit: usize,
    ) -> Self {
        Self {
            repository,
            gateway,
            reconciler,
            verifier,
            session_scan_limit,
        }
    }

    /// Verifies the delivery, then dispatches it.
    ///
    /// # Errors
    ///
    /// Only verification and parsing failures are returned. Anything after
    /// that is folded into the [`WebhookOutcome`].
    pub async fn handle(
        &self,
        cmd: HandleBillingWebhookCommand,
    ) -> Result<WebhookOutcome, WebhookError> {
        let signature = cmd.signature.ok_or(WebhookError::MissingSignature)?;

        let envelope = self
            .verifier
            .verify_and_parse(&cmd.payload, &signature, Timestamp::now())
            .map_err(|e| {
                tracing::warn!(error = %e, "Rejected webhook delivery");
                e
            })?;

        Ok(self.dispatch(&envelope).await)
    }

    /// Routes a verified event to its handler.
    pub async fn dispatch(&self, envelope: &BillingEventEnvelope) -> WebhookOutcome {
        tracing::info!(
            event_id = %envelope.id,
            event_kind = envelope.event.kind(),
            livemode = envelope.livemode,
            "Dispatching billing event"
        );

        let outcome = match &envelope.event {
            BillingEvent::CheckoutCompleted(checkout) => self.on_checkout_completed(checkout).await,
            BillingEvent::SubscriptionCreated(sub) => {
                self.on_subscription_changed(sub, WriteSource::CheckoutCompletion)
                    .await
            }
            BillingEvent::SubscriptionUpdated(sub) => {
                self.on_subscription_changed(sub, WriteSource::Reconciliation)
                    .await
            }
            BillingEvent::SubscriptionDeleted(sub) => self.on_subscription_deleted(sub).await,
            BillingEvent::InvoicePaid(invoice) => self.on_invoice_paid(invoice).await,
            BillingEvent::InvoicePaymentFailed(invoice) => {
                tracing::info!(
                    invoice_id = %invoice.invoice_id,
                    subscription_id = ?invoice.subscription_id,
                    "Invoice payment failed; provider dunning owns retries"
                );
                WebhookOutcome::Logged
            }
            BillingEvent::Unhandled { event_type } => WebhookOutcome::Ignored {
                event_type: event_type.clone(),
            },
        };

        if let WebhookOutcome::Failed { reason } = &outcome {
            tracing::error!(
                event_id = %envelope.id,
                event_kind = envelope.event.kind(),
                reason = %reason,
                "Billing event handler failed; acknowledging anyway"
            );
        }

        outcome
    }

    async fn on_checkout_completed(&self, checkout: &CheckoutCompleted) -> WebhookOutcome {
        let Some(customer_id) = checkout.customer_id.as_deref() else {
            tracing::info!(session_id = %checkout.session_id, "Checkout completed without customer");
            return WebhookOutcome::Logged;
        };

        let tenant_id = match &checkout.tenant_id {
            Some(tenant_id) => Some(tenant_id.clone()),
            None => match self.repository.find_by_customer_id(customer_id).await {
                Ok(record) => record.map(|r| r.tenant_id),
                Err(e) => {
                    return WebhookOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            },
        };

        let Some(tenant_id) = tenant_id else {
            tracing::warn!(
                session_id = %checkout.session_id,
                customer_id = %customer_id,
                "Checkout completed for unknown tenant"
            );
            return WebhookOutcome::Unresolved;
        };

        if let Err(e) = self
            .repository
            .attach_customer(&tenant_id, customer_id, Timestamp::now())
            .await
        {
            return WebhookOutcome::Failed {
                reason: e.to_string(),
            };
        }

        if let Err(e) = self.gateway.tag_customer(customer_id, &tenant_id).await {
            tracing::warn!(
                tenant_id = %tenant_id,
                customer_id = %customer_id,
                error = %e,
                "Failed to tag provider customer; later events fall back to session scan"
            );
        }

        WebhookOutcome::CustomerAttached { tenant_id }
    }

    async fn on_subscription_changed(
        &self,
        sub: &ProviderSubscription,
        source: WriteSource,
    ) -> WebhookOutcome {
        let Some(tenant_id) = self.resolve_tenant(&sub.customer_id, Some(&sub.id)).await else {
            tracing::warn!(
                subscription_id = %sub.id,
                customer_id = %sub.customer_id,
                "Subscription event for unknown tenant"
            );
            return WebhookOutcome::Unresolved;
        };

        let now = Timestamp::now();
        if let Err(e) = self
            .repository
            .attach_customer(&tenant_id, &sub.customer_id, now)
            .await
        {
            tracing::warn!(tenant_id = %tenant_id, error = %e, "Failed to attach customer");
        }

        // First-pass write from the payload; reconcile below corrects it.
        if let Some(mapped) = map_provider_state(sub) {
            let write = StatusWrite::status_only(mapped.status, source)
                .with_entitled_until(mapped.entitled_until)
                .with_subscription_id(sub.id.as_str());
            if let Err(e) = self.repository.apply_status(&tenant_id, &write, now).await {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    subscription_id = %sub.id,
                    error = %e,
                    "Direct subscription write failed"
                );
            }
        }

        let synced = self.reconciler.reconcile(&tenant_id, &sub.id).await;
        WebhookOutcome::Reconciled { tenant_id, synced }
    }

    async fn on_subscription_deleted(&self, sub: &ProviderSubscription) -> WebhookOutcome {
        let Some(tenant_id) = self.resolve_tenant(&sub.customer_id, Some(&sub.id)).await else {
            tracing::warn!(subscription_id = %sub.id, "Deleted subscription for unknown tenant");
            return WebhookOutcome::Unresolved;
        };

        if self.reconciler.reconcile(&tenant_id, &sub.id).await {
            return WebhookOutcome::Reconciled {
                tenant_id,
                synced: true,
            };
        }

        let record = match self.repository.find_by_tenant(&tenant_id).await {
            Ok(record) => record,
            Err(e) => {
                return WebhookOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        if record.map(|r| r.status) == Some(SubscriptionStatus::Canceled) {
            tracing::info!(
                tenant_id = %tenant_id,
                subscription_id = %sub.id,
                "Deleted subscription already canceled locally"
            );
            return WebhookOutcome::AlreadyCanceled { tenant_id };
        }

        let now = Timestamp::now();
        let write = StatusWrite::status_only(SubscriptionStatus::Expired, WriteSource::Reconciliation)
            .with_entitled_until(Some(now))
            .with_subscription_id(sub.id.as_str());

        match self.repository.apply_status(&tenant_id, &write, now).await {
            Ok(_) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    subscription_id = %sub.id,
                    "Subscription deleted and not reconcilable; expired locally"
                );
                WebhookOutcome::Expired { tenant_id }
            }
            Err(e) => WebhookOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    async fn on_invoice_paid(&self, invoice: &InvoiceReference) -> WebhookOutcome {
        let Some(subscription_id) = invoice.subscription_id.as_deref() else {
            tracing::info!(invoice_id = %invoice.invoice_id, "Paid invoice has no subscription");
            return WebhookOutcome::Logged;
        };

        let tenant_id = match self.repository.find_by_subscription_id(subscription_id).await {
            Ok(Some(record)) => Some(record.tenant_id),
            Ok(None) => match invoice.customer_id.as_deref() {
                Some(customer_id) => self.resolve_tenant(customer_id, Some(subscription_id)).await,
                None => None,
            },
            Err(e) => {
                return WebhookOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let Some(tenant_id) = tenant_id else {
            tracing::warn!(
                invoice_id = %invoice.invoice_id,
                subscription_id = %subscription_id,
                "Paid invoice for unknown tenant"
            );
            return WebhookOutcome::Unresolved;
        };

        let synced = self.reconciler.reconcile(&tenant_id, subscription_id).await;
        WebhookOutcome::Reconciled { tenant_id, synced }
    }

    /// Attributes a provider customer to a tenant.
    ///
    /// Tries, in order: the customer's tenant tag, the tenant tag on recent
    /// checkout sessions, then local records by customer id and by
    /// subscription id. Provider failures fall through to the next step.
    async fn resolve_tenant(
        &self,
        customer_id: &str,
        subscription_id: Option<&str>,
    ) -> Option<TenantId> {
        match self.gateway.fetch_customer(customer_id).await {
            Ok(customer) => {
                if let Some(tenant_id) = customer.tenant_id {
                    return Some(tenant_id);
                }
            }
            Err(e) => {
                tracing::warn!(customer_id = %customer_id, error = %e, "Customer lookup failed");
            }
        }

        match self
            .gateway
            .list_recent_checkout_sessions(customer_id, self.session_scan_limit)
            .await
        {
            Ok(sessions) => {
                let matching = sessions
                    .iter()
                    .find(|s| s.tenant_id.is_some() && s.subscription_id.as_deref() == subscription_id)
                    .or_else(|| sessions.iter().find(|s| s.tenant_id.is_some()));

                if let Some(tenant_id) = matching.and_then(|s| s.tenant_id.clone()) {
                    if let Err(e) = self.gateway.tag_customer(customer_id, &tenant_id).await {
                        tracing::debug!(customer_id = %customer_id, error = %e, "Customer tag backfill failed");
                    }
                    return Some(tenant_id);
                }
            }
            Err(e) => {
                tracing::warn!(customer_id = %customer_id, error = %e, "Checkout session scan failed");
            }
        }

        match self.repository.find_by_customer_id(customer_id).await {
            Ok(Some(record)) => return Some(record.tenant_id),
            Ok(None) => {}
            Err(e) => tracing::warn!(customer_id = %customer_id, error = %e, "Local customer lookup failed"),
        }

        let subscription_id = subscription_id?;
        match self.repository.find_by_subscription_id(subscription_id).await {
            Ok(record) => record.map(|r| r.tenant_id),
            Err(e) => {
                tracing::warn!(subscription_id = %subscription_id, error = %e, "Local subscription lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySubscriptionRepository;
    use crate::adapters::stripe::MockBillingGateway;
    use crate::domain::subscription::{
        sign_payload, ProviderCheckoutSession, ProviderCustomer, ProviderStatus, SubscriptionRecord,
    };
    use crate::ports::GatewayError;

    const SECRET: &str = "whsec_test";

    fn tenant() -> TenantId {
        TenantId::new("tenant-1").unwrap()
    }

    fn sub(status: &str, period_end: i64) -> ProviderSubscription {
        ProviderSubscription {
            id: "sub_1".to_string(),
            customer_id: "cus_1".to_string(),
            status: ProviderStatus::from_provider(status),
            current_period_end: Some(period_end),
            ended_at: None,
            canceled_at: None,
            cancel_at_period_end: false,
            schedule_id: None,
        }
    }

    fn envelope(event: BillingEvent) -> BillingEventEnvelope {
        BillingEventEnvelope {
            id: "evt_1".to_string(),
            created: 0,
            livemode: false,
            event,
        }
    }

    struct Fixture {
        repo: Arc<InMemorySubscriptionRepository>,
        gateway: MockBillingGateway,
        handler: HandleBillingWebhookHandler,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let gateway = MockBillingGateway::new();
        let reconciler = Arc::new(ReconciliationService::new(
            repo.clone(),
            Arc::new(gateway.clone()),
        ));
        let handler = HandleBillingWebhookHandler::new(
            repo.clone(),
            Arc::new(gateway.clone()),
            reconciler,
            Arc::new(StripeWebhookVerifier::new(SECRET)),
            10,
        );
        Fixture {
            repo,
            gateway,
            handler,
        }
    }

    fn tagged_customer() -> ProviderCustomer {
        ProviderCustomer {
            id: "cus_1".to_string(),
            tenant_id: Some(tenant()),
        }
    }

    async fn record(f: &Fixture) -> SubscriptionRecord {
        f.repo.find_by_tenant(&tenant()).await.unwrap().unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Verification
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let f = fixture();
        let result = f
            .handler
            .handle(HandleBillingWebhookCommand {
                payload: b"{}".to_vec(),
                signature: None,
            })
            .await;
        assert_eq!(result, Err(WebhookError::MissingSignature));
    }

    #[tokio::test]
    async fn bad_signature_is_rejected_without_processing() {
        let f = fixture();
        let payload = br#"{"id":"evt_1","type":"customer.subscription.created","created":0,"data":{"object":{"id":"sub_1","customer":"cus_1","status":"active"}}}"#;
        let header = sign_payload("whsec_other", Timestamp::now().as_unix_secs(), payload).unwrap();

        let result = f
            .handler
            .handle(HandleBillingWebhookCommand {
                payload: payload.to_vec(),
                signature: Some(header),
            })
            .await;

        assert_eq!(result, Err(WebhookError::InvalidSignature));
        assert!(f.gateway.calls().is_empty());
        assert!(f.repo.is_empty().await);
    }

    #[tokio::test]
    async fn signed_unknown_event_is_ignored() {
        let f = fixture();
        let payload = br#"{"id":"evt_1","type":"customer.created","created":0,"data":{"object":{"id":"cus_1"}}}"#;
        let header = sign_payload(SECRET, Timestamp::now().as_unix_secs(), payload).unwrap();

        let outcome = f
            .handler
            .handle(HandleBillingWebhookCommand {
                payload: payload.to_vec(),
                signature: Some(header),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                event_type: "customer.created".to_string()
            }
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Checkout
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn checkout_attaches_and_tags_customer_without_status_change() {
        let f = fixture();
        f.repo.start_trial(&tenant(), Timestamp::now(), 10).await.unwrap();
        f.gateway.add_customer(ProviderCustomer {
            id: "cus_1".to_string(),
            tenant_id: None,
        });

        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::CheckoutCompleted(CheckoutCompleted {
                session_id: "cs_1".to_string(),
                customer_id: Some("cus_1".to_string()),
                subscription_id: Some("sub_1".to_string()),
                tenant_id: Some(tenant()),
            })))
            .await;

        assert_eq!(outcome, WebhookOutcome::CustomerAttached { tenant_id: tenant() });
        let r = record(&f).await;
        assert_eq!(r.external_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(r.status, SubscriptionStatus::Trial);
        assert_eq!(f.gateway.customer("cus_1").unwrap().tenant_id, Some(tenant()));
    }

    #[tokio::test]
    async fn checkout_tag_failure_is_tolerated() {
        let f = fixture();
        f.gateway
            .fail_method("tag_customer", GatewayError::provider("503", true));

        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::CheckoutCompleted(CheckoutCompleted {
                session_id: "cs_1".to_string(),
                customer_id: Some("cus_1".to_string()),
                subscription_id: None,
                tenant_id: Some(tenant()),
            })))
            .await;

        assert_eq!(outcome, WebhookOutcome::CustomerAttached { tenant_id: tenant() });
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription created / updated
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn subscription_created_activates_through_period_end() {
        let f = fixture();
        let period_end = Timestamp::now().add_days(30).as_unix_secs();
        f.gateway.add_customer(tagged_customer());
        f.gateway.add_subscription(sub("active", period_end));

        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::SubscriptionCreated(sub("active", period_end))))
            .await;

        assert_eq!(
            outcome,
            WebhookOutcome::Reconciled {
                tenant_id: tenant(),
                synced: true
            }
        );
        let r = record(&f).await;
        assert_eq!(r.status, SubscriptionStatus::Active);
        assert_eq!(r.entitled_until, Timestamp::from_unix_secs(period_end));
        assert_eq!(r.external_customer_id.as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn stale_payload_is_corrected_by_reconcile() {
        let f = fixture();
        f.gateway.add_customer(tagged_customer());
        let mut current = sub("canceled", 2_000_000_000);
        current.ended_at = Some(1_950_000_000);
        f.gateway.add_subscription(current);

        f.handler
            .dispatch(&envelope(BillingEvent::SubscriptionUpdated(sub("active", 2_000_000_000))))
            .await;

        let r = record(&f).await;
        assert_eq!(r.status, SubscriptionStatus::Canceled);
        assert_eq!(r.entitled_until, Timestamp::from_unix_secs(1_950_000_000));
        assert_eq!(r.last_write_source, Some(WriteSource::Reconciliation));
    }

    #[tokio::test]
    async fn tenant_resolved_from_checkout_sessions_when_metadata_missing() {
        let f = fixture();
        f.gateway.add_customer(ProviderCustomer {
            id: "cus_1".to_string(),
            tenant_id: None,
        });
        f.gateway.add_checkout_session(ProviderCheckoutSession {
            id: "cs_1".to_string(),
            customer_id: Some("cus_1".to_string()),
            subscription_id: Some("sub_1".to_string()),
            tenant_id: Some(tenant()),
            created: 0,
        });
        f.gateway.add_subscription(sub("active", 2_000_000_000));

        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::SubscriptionCreated(sub("active", 2_000_000_000))))
            .await;

        assert!(matches!(outcome, WebhookOutcome::Reconciled { ref tenant_id, .. } if *tenant_id == tenant()));
        assert_eq!(f.gateway.customer("cus_1").unwrap().tenant_id, Some(tenant()));
    }

    #[tokio::test]
    async fn tenant_resolved_from_local_customer_when_provider_down() {
        let f = fixture();
        f.repo.attach_customer(&tenant(), "cus_1", Timestamp::now()).await.unwrap();
        f.gateway.fail_method("fetch_customer", GatewayError::Timeout);
        f.gateway
            .fail_method("list_recent_checkout_sessions", GatewayError::Timeout);
        f.gateway.fail_method("fetch_subscription", GatewayError::Timeout);

        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::SubscriptionUpdated(sub("past_due", 2_000_000_000))))
            .await;

        assert_eq!(
            outcome,
            WebhookOutcome::Reconciled {
                tenant_id: tenant(),
                synced: false
            }
        );
        // Direct write still applied from the payload.
        assert_eq!(record(&f).await.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn unattributable_subscription_is_unresolved() {
        let f = fixture();
        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::SubscriptionCreated(sub("active", 2_000_000_000))))
            .await;
        assert_eq!(outcome, WebhookOutcome::Unresolved);
        assert!(f.repo.is_empty().await);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Subscription deleted
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn deleted_with_unreachable_provider_expires_record() {
        let f = fixture();
        f.gateway.add_customer(tagged_customer());
        f.repo
            .apply_status(
                &tenant(),
                &StatusWrite::status_only(SubscriptionStatus::Active, WriteSource::Reconciliation)
                    .with_subscription_id("sub_1")
                    .with_entitled_until(Some(Timestamp::now().add_days(20))),
                Timestamp::now(),
            )
            .await
            .unwrap();

        let before = Timestamp::now();
        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::SubscriptionDeleted(sub("canceled", 0))))
            .await;

        assert_eq!(outcome, WebhookOutcome::Expired { tenant_id: tenant() });
        let r = record(&f).await;
        assert_eq!(r.status, SubscriptionStatus::Expired);
        assert!(!r.entitled_until.unwrap().is_before(&before));
    }

    #[tokio::test]
    async fn deleted_for_already_canceled_record_is_noop() {
        let f = fixture();
        f.gateway.add_customer(tagged_customer());
        let until = Timestamp::now().add_days(5);
        f.repo
            .apply_status(
                &tenant(),
                &StatusWrite::status_only(SubscriptionStatus::Canceled, WriteSource::Cancellation)
                    .with_subscription_id("sub_1")
                    .with_entitled_until(Some(until)),
                Timestamp::now(),
            )
            .await
            .unwrap();

        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::SubscriptionDeleted(sub("canceled", 0))))
            .await;

        assert_eq!(outcome, WebhookOutcome::AlreadyCanceled { tenant_id: tenant() });
        let r = record(&f).await;
        assert_eq!(r.status, SubscriptionStatus::Canceled);
        assert_eq!(r.entitled_until, Some(until));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Invoices
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn invoice_paid_advances_entitlement() {
        let f = fixture();
        f.repo
            .apply_status(
                &tenant(),
                &StatusWrite::status_only(SubscriptionStatus::Active, WriteSource::Reconciliation)
                    .with_subscription_id("sub_1")
                    .with_entitled_until(Timestamp::from_unix_secs(1_900_000_000)),
                Timestamp::now(),
            )
            .await
            .unwrap();
        f.gateway.add_subscription(sub("active", 1_902_600_000));

        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::InvoicePaid(InvoiceReference {
                invoice_id: "in_1".to_string(),
                customer_id: Some("cus_1".to_string()),
                subscription_id: Some("sub_1".to_string()),
            })))
            .await;

        assert_eq!(
            outcome,
            WebhookOutcome::Reconciled {
                tenant_id: tenant(),
                synced: true
            }
        );
        assert_eq!(
            record(&f).await.entitled_until,
            Timestamp::from_unix_secs(1_902_600_000)
        );
    }

    #[tokio::test]
    async fn invoice_payment_failed_only_logs() {
        let f = fixture();
        let outcome = f
            .handler
            .dispatch(&envelope(BillingEvent::InvoicePaymentFailed(InvoiceReference {
                invoice_id: "in_1".to_string(),
                customer_id: Some("cus_1".to_string()),
                subscription_id: Some("sub_1".to_string()),
            })))
            .await;

        assert_eq!(outcome, WebhookOutcome::Logged);
        assert!(f.gateway.calls().is_empty());
        assert!(f.repo.is_empty().await);
    }
}
