//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Each write is one statement against `tenant_subscriptions`, so Postgres
//! row locking serializes concurrent writes for a tenant.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::subscription::{
    AdminOverride, StatusWrite, SubscriptionRecord, SubscriptionStatus, WriteSource,
};
use crate::ports::SubscriptionRepository;

const COLUMNS: &str = "tenant_id, status, external_customer_id, external_subscription_id, \
     trial_started_at, entitled_until, is_special, last_write_source, created_at, updated_at";

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let sql = format!(
            "SELECT {} FROM tenant_subscriptions WHERE {} = $1 LIMIT 1",
            COLUMNS, predicate
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }
}

/// Database row representation of a subscription record.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    tenant_id: String,
    status: String,
    external_customer_id: Option<String>,
    external_subscription_id: Option<String>,
    trial_started_at: Option<DateTime<Utc>>,
    entitled_until: Option<DateTime<Utc>>,
    is_special: bool,
    last_write_source: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status: SubscriptionStatus = row.status.parse().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid status value: {}", e))
        })?;
        let last_write_source = row
            .last_write_source
            .as_deref()
            .map(|s| s.parse::<WriteSource>())
            .transpose()
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid last_write_source value: {}", e),
                )
            })?;

        Ok(SubscriptionRecord {
            tenant_id: TenantId::new(row.tenant_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid tenant_id: {}", e))
            })?,
            status,
            external_customer_id: row.external_customer_id,
            external_subscription_id: row.external_subscription_id,
            trial_started_at: row.trial_started_at.map(Timestamp::from_datetime),
            entitled_until: row.entitled_until.map(Timestamp::from_datetime),
            is_special: row.is_special,
            last_write_source,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err))
}

fn opt_datetime(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        self.fetch_where("tenant_id", tenant_id.as_str()).await
    }

    async fn ensure_exists(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_subscriptions (tenant_id, status, created_at, updated_at)
            VALUES ($1, 'none', $2, $2)
            ON CONFLICT (tenant_id) DO NOTHING
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create subscription record", e))?;

        self.find_by_tenant(tenant_id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Subscription record vanished for tenant {}", tenant_id),
            )
        })
    }

    async fn start_trial(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
        trial_days: i64,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO tenant_subscriptions (
                tenant_id, status, trial_started_at, entitled_until,
                last_write_source, created_at, updated_at
            ) VALUES ($1, 'trial', $2, $3, 'trial_start', $2, $2)
            ON CONFLICT (tenant_id) DO UPDATE SET
                status = 'trial',
                trial_started_at = EXCLUDED.trial_started_at,
                entitled_until = EXCLUDED.entitled_until,
                last_write_source = 'trial_start',
                updated_at = EXCLUDED.updated_at
            WHERE tenant_subscriptions.status = 'none'
              AND tenant_subscriptions.trial_started_at IS NULL
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(now.as_datetime())
        .bind(now.add_days(trial_days).as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to start trial", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn attach_customer(
        &self,
        tenant_id: &TenantId,
        customer_id: &str,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenant_subscriptions (
                tenant_id, status, external_customer_id, created_at, updated_at
            ) VALUES ($1, 'none', $2, $3, $3)
            ON CONFLICT (tenant_id) DO UPDATE SET
                external_customer_id = COALESCE(
                    tenant_subscriptions.external_customer_id,
                    EXCLUDED.external_customer_id
                ),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(customer_id)
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to attach customer", e))?;

        Ok(())
    }

    async fn apply_status(
        &self,
        tenant_id: &TenantId,
        write: &StatusWrite,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO tenant_subscriptions (
                tenant_id, status, entitled_until, external_subscription_id,
                last_write_source, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (tenant_id) DO UPDATE SET
                status = EXCLUDED.status,
                entitled_until = COALESCE(
                    EXCLUDED.entitled_until,
                    tenant_subscriptions.entitled_until
                ),
                external_subscription_id = COALESCE(
                    EXCLUDED.external_subscription_id,
                    tenant_subscriptions.external_subscription_id
                ),
                last_write_source = EXCLUDED.last_write_source,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            COLUMNS
        );

        let row: SubscriptionRow = sqlx::query_as(&sql)
            .bind(tenant_id.as_str())
            .bind(write.status.as_str())
            .bind(opt_datetime(write.entitled_until))
            .bind(&write.external_subscription_id)
            .bind(write.source.as_str())
            .bind(now.as_datetime())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                db_error("Failed to write subscription status", e)
                    .with_detail("tenant_id", tenant_id.as_str())
            })?;

        row.try_into()
    }

    async fn apply_override(
        &self,
        tenant_id: &TenantId,
        change: &AdminOverride,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        let sql = format!(
            r#"
            UPDATE tenant_subscriptions SET
                status = COALESCE($2, status),
                entitled_until = COALESCE($3, entitled_until),
                is_special = COALESCE($4, is_special),
                last_write_source = 'admin_override',
                updated_at = $5
            WHERE tenant_id = $1
            RETURNING {}
            "#,
            COLUMNS
        );

        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(tenant_id.as_str())
            .bind(change.status.map(|s| s.as_str()))
            .bind(opt_datetime(change.entitled_until))
            .bind(change.is_special)
            .bind(now.as_datetime())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to apply override", e))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("No subscription record for tenant {}", tenant_id),
            )),
        }
    }

    async fn find_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        self.fetch_where("external_customer_id", customer_id).await
    }

    async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        self.fetch_where("external_subscription_id", subscription_id)
            .await
    }

    async fn list_with_subscription(&self) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let sql = format!(
            "SELECT {} FROM tenant_subscriptions \
             WHERE external_subscription_id IS NOT NULL ORDER BY tenant_id",
            COLUMNS
        );
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list subscriptions", e))?;

        rows.into_iter().map(SubscriptionRecord::try_from).collect()
    }
}
