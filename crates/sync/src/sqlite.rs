use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rental_agreements_types::{
    AgreementRecord, AgreementStatus, AgreementTransition, BlockOverride, LineItem, Order,
    ReminderTier,
};
use rust_decimal::Decimal;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use crate::store::{OrderStore, StoreError};

// ═══════════════════════════════════════════════════════════════════════════
// SQLITE STORE IMPLEMENTATION
// ═══════════════════════════════════════════════════════════════════════════

pub struct SqliteOrderStore {
    pool: SqlitePool,
}

impl SqliteOrderStore {
    /// Open (or create) the database at the given path.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// In-memory database for testing. Pinned to one connection so every
    /// query sees the same database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(include_str!("../migrations/001_create_orders.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(include_str!("../migrations/002_create_agreement_transitions.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order, StoreError> {
        let status_str: String = row.get("agreement_status");
        let status = AgreementStatus::parse(&status_str)
            .ok_or_else(|| StoreError::Serialization(format!("bad agreement status: {status_str}")))?;

        let tier_str: String = row.get("last_reminder_tier");
        let tier = ReminderTier::parse(&tier_str)
            .ok_or_else(|| StoreError::Serialization(format!("bad reminder tier: {tier_str}")))?;

        let total_amount = Decimal::from_str(row.get::<String, _>("total_amount").as_str())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let line_items: Vec<LineItem> =
            serde_json::from_str(row.get::<String, _>("line_items").as_str())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let block_override = match (
            row.get::<Option<String>, _>("override_reason"),
            row.get::<Option<String>, _>("override_by"),
            row.get::<Option<i64>, _>("override_at"),
        ) {
            (Some(reason), Some(by), Some(at)) => Some(BlockOverride {
                reason,
                by,
                at: from_unix(at)?,
            }),
            _ => None,
        };

        let agreement = AgreementRecord {
            status,
            submission_id: row.get("submission_id"),
            signed_at: opt_from_unix(row.get("signed_at"))?,
            viewed_at: opt_from_unix(row.get("viewed_at"))?,
            delivery_blocked: row.get::<i64, _>("delivery_blocked") != 0,
            block_override,
            last_reminder_tier: tier,
            last_reminder_sent_at: opt_from_unix(row.get("last_reminder_sent_at"))?,
            needs_new_submission: row.get::<i64, _>("needs_new_submission") != 0,
        };

        Ok(Order {
            id: row.get("id"),
            customer_email: row.get("customer_email"),
            customer_name: row.get("customer_name"),
            delivery_at: opt_from_unix(row.get("delivery_at"))?,
            delivery_notes: row.get("delivery_notes"),
            total_amount,
            line_items,
            cancelled: row.get::<i64, _>("cancelled") != 0,
            version: row.get::<i64, _>("version") as u64,
            agreement,
        })
    }
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| StoreError::Serialization(format!("bad timestamp: {secs}")))
}

fn opt_from_unix(secs: Option<i64>) -> Result<Option<DateTime<Utc>>, StoreError> {
    secs.map(from_unix).transpose()
}

fn to_unix(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let line_items = serde_json::to_string(&order.line_items)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_email, customer_name, delivery_at, delivery_notes,
                total_amount, line_items, cancelled, version,
                agreement_status, submission_id, signed_at, viewed_at,
                delivery_blocked, override_reason, override_by, override_at,
                last_reminder_tier, last_reminder_sent_at, needs_new_submission
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_email)
        .bind(&order.customer_name)
        .bind(order.delivery_at.map(to_unix))
        .bind(&order.delivery_notes)
        .bind(order.total_amount.to_string())
        .bind(&line_items)
        .bind(order.cancelled as i64)
        .bind(order.version as i64)
        .bind(order.agreement.status.as_str())
        .bind(&order.agreement.submission_id)
        .bind(order.agreement.signed_at.map(to_unix))
        .bind(order.agreement.viewed_at.map(to_unix))
        .bind(order.agreement.delivery_blocked as i64)
        .bind(order.agreement.block_override.as_ref().map(|o| o.reason.clone()))
        .bind(order.agreement.block_override.as_ref().map(|o| o.by.clone()))
        .bind(order.agreement.block_override.as_ref().map(|o| to_unix(o.at)))
        .bind(order.agreement.last_reminder_tier.as_str())
        .bind(order.agreement.last_reminder_sent_at.map(to_unix))
        .bind(order.agreement.needs_new_submission as i64)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateId(order.id.clone()))
            }
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn get_by_submission(&self, submission_id: &str) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT * FROM orders WHERE submission_id = ?")
            .bind(submission_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn update_agreement(
        &self,
        order_id: &str,
        expected_version: u64,
        agreement: &AgreementRecord,
    ) -> Result<u64, StoreError> {
        // The WHERE clause on version is the compare-and-set: a stale
        // reader updates zero rows and must re-fetch.
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                agreement_status = ?,
                submission_id = ?,
                signed_at = ?,
                viewed_at = ?,
                delivery_blocked = ?,
                override_reason = ?,
                override_by = ?,
                override_at = ?,
                last_reminder_tier = ?,
                last_reminder_sent_at = ?,
                needs_new_submission = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(agreement.status.as_str())
        .bind(&agreement.submission_id)
        .bind(agreement.signed_at.map(to_unix))
        .bind(agreement.viewed_at.map(to_unix))
        .bind(agreement.delivery_blocked as i64)
        .bind(agreement.block_override.as_ref().map(|o| o.reason.clone()))
        .bind(agreement.block_override.as_ref().map(|o| o.by.clone()))
        .bind(agreement.block_override.as_ref().map(|o| to_unix(o.at)))
        .bind(agreement.last_reminder_tier.as_str())
        .bind(agreement.last_reminder_sent_at.map(to_unix))
        .bind(agreement.needs_new_submission as i64)
        .bind(order_id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return match self.get(order_id).await? {
                Some(_) => Err(StoreError::Conflict(order_id.to_string())),
                None => Err(StoreError::NotFound(order_id.to_string())),
            };
        }

        Ok(expected_version + 1)
    }

    async fn mark_cancelled(&self, order_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE orders SET cancelled = 1 WHERE id = ?")
            .bind(order_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(order_id.to_string()));
        }
        Ok(())
    }

    async fn list_unsigned_with_submission(&self, limit: usize) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM orders
            WHERE cancelled = 0
              AND agreement_status != 'signed'
              AND submission_id IS NOT NULL
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn list_reminder_candidates(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM orders
            WHERE cancelled = 0
              AND agreement_status != 'signed'
              AND override_by IS NULL
              AND (delivery_at IS NULL OR delivery_at > ?)
            ORDER BY delivery_at IS NULL, delivery_at, id
            LIMIT ?
            "#,
        )
        .bind(to_unix(now))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn record_transition(
        &self,
        order_id: &str,
        transition: AgreementTransition,
    ) -> Result<(), StoreError> {
        if self.get(order_id).await?.is_none() {
            return Err(StoreError::NotFound(order_id.to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO agreement_transitions (order_id, from_status, to_status, at, details)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(order_id)
        .bind(transition.from_status.as_str())
        .bind(transition.to_status.as_str())
        .bind(to_unix(transition.at))
        .bind(&transition.details)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get_history(&self, order_id: &str) -> Result<Vec<AgreementTransition>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT from_status, to_status, at, details
            FROM agreement_transitions
            WHERE order_id = ?
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let from_str: String = row.get("from_status");
                let to_str: String = row.get("to_status");
                let from_status = AgreementStatus::parse(&from_str).ok_or_else(|| {
                    StoreError::Serialization(format!("bad from status: {from_str}"))
                })?;
                let to_status = AgreementStatus::parse(&to_str).ok_or_else(|| {
                    StoreError::Serialization(format!("bad to status: {to_str}"))
                })?;

                Ok(AgreementTransition {
                    from_status,
                    to_status,
                    at: from_unix(row.get("at"))?,
                    details: row.get("details"),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_order(id: &str) -> Order {
        let mut order = Order::new(id, "jo@example.com", "Jo Doe");
        order.total_amount = Decimal::new(40000, 2);
        order.line_items = vec![LineItem::new("Bounce castle", 1, Decimal::new(40000, 2))];
        order
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = SqliteOrderStore::in_memory().await.unwrap();

        let mut order = test_order("order-1");
        order.delivery_at = Some(from_unix(1_750_000_000).unwrap());
        order.agreement.attach_new_submission("sub-1");

        store.create(&order).await.unwrap();
        let fetched = store.get("order-1").await.unwrap().unwrap();

        assert_eq!(fetched, order);

        let by_submission = store.get_by_submission("sub-1").await.unwrap();
        assert_eq!(by_submission.map(|o| o.id), Some("order-1".to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_id() {
        let store = SqliteOrderStore::in_memory().await.unwrap();
        let order = test_order("order-1");

        store.create(&order).await.unwrap();
        assert!(matches!(
            store.create(&order).await,
            Err(StoreError::DuplicateId(_))
        ));
    }

    #[tokio::test]
    async fn test_conditional_update() {
        let store = SqliteOrderStore::in_memory().await.unwrap();
        store.create(&test_order("order-1")).await.unwrap();

        let mut agreement = AgreementRecord::new();
        agreement.attach_new_submission("sub-1");

        let version = store
            .update_agreement("order-1", 0, &agreement)
            .await
            .unwrap();
        assert_eq!(version, 1);

        // Stale writer loses
        let stale = store.update_agreement("order-1", 0, &agreement).await;
        assert!(matches!(stale, Err(StoreError::Conflict(_))));

        // Missing order is not a conflict
        let missing = store.update_agreement("order-x", 0, &agreement).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_override_round_trip() {
        let store = SqliteOrderStore::in_memory().await.unwrap();
        store.create(&test_order("order-1")).await.unwrap();

        let mut agreement = AgreementRecord::new();
        agreement.delivery_blocked = false;
        agreement.block_override = Some(BlockOverride {
            reason: "signed on paper at pickup".to_string(),
            by: "dispatcher-1".to_string(),
            at: from_unix(1_750_000_000).unwrap(),
        });

        store
            .update_agreement("order-1", 0, &agreement)
            .await
            .unwrap();

        let fetched = store.get("order-1").await.unwrap().unwrap();
        assert_eq!(fetched.agreement.block_override, agreement.block_override);
        assert!(!fetched.agreement.delivery_blocked);
    }

    #[tokio::test]
    async fn test_sweep_and_reminder_queries() {
        let store = SqliteOrderStore::in_memory().await.unwrap();
        let now = from_unix(1_000_000).unwrap();

        let mut pollable = test_order("order-1");
        pollable.delivery_at = Some(from_unix(2_000_000).unwrap());
        pollable.agreement.attach_new_submission("sub-1");

        let mut no_submission = test_order("order-2");
        no_submission.delivery_at = Some(from_unix(2_000_000).unwrap());

        let mut passed = test_order("order-3");
        passed.delivery_at = Some(from_unix(500).unwrap());
        passed.agreement.attach_new_submission("sub-3");

        for order in [&pollable, &no_submission, &passed] {
            store.create(order).await.unwrap();
        }

        let sweepable = store.list_unsigned_with_submission(10).await.unwrap();
        let ids: Vec<_> = sweepable.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["order-1", "order-3"]);

        let candidates = store.list_reminder_candidates(now, 10).await.unwrap();
        let ids: Vec<_> = candidates.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["order-1", "order-2"]);
    }

    #[tokio::test]
    async fn test_history_round_trip() {
        let store = SqliteOrderStore::in_memory().await.unwrap();
        store.create(&test_order("order-1")).await.unwrap();

        let transition = AgreementTransition::new(
            AgreementStatus::Pending,
            AgreementStatus::Signed,
            from_unix(1_000_000).unwrap(),
        )
        .with_details("all recipients completed");

        store
            .record_transition("order-1", transition.clone())
            .await
            .unwrap();

        let history = store.get_history("order-1").await.unwrap();
        assert_eq!(history, vec![transition]);
    }
}
