use rfqdesk_core::domain::party::SupplierId;
use rfqdesk_core::domain::rfq::RfqId;
use sqlx::{sqlite::SqliteRow, Row};

use super::{
    encode_timestamp, parse_rfc3339, NotificationAttempt, NotificationLogRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlNotificationLogRepository {
    pool: DbPool,
}

impl SqlNotificationLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NotificationLogRepository for SqlNotificationLogRepository {
    async fn record_attempts(
        &self,
        attempts: Vec<NotificationAttempt>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for attempt in &attempts {
            sqlx::query(
                "INSERT INTO notification_attempt (
                    rfq_id,
                    supplier_id,
                    email,
                    delivered,
                    error,
                    attempted_at
                 ) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&attempt.rfq_id.0)
            .bind(&attempt.supplier_id.0)
            .bind(&attempt.email)
            .bind(attempt.delivered)
            .bind(attempt.error.as_deref())
            .bind(encode_timestamp(attempt.attempted_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_attempts(
        &self,
        rfq_id: &RfqId,
    ) -> Result<Vec<NotificationAttempt>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT rfq_id, supplier_id, email, delivered, error, attempted_at
             FROM notification_attempt
             WHERE rfq_id = ?
             ORDER BY id ASC",
        )
        .bind(&rfq_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(attempt_from_row).collect()
    }

    async fn delete_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM notification_attempt WHERE rfq_id = ?")
            .bind(&rfq_id.0)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() as usize)
    }
}

fn attempt_from_row(row: &SqliteRow) -> Result<NotificationAttempt, RepositoryError> {
    let attempted_at: String = row.try_get("attempted_at")?;
    Ok(NotificationAttempt {
        rfq_id: RfqId(row.try_get("rfq_id")?),
        supplier_id: SupplierId(row.try_get("supplier_id")?),
        email: row.try_get("email")?,
        delivered: row.try_get("delivered")?,
        error: row.try_get("error")?,
        attempted_at: parse_rfc3339("notification attempted_at", &attempted_at)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use rfqdesk_core::domain::party::{ProjectId, SupplierId};
    use rfqdesk_core::domain::rfq::{Rfq, RfqId};
    use rfqdesk_core::invitation::{DeliveryOutcome, DispatchReport};

    use super::SqlNotificationLogRepository;
    use crate::repositories::{
        NotificationAttempt, NotificationLogRepository, RfqRepository, SqlRfqRepository,
    };
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn latest_attempt_per_supplier_reflects_retries() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let rfq_id = RfqId("RFQ-1".to_string());
        SqlRfqRepository::new(pool.clone())
            .create(Rfq::draft(rfq_id.clone(), ProjectId("PRJ-1".to_string()), Utc::now()))
            .await
            .expect("create rfq");
        let repo = SqlNotificationLogRepository::new(pool);
        let first_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("timestamp");

        let first = DispatchReport {
            deliveries: vec![
                DeliveryOutcome::delivered(SupplierId("SUP-A".to_string()), "a@timber.in"),
                DeliveryOutcome::failed(SupplierId("SUP-B".to_string()), "b@steel.in", "mailbox full"),
            ],
        };
        let retry = DispatchReport {
            deliveries: vec![DeliveryOutcome::delivered(
                SupplierId("SUP-B".to_string()),
                "b@steel.in",
            )],
        };
        repo.record_attempts(NotificationAttempt::from_report(&rfq_id, &first, first_at))
            .await
            .expect("record first");
        repo.record_attempts(NotificationAttempt::from_report(
            &rfq_id,
            &retry,
            first_at + Duration::minutes(5),
        ))
        .await
        .expect("record retry");

        let attempts = repo.list_attempts(&rfq_id).await.expect("list");
        assert_eq!(attempts.len(), 3);
        assert_eq!(attempts[1].error.as_deref(), Some("mailbox full"));

        let latest = repo.latest_by_supplier(&rfq_id).await.expect("latest");
        assert_eq!(latest.len(), 2);
        assert!(latest.values().all(|attempt| attempt.delivered));
        assert_eq!(latest[&SupplierId("SUP-B".to_string())].attempted_at, first_at + Duration::minutes(5));
    }
}
