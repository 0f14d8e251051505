use rfqdesk_core::domain::idempotency::{IdempotencyRecord, OperationKey, OperationKind};
use rfqdesk_core::domain::rfq::RfqId;
use sqlx::{sqlite::SqliteRow, Row};

use super::{encode_timestamp, parse_rfc3339, IdempotencyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlIdempotencyRepository {
    pool: DbPool,
}

impl SqlIdempotencyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IdempotencyRepository for SqlIdempotencyRepository {
    async fn find_operation(
        &self,
        operation_key: &OperationKey,
    ) -> Result<Option<IdempotencyRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                operation_key,
                rfq_id,
                operation_kind,
                payload_hash,
                result_json,
                correlation_id,
                created_at
             FROM idempotency_record
             WHERE operation_key = ?",
        )
        .bind(&operation_key.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    async fn save_operation(&self, record: IdempotencyRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO idempotency_record (
                operation_key,
                rfq_id,
                operation_kind,
                payload_hash,
                result_json,
                correlation_id,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(operation_key) DO NOTHING",
        )
        .bind(&record.operation_key.0)
        .bind(&record.rfq_id.0)
        .bind(record.operation_kind.as_str())
        .bind(&record.payload_hash)
        .bind(&record.result_json)
        .bind(&record.correlation_id)
        .bind(encode_timestamp(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM idempotency_record WHERE rfq_id = ?")
            .bind(&rfq_id.0)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() as usize)
    }
}

fn record_from_row(row: &SqliteRow) -> Result<IdempotencyRecord, RepositoryError> {
    let kind_raw: String = row.try_get("operation_kind")?;
    let operation_kind = OperationKind::parse(&kind_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("invalid operation kind: {kind_raw}")))?;
    let created_at: String = row.try_get("created_at")?;

    Ok(IdempotencyRecord {
        operation_key: OperationKey(row.try_get("operation_key")?),
        rfq_id: RfqId(row.try_get("rfq_id")?),
        operation_kind,
        payload_hash: row.try_get("payload_hash")?,
        result_json: row.try_get("result_json")?,
        correlation_id: row.try_get("correlation_id")?,
        created_at: parse_rfc3339("idempotency created_at", &created_at)?,
    })
}
