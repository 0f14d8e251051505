use rfqdesk_core::domain::party::SupplierId;
use rfqdesk_core::domain::response::{LineQuote, ResponseId, ResponseStatus, SupplierResponse};
use rfqdesk_core::domain::rfq::{RfqId, RfqStatus};
use sqlx::{sqlite::SqliteRow, Row};

use super::{encode_timestamp, parse_decimal, parse_rfc3339, RepositoryError, ResponseRepository};
use crate::DbPool;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SupplierResponseRecord {
    pub id: String,
    pub rfq_id: String,
    pub supplier_id: String,
    pub submitted_at: String,
    pub tax_rate: String,
    pub quotes_json: String,
    pub status: String,
}

impl TryFrom<SupplierResponse> for SupplierResponseRecord {
    type Error = RepositoryError;

    fn try_from(value: SupplierResponse) -> Result<Self, Self::Error> {
        let quotes_json = serde_json::to_string(&value.quotes)
            .map_err(|error| RepositoryError::Decode(format!("encode quotes: {error}")))?;

        Ok(Self {
            id: value.id.0,
            rfq_id: value.rfq_id.0,
            supplier_id: value.supplier_id.0,
            submitted_at: encode_timestamp(value.submitted_at),
            tax_rate: value.tax_rate.to_string(),
            quotes_json,
            status: value.status.as_str().to_string(),
        })
    }
}

impl TryFrom<SupplierResponseRecord> for SupplierResponse {
    type Error = RepositoryError;

    fn try_from(value: SupplierResponseRecord) -> Result<Self, Self::Error> {
        let status = ResponseStatus::parse(&value.status).ok_or_else(|| {
            RepositoryError::Decode(format!("invalid response status: {}", value.status))
        })?;
        let quotes: Vec<LineQuote> = serde_json::from_str(&value.quotes_json).map_err(|error| {
            RepositoryError::Decode(format!("invalid quotes for response {}: {error}", value.id))
        })?;

        Ok(Self {
            submitted_at: parse_rfc3339("response submitted_at", &value.submitted_at)?,
            tax_rate: parse_decimal("response tax_rate", &value.tax_rate)?,
            id: ResponseId(value.id),
            rfq_id: RfqId(value.rfq_id),
            supplier_id: SupplierId(value.supplier_id),
            quotes,
            status,
        })
    }
}

pub struct SqlResponseRepository {
    pool: DbPool,
}

impl SqlResponseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ResponseRepository for SqlResponseRepository {
    async fn append(&self, response: SupplierResponse) -> Result<(), RepositoryError> {
        let record = SupplierResponseRecord::try_from(response)?;

        // The status check and the insert are one statement, so a concurrent
        // close cannot slip in between them.
        let inserted = sqlx::query(
            "INSERT INTO supplier_response (
                id,
                rfq_id,
                supplier_id,
                submitted_at,
                tax_rate,
                quotes_json,
                status
             )
             SELECT ?, ?, ?, ?, ?, ?, ?
             WHERE EXISTS (SELECT 1 FROM rfq WHERE id = ? AND status = ?)",
        )
        .bind(&record.id)
        .bind(&record.rfq_id)
        .bind(&record.supplier_id)
        .bind(&record.submitted_at)
        .bind(&record.tax_rate)
        .bind(&record.quotes_json)
        .bind(&record.status)
        .bind(&record.rfq_id)
        .bind(RfqStatus::Published.as_str())
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(RepositoryError::Conflict { entity: "rfq", id: record.rfq_id });
        }
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ResponseId,
    ) -> Result<Option<SupplierResponse>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, rfq_id, supplier_id, submitted_at, tax_rate, quotes_json, status
             FROM supplier_response
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| response_from_row(&row)).transpose()
    }

    async fn list_for_rfq(&self, rfq_id: &RfqId) -> Result<Vec<SupplierResponse>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, rfq_id, supplier_id, submitted_at, tax_rate, quotes_json, status
             FROM supplier_response
             WHERE rfq_id = ?
             ORDER BY submitted_at ASC, seq ASC",
        )
        .bind(&rfq_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(response_from_row).collect()
    }

    async fn count_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM supplier_response WHERE rfq_id = ?")
                .bind(&rfq_id.0)
                .fetch_one(&self.pool)
                .await?;
        usize::try_from(count)
            .map_err(|_| RepositoryError::Decode(format!("invalid response count: {count}")))
    }

    async fn delete_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError> {
        let deleted = sqlx::query("DELETE FROM supplier_response WHERE rfq_id = ?")
            .bind(&rfq_id.0)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() as usize)
    }
}

fn response_record_from_row(row: &SqliteRow) -> Result<SupplierResponseRecord, RepositoryError> {
    Ok(SupplierResponseRecord {
        id: row.try_get("id")?,
        rfq_id: row.try_get("rfq_id")?,
        supplier_id: row.try_get("supplier_id")?,
        submitted_at: row.try_get("submitted_at")?,
        tax_rate: row.try_get("tax_rate")?,
        quotes_json: row.try_get("quotes_json")?,
        status: row.try_get("status")?,
    })
}

fn response_from_row(row: &SqliteRow) -> Result<SupplierResponse, RepositoryError> {
    SupplierResponse::try_from(response_record_from_row(row)?)
}
