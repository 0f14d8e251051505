use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rfqdesk_core::domain::idempotency::{IdempotencyRecord, OperationKey};
use rfqdesk_core::domain::material::{MaterialLineId, MaterialStatusChange};
use rfqdesk_core::domain::party::{ProjectId, SupplierId};
use rfqdesk_core::domain::response::{ResponseId, SupplierResponse};
use rfqdesk_core::domain::rfq::{Rfq, RfqId};
use rfqdesk_core::errors::ApplicationError;
use rfqdesk_core::invitation::DispatchReport;

pub mod directory;
pub mod idempotency;
pub mod memory;
pub mod notification;
pub mod response;
pub mod rfq;

pub use directory::SqlDirectory;
pub use idempotency::SqlIdempotencyRepository;
pub use memory::{
    InMemoryIdempotencyRepository, InMemoryNotificationLogRepository, InMemoryResponseRepository,
    InMemoryRfqRepository,
};
pub use notification::SqlNotificationLogRepository;
pub use response::SqlResponseRepository;
pub use rfq::SqlRfqRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` was modified concurrently")]
    Conflict { entity: &'static str, id: String },
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict { entity, id } => ApplicationError::Conflict(format!(
                "{entity} `{id}` was modified concurrently; reload it and retry"
            )),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
pub trait RfqRepository: Send + Sync {
    /// Stores a new draft, assigning the next sequential number and version 1.
    async fn create(&self, rfq: Rfq) -> Result<Rfq, RepositoryError>;

    async fn find_by_id(&self, id: &RfqId) -> Result<Option<Rfq>, RepositoryError>;

    /// RFQs of one project ordered by number.
    async fn list_for_project(&self, project_id: &ProjectId) -> Result<Vec<Rfq>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Rfq>, RepositoryError>;

    /// Writes `rfq` only if the stored version still equals `expected_version`,
    /// returning it with the bumped version. A lost race is `Conflict`.
    async fn save(&self, rfq: Rfq, expected_version: u32) -> Result<Rfq, RepositoryError>;

    /// `save` plus one history entry, atomically.
    async fn save_with_status_change(
        &self,
        rfq: Rfq,
        expected_version: u32,
        change: MaterialStatusChange,
    ) -> Result<Rfq, RepositoryError>;

    /// Returns false when nothing was stored under `id`.
    async fn delete(&self, id: &RfqId) -> Result<bool, RepositoryError>;

    async fn list_status_history(
        &self,
        line_id: &MaterialLineId,
    ) -> Result<Vec<MaterialStatusChange>, RepositoryError>;
}

#[async_trait]
pub trait ResponseRepository: Send + Sync {
    async fn append(&self, response: SupplierResponse) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &ResponseId)
        -> Result<Option<SupplierResponse>, RepositoryError>;

    /// Ordered by submission time, then arrival order.
    async fn list_for_rfq(&self, rfq_id: &RfqId) -> Result<Vec<SupplierResponse>, RepositoryError>;

    async fn count_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError>;

    async fn delete_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError>;
}

/// One delivery attempt of an invitation to one supplier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationAttempt {
    pub rfq_id: RfqId,
    pub supplier_id: SupplierId,
    pub email: String,
    pub delivered: bool,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl NotificationAttempt {
    pub fn from_report(
        rfq_id: &RfqId,
        report: &DispatchReport,
        attempted_at: DateTime<Utc>,
    ) -> Vec<Self> {
        report
            .deliveries
            .iter()
            .map(|delivery| Self {
                rfq_id: rfq_id.clone(),
                supplier_id: delivery.supplier_id.clone(),
                email: delivery.email.clone(),
                delivered: delivery.delivered,
                error: delivery.error.clone(),
                attempted_at,
            })
            .collect()
    }
}

#[async_trait]
pub trait NotificationLogRepository: Send + Sync {
    async fn record_attempts(&self, attempts: Vec<NotificationAttempt>)
        -> Result<(), RepositoryError>;

    /// Every attempt for the RFQ in the order it was recorded.
    async fn list_attempts(&self, rfq_id: &RfqId)
        -> Result<Vec<NotificationAttempt>, RepositoryError>;

    async fn delete_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError>;

    /// The most recent attempt per supplier.
    async fn latest_by_supplier(
        &self,
        rfq_id: &RfqId,
    ) -> Result<BTreeMap<SupplierId, NotificationAttempt>, RepositoryError> {
        let mut latest = BTreeMap::new();
        for attempt in self.list_attempts(rfq_id).await? {
            latest.insert(attempt.supplier_id.clone(), attempt);
        }
        Ok(latest)
    }
}

#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    async fn find_operation(
        &self,
        operation_key: &OperationKey,
    ) -> Result<Option<IdempotencyRecord>, RepositoryError>;

    /// First writer wins; saving an existing key leaves the stored record alone.
    async fn save_operation(&self, record: IdempotencyRecord) -> Result<(), RepositoryError>;

    async fn delete_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError>;
}

/// Fixed-width UTC encoding so stored timestamps sort lexicographically.
pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_rfc3339(field: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc)).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} timestamp '{}': {}", field, value, err))
    })
}

pub(crate) fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, RepositoryError> {
    value
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| {
                RepositoryError::Decode(format!("invalid {} date '{}': {}", field, raw, err))
            })
        })
        .transpose()
}

pub(crate) fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(|err| {
        RepositoryError::Decode(format!("invalid {} decimal '{}': {}", field, value, err))
    })
}
