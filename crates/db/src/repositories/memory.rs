use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use rfqdesk_core::domain::idempotency::{IdempotencyRecord, OperationKey};
use rfqdesk_core::domain::material::{MaterialLineId, MaterialStatusChange};
use rfqdesk_core::domain::party::ProjectId;
use rfqdesk_core::domain::response::{ResponseId, SupplierResponse};
use rfqdesk_core::domain::rfq::{Rfq, RfqId, RfqNumber, RfqStatus};

use super::{
    IdempotencyRepository, NotificationAttempt, NotificationLogRepository, RepositoryError,
    ResponseRepository, RfqRepository,
};

#[derive(Default)]
struct RfqState {
    rfqs: HashMap<String, Rfq>,
    last_number: u32,
    history: Vec<MaterialStatusChange>,
}

impl RfqState {
    fn write_guarded(&mut self, mut rfq: Rfq, expected_version: u32) -> Result<Rfq, RepositoryError> {
        let conflict = || RepositoryError::Conflict { entity: "rfq", id: rfq.id.0.clone() };
        let stored = self.rfqs.get(&rfq.id.0).ok_or_else(conflict)?;
        if stored.version != expected_version {
            return Err(conflict());
        }
        rfq.number = stored.number;
        rfq.created_at = stored.created_at;
        rfq.version = expected_version + 1;
        self.rfqs.insert(rfq.id.0.clone(), rfq.clone());
        Ok(rfq)
    }
}

#[derive(Default)]
pub struct InMemoryRfqRepository {
    state: RwLock<RfqState>,
}

#[async_trait::async_trait]
impl RfqRepository for InMemoryRfqRepository {
    async fn create(&self, mut rfq: Rfq) -> Result<Rfq, RepositoryError> {
        let mut state = self.state.write().await;
        if state.rfqs.contains_key(&rfq.id.0) {
            return Err(RepositoryError::Conflict { entity: "rfq", id: rfq.id.0 });
        }
        state.last_number += 1;
        rfq.number = RfqNumber(state.last_number);
        rfq.version = 1;
        state.rfqs.insert(rfq.id.0.clone(), rfq.clone());
        Ok(rfq)
    }

    async fn find_by_id(&self, id: &RfqId) -> Result<Option<Rfq>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.rfqs.get(&id.0).cloned())
    }

    async fn list_for_project(&self, project_id: &ProjectId) -> Result<Vec<Rfq>, RepositoryError> {
        let mut rfqs = self
            .list_all()
            .await?
            .into_iter()
            .filter(|rfq| &rfq.project_id == project_id)
            .collect::<Vec<_>>();
        rfqs.sort_by_key(|rfq| rfq.number);
        Ok(rfqs)
    }

    async fn list_all(&self) -> Result<Vec<Rfq>, RepositoryError> {
        let state = self.state.read().await;
        let mut rfqs = state.rfqs.values().cloned().collect::<Vec<_>>();
        rfqs.sort_by_key(|rfq| rfq.number);
        Ok(rfqs)
    }

    async fn save(&self, rfq: Rfq, expected_version: u32) -> Result<Rfq, RepositoryError> {
        let mut state = self.state.write().await;
        state.write_guarded(rfq, expected_version)
    }

    async fn save_with_status_change(
        &self,
        rfq: Rfq,
        expected_version: u32,
        change: MaterialStatusChange,
    ) -> Result<Rfq, RepositoryError> {
        let mut state = self.state.write().await;
        let saved = state.write_guarded(rfq, expected_version)?;
        state.history.push(change);
        Ok(saved)
    }

    async fn delete(&self, id: &RfqId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let removed = state.rfqs.remove(&id.0).is_some();
        state.history.retain(|change| &change.rfq_id != id);
        Ok(removed)
    }

    async fn list_status_history(
        &self,
        line_id: &MaterialLineId,
    ) -> Result<Vec<MaterialStatusChange>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.history.iter().filter(|change| &change.line_id == line_id).cloned().collect())
    }
}

/// Responses checked against a shared RFQ store, so appends and closes on the
/// same RFQ are ordered by its lock.
pub struct InMemoryResponseRepository {
    rfqs: Arc<InMemoryRfqRepository>,
    responses: RwLock<Vec<SupplierResponse>>,
}

impl InMemoryResponseRepository {
    pub fn new(rfqs: Arc<InMemoryRfqRepository>) -> Self {
        Self { rfqs, responses: RwLock::default() }
    }
}

#[async_trait::async_trait]
impl ResponseRepository for InMemoryResponseRepository {
    async fn append(&self, response: SupplierResponse) -> Result<(), RepositoryError> {
        let rfq_state = self.rfqs.state.read().await;
        let accepting = rfq_state
            .rfqs
            .get(&response.rfq_id.0)
            .is_some_and(|rfq| rfq.status == RfqStatus::Published);
        if !accepting {
            return Err(RepositoryError::Conflict { entity: "rfq", id: response.rfq_id.0 });
        }

        let mut responses = self.responses.write().await;
        if responses.iter().any(|existing| existing.id == response.id) {
            return Err(RepositoryError::Conflict { entity: "response", id: response.id.0 });
        }
        responses.push(response);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &ResponseId,
    ) -> Result<Option<SupplierResponse>, RepositoryError> {
        let responses = self.responses.read().await;
        Ok(responses.iter().find(|response| &response.id == id).cloned())
    }

    async fn list_for_rfq(&self, rfq_id: &RfqId) -> Result<Vec<SupplierResponse>, RepositoryError> {
        let responses = self.responses.read().await;
        let mut matching = responses
            .iter()
            .filter(|response| &response.rfq_id == rfq_id)
            .cloned()
            .collect::<Vec<_>>();
        // Stable sort keeps arrival order for equal timestamps.
        matching.sort_by_key(|response| response.submitted_at);
        Ok(matching)
    }

    async fn count_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError> {
        let responses = self.responses.read().await;
        Ok(responses.iter().filter(|response| &response.rfq_id == rfq_id).count())
    }

    async fn delete_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError> {
        let mut responses = self.responses.write().await;
        let before = responses.len();
        responses.retain(|response| &response.rfq_id != rfq_id);
        Ok(before - responses.len())
    }
}

#[derive(Default)]
pub struct InMemoryNotificationLogRepository {
    attempts: RwLock<Vec<NotificationAttempt>>,
}

#[async_trait::async_trait]
impl NotificationLogRepository for InMemoryNotificationLogRepository {
    async fn record_attempts(
        &self,
        attempts: Vec<NotificationAttempt>,
    ) -> Result<(), RepositoryError> {
        self.attempts.write().await.extend(attempts);
        Ok(())
    }

    async fn list_attempts(
        &self,
        rfq_id: &RfqId,
    ) -> Result<Vec<NotificationAttempt>, RepositoryError> {
        let attempts = self.attempts.read().await;
        Ok(attempts.iter().filter(|attempt| &attempt.rfq_id == rfq_id).cloned().collect())
    }

    async fn delete_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError> {
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|attempt| &attempt.rfq_id != rfq_id);
        Ok(before - attempts.len())
    }
}

#[derive(Default)]
pub struct InMemoryIdempotencyRepository {
    records: RwLock<HashMap<String, IdempotencyRecord>>,
}

#[async_trait::async_trait]
impl IdempotencyRepository for InMemoryIdempotencyRepository {
    async fn find_operation(
        &self,
        operation_key: &OperationKey,
    ) -> Result<Option<IdempotencyRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&operation_key.0).cloned())
    }

    async fn save_operation(&self, record: IdempotencyRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.entry(record.operation_key.0.clone()).or_insert(record);
        Ok(())
    }
    async fn delete_for_rfq(&self, rfq_id: &RfqId) -> Result<usize, RepositoryError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| &record.rfq_id != rfq_id);
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use rfqdesk_core::domain::idempotency::{IdempotencyRecord, OperationKey, OperationKind};
    use rfqdesk_core::domain::material::{MaterialLineId, MaterialStatus, MaterialStatusChange};
    use rfqdesk_core::domain::party::{ProjectId, SupplierId};
    use rfqdesk_core::domain::response::{ResponseId, ResponseStatus, SupplierResponse};
    use rfqdesk_core::domain::rfq::{Rfq, RfqId, RfqNumber, RfqStatus};
    use rust_decimal::Decimal;

    use crate::repositories::{
        IdempotencyRepository, InMemoryIdempotencyRepository, InMemoryResponseRepository,
        InMemoryRfqRepository, RepositoryError, ResponseRepository, RfqRepository,
    };

    fn draft(id: &str, project: &str) -> Rfq {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("timestamp");
        Rfq::draft(RfqId(id.to_string()), ProjectId(project.to_string()), now)
    }

    #[tokio::test]
    async fn create_assigns_sequential_numbers() {
        let repo = InMemoryRfqRepository::default();

        let first = repo.create(draft("RFQ-A", "PRJ-1")).await.expect("create first");
        let second = repo.create(draft("RFQ-B", "PRJ-2")).await.expect("create second");

        assert_eq!(first.number, RfqNumber(1));
        assert_eq!(second.number, RfqNumber(2));
        assert_eq!(first.version, 1);
        assert_eq!(
            repo.list_for_project(&ProjectId("PRJ-2".to_string())).await.expect("list").len(),
            1
        );
    }

    #[tokio::test]
    async fn stale_version_is_rejected_as_conflict() {
        let repo = InMemoryRfqRepository::default();
        let created = repo.create(draft("RFQ-A", "PRJ-1")).await.expect("create");

        let mut first_writer = created.clone();
        first_writer.terms = "30 days credit".to_string();
        let saved = repo.save(first_writer, created.version).await.expect("first save");
        assert_eq!(saved.version, 2);

        let mut second_writer = created.clone();
        second_writer.terms = "advance payment".to_string();
        let error = repo.save(second_writer, created.version).await.expect_err("stale write");

        assert!(matches!(error, RepositoryError::Conflict { entity: "rfq", .. }));
        let stored = repo.find_by_id(&created.id).await.expect("find").expect("present");
        assert_eq!(stored.terms, "30 days credit");
    }

    #[tokio::test]
    async fn status_history_is_written_with_the_save() {
        let repo = InMemoryRfqRepository::default();
        let created = repo.create(draft("RFQ-A", "PRJ-1")).await.expect("create");
        let change = MaterialStatusChange {
            rfq_id: created.id.clone(),
            line_id: MaterialLineId("ML-1".to_string()),
            from: MaterialStatus::Pending,
            to: MaterialStatus::Ordered,
            actor: "buyer".to_string(),
            changed_at: Utc::now(),
        };

        repo.save_with_status_change(created.clone(), created.version, change.clone())
            .await
            .expect("save");
        let history = repo
            .list_status_history(&MaterialLineId("ML-1".to_string()))
            .await
            .expect("history");
        assert_eq!(history, vec![change]);

        assert!(repo.delete(&created.id).await.expect("delete"));
        assert!(repo
            .list_status_history(&MaterialLineId("ML-1".to_string()))
            .await
            .expect("history")
            .is_empty());
    }

    async fn published(rfqs: &InMemoryRfqRepository, id: &str) -> RfqId {
        let mut rfq = draft(id, "PRJ-1");
        rfq.status = RfqStatus::Published;
        rfqs.create(rfq).await.expect("create published rfq").id
    }

    fn submitted(id: &str, rfq_id: &RfqId) -> SupplierResponse {
        SupplierResponse {
            id: ResponseId(id.to_string()),
            rfq_id: rfq_id.clone(),
            supplier_id: SupplierId("SUP-1".to_string()),
            submitted_at: Utc::now(),
            tax_rate: Decimal::new(18, 0),
            quotes: Vec::new(),
            status: ResponseStatus::Submitted,
        }
    }

    #[tokio::test]
    async fn responses_list_by_submission_time_with_arrival_tiebreak() {
        let rfqs = Arc::new(InMemoryRfqRepository::default());
        let rfq_id = published(&rfqs, "RFQ-A").await;
        let repo = InMemoryResponseRepository::new(rfqs);
        let at = |hour| Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).single().expect("timestamp");
        let response = |id: &str, hour| SupplierResponse {
            id: ResponseId(id.to_string()),
            rfq_id: rfq_id.clone(),
            supplier_id: SupplierId("SUP-1".to_string()),
            submitted_at: at(hour),
            tax_rate: Decimal::new(18, 0),
            quotes: Vec::new(),
            status: ResponseStatus::Submitted,
        };

        repo.append(response("RSP-late", 12)).await.expect("append");
        repo.append(response("RSP-tie-1", 10)).await.expect("append");
        repo.append(response("RSP-tie-2", 10)).await.expect("append");

        let ids = repo
            .list_for_rfq(&rfq_id)
            .await
            .expect("list")
            .into_iter()
            .map(|response| response.id.0)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["RSP-tie-1", "RSP-tie-2", "RSP-late"]);
        assert_eq!(repo.delete_for_rfq(&rfq_id).await.expect("delete"), 3);
    }

    #[tokio::test]
    async fn responses_are_refused_for_drafts_and_closed_rfqs() {
        let rfqs = Arc::new(InMemoryRfqRepository::default());
        let draft_id = rfqs.create(draft("RFQ-D", "PRJ-1")).await.expect("create draft").id;
        let open_id = published(&rfqs, "RFQ-P").await;
        let repo = InMemoryResponseRepository::new(rfqs.clone());

        let refused = repo.append(submitted("RSP-draft", &draft_id)).await;
        assert!(matches!(refused, Err(RepositoryError::Conflict { entity: "rfq", .. })));
        repo.append(submitted("RSP-open", &open_id)).await.expect("append while published");

        let mut closing = rfqs.find_by_id(&open_id).await.expect("find").expect("present");
        let version = closing.version;
        closing.status = RfqStatus::Closed;
        rfqs.save(closing, version).await.expect("close");

        let late = repo.append(submitted("RSP-late", &open_id)).await;
        assert!(matches!(late, Err(RepositoryError::Conflict { entity: "rfq", .. })));
        assert_eq!(repo.count_for_rfq(&open_id).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn idempotency_keeps_the_first_record() {
        let repo = InMemoryIdempotencyRepository::default();
        let record = |hash: &str| IdempotencyRecord {
            operation_key: OperationKey("key-1".to_string()),
            rfq_id: RfqId("RFQ-A".to_string()),
            operation_kind: OperationKind::Publish,
            payload_hash: hash.to_string(),
            result_json: "{}".to_string(),
            correlation_id: "corr-1".to_string(),
            created_at: Utc::now(),
        };

        repo.save_operation(record("first")).await.expect("save");
        repo.save_operation(record("second")).await.expect("save again");

        let stored = repo
            .find_operation(&OperationKey("key-1".to_string()))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(stored.payload_hash, "first");

        assert_eq!(repo.delete_for_rfq(&RfqId("RFQ-B".to_string())).await.expect("delete"), 0);
        assert_eq!(repo.delete_for_rfq(&RfqId("RFQ-A".to_string())).await.expect("delete"), 1);
        assert!(repo
            .find_operation(&OperationKey("key-1".to_string()))
            .await
            .expect("find")
            .is_none());
    }
}
