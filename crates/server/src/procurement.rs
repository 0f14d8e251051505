//! Procurement workflows over the repositories and collaborator seams.
//!
//! Every RFQ mutation is a version-guarded read-modify-write. Publishing
//! persists the status change before any invitation is sent, so a failed
//! delivery never rolls the RFQ back to draft.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rfqdesk_core::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use rfqdesk_core::collaborators::{CatalogDirectory, ProjectDirectory, SupplierDirectory};
use rfqdesk_core::collector::{build_response, ResponseSubmission};
use rfqdesk_core::domain::idempotency::{
    payload_hash, IdempotencyRecord, OperationKey, OperationKind,
};
use rfqdesk_core::domain::material::{
    MaterialLine, MaterialLineId, MaterialStatus, MaterialStatusChange,
};
use rfqdesk_core::domain::party::{MaterialSummary, Project, ProjectId, SupplierId};
use rfqdesk_core::domain::response::{ResponseId, SupplierResponse};
use rfqdesk_core::domain::rfq::{validate_supplier_ids, Rfq, RfqId, RfqPatch, RfqStatus};
use rfqdesk_core::errors::{ApplicationError, DomainError};
use rfqdesk_core::flows::{FlowContext, FlowEngine, FlowEvent, RfqLifecycle};
use rfqdesk_core::invitation::{
    dispatch, resolve_contacts, DispatchReport, NotificationGateway, RfqSummary, SummaryRenderer,
};
use rfqdesk_core::registry::{MaterialLinePatch, MaterialLineRegistry, NewMaterialLine};
use rfqdesk_core::settlement::{
    compare_responses, DeterministicAggregator, QuoteAggregator, ResponseComparison, Settlement,
};
use rfqdesk_core::tracker::{self, MoveOutcome, StatusBoard};
use rfqdesk_db::repositories::{
    InMemoryIdempotencyRepository, InMemoryNotificationLogRepository, InMemoryResponseRepository,
    InMemoryRfqRepository, SqlIdempotencyRepository, SqlNotificationLogRepository,
    SqlResponseRepository, SqlRfqRepository,
};
use rfqdesk_db::{
    DbPool, IdempotencyRepository, NotificationAttempt, NotificationLogRepository,
    ResponseRepository, RfqRepository,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// Caller identity and correlation id carried through one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: String,
    pub actor: String,
}

impl RequestContext {
    pub fn new(correlation_id: impl Into<String>, actor: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into(), actor: actor.into() }
    }

    pub fn generated(actor: impl Into<String>) -> Self {
        Self::new(format!("req-{}", Uuid::new_v4().simple()), actor)
    }

    fn audit(&self, rfq_id: &RfqId) -> AuditContext {
        AuditContext::new(Some(rfq_id.clone()), &self.correlation_id, &self.actor)
    }
}

#[derive(Clone)]
pub struct Stores {
    pub rfqs: Arc<dyn RfqRepository>,
    pub responses: Arc<dyn ResponseRepository>,
    pub notifications: Arc<dyn NotificationLogRepository>,
    pub idempotency: Arc<dyn IdempotencyRepository>,
}

impl Stores {
    pub fn sql(pool: DbPool) -> Self {
        Self {
            rfqs: Arc::new(SqlRfqRepository::new(pool.clone())),
            responses: Arc::new(SqlResponseRepository::new(pool.clone())),
            notifications: Arc::new(SqlNotificationLogRepository::new(pool.clone())),
            idempotency: Arc::new(SqlIdempotencyRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let rfqs = Arc::new(InMemoryRfqRepository::default());
        Self {
            responses: Arc::new(InMemoryResponseRepository::new(rfqs.clone())),
            rfqs,
            notifications: Arc::new(InMemoryNotificationLogRepository::default()),
            idempotency: Arc::new(InMemoryIdempotencyRepository::default()),
        }
    }
}

#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CatalogDirectory>,
    pub projects: Arc<dyn ProjectDirectory>,
    pub suppliers: Arc<dyn SupplierDirectory>,
    pub gateway: Arc<dyn NotificationGateway>,
    pub audit: Arc<dyn AuditSink>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRfqRequest {
    pub project_id: ProjectId,
    #[serde(default)]
    pub delivery_location: Option<String>,
    #[serde(default)]
    pub bidding_start: Option<NaiveDate>,
    #[serde(default)]
    pub bidding_end: Option<NaiveDate>,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub supplier_ids: Vec<SupplierId>,
    #[serde(default)]
    pub materials: Vec<NewMaterialLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MoveStatusRequest {
    pub rfq_id: RfqId,
    pub line_id: MaterialLineId,
    pub from: MaterialStatus,
    pub to: MaterialStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub rfq: Rfq,
    pub dispatch: DispatchReport,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseOutcome {
    pub rfq: Rfq,
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveStatusOutcome {
    pub changed: bool,
    pub rfq_id: RfqId,
    pub line: MaterialLine,
    pub change: Option<MaterialStatusChange>,
}

pub struct ProcurementService {
    stores: Stores,
    collaborators: Collaborators,
    renderer: SummaryRenderer,
    flow: FlowEngine<RfqLifecycle>,
    aggregator: DeterministicAggregator,
}

impl ProcurementService {
    pub fn new(stores: Stores, collaborators: Collaborators, renderer: SummaryRenderer) -> Self {
        Self {
            stores,
            collaborators,
            renderer,
            flow: FlowEngine::default(),
            aggregator: DeterministicAggregator,
        }
    }

    pub async fn list_materials(
        &self,
        category: Option<&str>,
        search_term: Option<&str>,
    ) -> Result<Vec<MaterialSummary>, ApplicationError> {
        self.collaborators.catalog.list_materials(category, search_term).await
    }

    pub async fn create_draft(
        &self,
        ctx: &RequestContext,
        request: CreateRfqRequest,
    ) -> Result<Rfq, ApplicationError> {
        if request.project_id.0.trim().is_empty() {
            return Err(DomainError::validation("projectId", "must not be empty").into());
        }
        validate_supplier_ids(&request.supplier_ids)?;
        let project = self.existing_project(&request.project_id).await?;

        let now = Utc::now();
        let mut rfq = Rfq::draft(RfqId::generate(), request.project_id, now);
        rfq.delivery_location = request
            .delivery_location
            .map(|location| location.trim().to_owned())
            .filter(|location| !location.is_empty())
            .unwrap_or(project.delivery_location);
        rfq.bidding_start = request.bidding_start;
        rfq.bidding_end = request.bidding_end;
        rfq.delivery_date = request.delivery_date;
        rfq.terms = request.terms.unwrap_or_default();
        rfq.supplier_ids = request.supplier_ids;
        if !request.materials.is_empty() {
            MaterialLineRegistry::new(&mut rfq).add_lines(request.materials, now)?;
        }

        let created = self.stores.rfqs.create(rfq).await?;
        info!(
            event_name = "rfq.draft_created",
            correlation_id = %ctx.correlation_id,
            rfq_id = %created.id,
            rfq_number = %created.number,
            material_count = created.materials.len(),
            "rfq draft created"
        );
        self.collaborators.audit.emit(
            ctx.audit(&created.id)
                .event("rfq.draft_created", AuditCategory::Lifecycle, AuditOutcome::Success)
                .with_metadata("number", created.number.to_string()),
        );
        Ok(created)
    }

    pub async fn get_rfq(&self, id: &RfqId) -> Result<Rfq, ApplicationError> {
        self.stores
            .rfqs
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("rfq", id.0.clone()))
    }

    /// RFQs of one project, or every RFQ when no project is given.
    pub async fn list_rfqs(
        &self,
        project_id: Option<&ProjectId>,
    ) -> Result<Vec<Rfq>, ApplicationError> {
        let rfqs = match project_id {
            Some(project_id) => self.stores.rfqs.list_for_project(project_id).await?,
            None => self.stores.rfqs.list_all().await?,
        };
        Ok(rfqs)
    }

    pub async fn update_rfq(
        &self,
        ctx: &RequestContext,
        id: &RfqId,
        patch: RfqPatch,
    ) -> Result<Rfq, ApplicationError> {
        if let Some(project_id) = &patch.project_id {
            if !project_id.0.trim().is_empty() {
                self.existing_project(project_id).await?;
            }
        }
        let (rfq, ()) = self.mutate_rfq(id, |rfq, now| rfq.apply_patch(patch, now)).await?;
        info!(
            event_name = "rfq.updated",
            correlation_id = %ctx.correlation_id,
            rfq_id = %rfq.id,
            version = rfq.version,
            "rfq updated"
        );
        Ok(rfq)
    }

    /// Removes the RFQ. Stored responses block the delete unless `force` is
    /// set, in which case they go with it.
    pub async fn delete_rfq(
        &self,
        ctx: &RequestContext,
        id: &RfqId,
        force: bool,
    ) -> Result<(), ApplicationError> {
        let rfq = self.get_rfq(id).await?;
        let response_count = self.stores.responses.count_for_rfq(&rfq.id).await?;
        if response_count > 0 && !force {
            return Err(DomainError::validation(
                "force",
                format!(
                    "RFQ has {response_count} response(s); pass force=true to delete them as well"
                ),
            )
            .into());
        }

        if response_count > 0 {
            self.stores.responses.delete_for_rfq(&rfq.id).await?;
        }
        self.stores.notifications.delete_for_rfq(&rfq.id).await?;
        self.stores.idempotency.delete_for_rfq(&rfq.id).await?;
        if !self.stores.rfqs.delete(&rfq.id).await? {
            return Err(ApplicationError::not_found("rfq", rfq.id.0));
        }

        info!(
            event_name = "rfq.deleted",
            correlation_id = %ctx.correlation_id,
            rfq_id = %rfq.id,
            status = rfq.status.as_str(),
            responses_removed = response_count,
            "rfq deleted"
        );
        self.collaborators.audit.emit(
            ctx.audit(&rfq.id)
                .event("rfq.deleted", AuditCategory::Lifecycle, AuditOutcome::Success)
                .with_metadata("responses_removed", response_count.to_string()),
        );
        Ok(())
    }

    pub async fn add_lines(
        &self,
        ctx: &RequestContext,
        id: &RfqId,
        lines: Vec<NewMaterialLine>,
    ) -> Result<Rfq, ApplicationError> {
        let (rfq, added) = self
            .mutate_rfq(id, |rfq, now| MaterialLineRegistry::new(rfq).add_lines(lines, now))
            .await?;
        info!(
            event_name = "rfq.materials_added",
            correlation_id = %ctx.correlation_id,
            rfq_id = %rfq.id,
            added = added.len(),
            "material lines added"
        );
        Ok(rfq)
    }

    pub async fn update_line(
        &self,
        id: &RfqId,
        index: usize,
        patch: MaterialLinePatch,
    ) -> Result<Rfq, ApplicationError> {
        let (rfq, ()) = self
            .mutate_rfq(id, |rfq, now| {
                MaterialLineRegistry::new(rfq).update_line(index, patch, now).map(|_| ())
            })
            .await?;
        Ok(rfq)
    }

    pub async fn remove_line(&self, id: &RfqId, index: usize) -> Result<Rfq, ApplicationError> {
        let (rfq, _removed) = self
            .mutate_rfq(id, |rfq, now| MaterialLineRegistry::new(rfq).remove_line(index, now))
            .await?;
        Ok(rfq)
    }

    pub async fn set_delivery_date_for_all(
        &self,
        id: &RfqId,
        date: NaiveDate,
    ) -> Result<Rfq, ApplicationError> {
        let (rfq, _count) = self
            .mutate_rfq(id, |rfq, now| {
                MaterialLineRegistry::new(rfq).set_delivery_date_for_all(date, now)
            })
            .await?;
        Ok(rfq)
    }

    /// Renders the invitation text the suppliers would receive.
    pub async fn summary(&self, id: &RfqId) -> Result<RfqSummary, ApplicationError> {
        let rfq = self.get_rfq(id).await?;
        let project = self.existing_project(&rfq.project_id).await?;
        Ok(self.renderer.compose_summary(&rfq, &project)?)
    }

    /// Draft -> Published, then one invitation per supplier. Any failed
    /// delivery is reported as [`ApplicationError::Dispatch`] with the RFQ
    /// already published; retry with [`Self::redispatch`].
    pub async fn publish(
        &self,
        ctx: &RequestContext,
        id: &RfqId,
        key: Option<OperationKey>,
    ) -> Result<PublishOutcome, ApplicationError> {
        let hash = payload_hash(&request_payload(&serde_json::json!({ "rfqId": id }))?);
        if let Some(previous) = self
            .replay::<PublishOutcome>(key.as_ref(), OperationKind::Publish, &hash)
            .await?
        {
            info!(
                event_name = "rfq.publish_replayed",
                correlation_id = %ctx.correlation_id,
                rfq_id = %id,
                "publish replayed from idempotency record"
            );
            return publish_result(previous);
        }

        let mut rfq = self.get_rfq(id).await?;
        let suppliers = self.collaborators.suppliers.list_suppliers().await?;
        let response_count = self.stores.responses.count_for_rfq(&rfq.id).await?;
        let today = Utc::now().date_naive();
        let flow_context = FlowContext::for_rfq(&rfq, &suppliers, response_count, today);

        let transition = self
            .flow
            .apply_with_audit(
                &rfq.status,
                &FlowEvent::PublishRequested,
                &flow_context,
                self.collaborators.audit.as_ref(),
                &ctx.audit(&rfq.id),
            )
            .map_err(DomainError::from)?;

        let contacts = resolve_contacts(&rfq, &suppliers)?;
        let project = self.existing_project(&rfq.project_id).await?;
        let summary = self.renderer.compose_summary(&rfq, &project)?;

        let expected_version = rfq.version;
        rfq.transition_to(transition.to)?;
        rfq.updated_at = Utc::now();
        let published = self.stores.rfqs.save(rfq, expected_version).await?;
        info!(
            event_name = "rfq.published",
            correlation_id = %ctx.correlation_id,
            rfq_id = %published.id,
            rfq_number = %published.number,
            recipients = contacts.len(),
            "rfq published"
        );

        let report = dispatch(self.collaborators.gateway.as_ref(), &summary, &contacts).await;
        self.log_dispatch(ctx, &published.id, &report).await;

        let outcome = PublishOutcome { rfq: published, dispatch: report };
        if let Some(key) = key {
            self.remember(ctx, key, OperationKind::Publish, &outcome.rfq.id, hash, &outcome)
                .await;
        }
        publish_result(outcome)
    }

    /// Re-sends the invitation to suppliers whose latest attempt failed or
    /// who were never attempted. Only published RFQs are eligible.
    pub async fn redispatch(
        &self,
        ctx: &RequestContext,
        id: &RfqId,
    ) -> Result<DispatchReport, ApplicationError> {
        let rfq = self.get_rfq(id).await?;
        if rfq.status != RfqStatus::Published {
            return Err(DomainError::validation(
                "status",
                format!(
                    "invitations can only be re-sent while published (currently {})",
                    rfq.status.as_str()
                ),
            )
            .into());
        }

        let latest = self.stores.notifications.latest_by_supplier(&rfq.id).await?;
        let pending = rfq
            .supplier_ids
            .iter()
            .filter(|supplier_id| {
                latest.get(*supplier_id).map(|attempt| !attempt.delivered).unwrap_or(true)
            })
            .cloned()
            .collect::<Vec<_>>();
        if pending.is_empty() {
            info!(
                event_name = "rfq.redispatch_skipped",
                correlation_id = %ctx.correlation_id,
                rfq_id = %rfq.id,
                "every invited supplier already received the invitation"
            );
            return Ok(DispatchReport::default());
        }

        let suppliers = self.collaborators.suppliers.list_suppliers().await?;
        let project = self.existing_project(&rfq.project_id).await?;
        let summary = self.renderer.compose_summary(&rfq, &project)?;
        let targets = Rfq { supplier_ids: pending, ..rfq.clone() };
        let contacts = resolve_contacts(&targets, &suppliers)?;

        let report = dispatch(self.collaborators.gateway.as_ref(), &summary, &contacts).await;
        self.log_dispatch(ctx, &rfq.id, &report).await;
        if report.all_delivered() {
            Ok(report)
        } else {
            Err(ApplicationError::Dispatch { rfq_id: rfq.id, report })
        }
    }

    /// Published -> Closed. An open bidding window or a missing response
    /// produces warnings, never a rejection.
    pub async fn close(
        &self,
        ctx: &RequestContext,
        id: &RfqId,
    ) -> Result<CloseOutcome, ApplicationError> {
        let mut rfq = self.get_rfq(id).await?;
        let response_count = self.stores.responses.count_for_rfq(&rfq.id).await?;
        let flow_context = FlowContext {
            missing_required_fields: Vec::new(),
            bidding_open: rfq.bidding_open_on(Utc::now().date_naive()),
            response_count,
        };

        let transition = self
            .flow
            .apply_with_audit(
                &rfq.status,
                &FlowEvent::CloseRequested,
                &flow_context,
                self.collaborators.audit.as_ref(),
                &ctx.audit(&rfq.id),
            )
            .map_err(DomainError::from)?;
        let warnings = transition.warnings(&rfq);

        let expected_version = rfq.version;
        rfq.transition_to(transition.to)?;
        rfq.updated_at = Utc::now();
        let closed = self.stores.rfqs.save(rfq, expected_version).await?;
        info!(
            event_name = "rfq.closed",
            correlation_id = %ctx.correlation_id,
            rfq_id = %closed.id,
            responses = response_count,
            warnings = warnings.len(),
            "rfq closed"
        );
        Ok(CloseOutcome { rfq: closed, warnings })
    }

    pub async fn submit_response(
        &self,
        ctx: &RequestContext,
        id: &RfqId,
        submission: ResponseSubmission,
    ) -> Result<SupplierResponse, ApplicationError> {
        let rfq = self.get_rfq(id).await?;
        let response = build_response(&rfq, submission, Utc::now())?;
        self.stores.responses.append(response.clone()).await?;

        info!(
            event_name = "response.submitted",
            correlation_id = %ctx.correlation_id,
            rfq_id = %rfq.id,
            supplier_id = %response.supplier_id,
            response_id = %response.id.0,
            quotes = response.quotes.len(),
            "supplier response recorded"
        );
        self.collaborators.audit.emit(
            ctx.audit(&rfq.id)
                .event("response.submitted", AuditCategory::Responses, AuditOutcome::Success)
                .with_metadata("supplier_id", response.supplier_id.0.clone())
                .with_metadata("response_id", response.id.0.clone()),
        );
        Ok(response)
    }

    pub async fn list_responses(
        &self,
        id: &RfqId,
    ) -> Result<Vec<SupplierResponse>, ApplicationError> {
        let rfq = self.get_rfq(id).await?;
        Ok(self.stores.responses.list_for_rfq(&rfq.id).await?)
    }

    /// Totals of one response, rounded for display.
    pub async fn settlement(
        &self,
        id: &RfqId,
        response_id: &ResponseId,
    ) -> Result<Settlement, ApplicationError> {
        let rfq = self.get_rfq(id).await?;
        let response = self
            .stores
            .responses
            .find_by_id(response_id)
            .await?
            .filter(|response| response.rfq_id == rfq.id)
            .ok_or_else(|| ApplicationError::not_found("response", response_id.0.clone()))?;
        Ok(self.aggregator.settle(&rfq, &response)?.rounded())
    }

    pub async fn comparison(&self, id: &RfqId) -> Result<ResponseComparison, ApplicationError> {
        let rfq = self.get_rfq(id).await?;
        let responses = self.stores.responses.list_for_rfq(&rfq.id).await?;
        Ok(compare_responses(&rfq, &responses)?)
    }

    /// Every material line of every RFQ, by status then project name.
    pub async fn status_board(&self) -> Result<StatusBoard, ApplicationError> {
        let rfqs = self.stores.rfqs.list_all().await?;
        let project_ids = rfqs.iter().map(|rfq| rfq.project_id.clone()).collect::<BTreeSet<_>>();

        let mut project_names = HashMap::new();
        for project_id in project_ids {
            if let Some(project) = self.collaborators.projects.get_project(&project_id).await? {
                project_names.insert(project_id, project.name);
            }
        }

        Ok(tracker::group_by_status_then_project(tracker::track_lines(&rfqs, &project_names)))
    }

    /// Moves one line between status buckets. A line already in `to` is a
    /// no-op; a line found in neither `from` nor `to` is a conflict.
    pub async fn move_status(
        &self,
        ctx: &RequestContext,
        request: MoveStatusRequest,
        key: Option<OperationKey>,
    ) -> Result<MoveStatusOutcome, ApplicationError> {
        let hash = payload_hash(&request_payload(&request)?);
        if let Some(previous) = self
            .replay::<MoveStatusOutcome>(key.as_ref(), OperationKind::MoveStatus, &hash)
            .await?
        {
            return Ok(previous);
        }

        let mut rfq = self.get_rfq(&request.rfq_id).await?;
        let expected_version = rfq.version;
        let moved = tracker::move_status(
            &mut rfq,
            &request.line_id,
            request.from,
            request.to,
            &ctx.actor,
            Utc::now(),
        )
        .map_err(|error| match error {
            conflict @ DomainError::StatusConflict { .. } => {
                ApplicationError::Conflict(conflict.to_string())
            }
            other => ApplicationError::Domain(other),
        })?;

        let (rfq, change) = match moved {
            MoveOutcome::Moved(change) => {
                let saved = self
                    .stores
                    .rfqs
                    .save_with_status_change(rfq, expected_version, change.clone())
                    .await?;
                info!(
                    event_name = "material.status_moved",
                    correlation_id = %ctx.correlation_id,
                    rfq_id = %saved.id,
                    line_id = %change.line_id.0,
                    from = change.from.as_str(),
                    to = change.to.as_str(),
                    "material line status moved"
                );
                self.collaborators.audit.emit(
                    ctx.audit(&saved.id)
                        .event("material.status_moved", AuditCategory::Materials, AuditOutcome::Success)
                        .with_metadata("line_id", change.line_id.0.clone())
                        .with_metadata("from", change.from.as_str())
                        .with_metadata("to", change.to.as_str()),
                );
                (saved, Some(change))
            }
            MoveOutcome::Unchanged => (rfq, None),
        };

        let line = rfq
            .materials
            .iter()
            .find(|line| line.id == request.line_id)
            .cloned()
            .ok_or_else(|| ApplicationError::not_found("material line", request.line_id.0.clone()))?;
        let outcome =
            MoveStatusOutcome { changed: change.is_some(), rfq_id: rfq.id.clone(), line, change };
        if let Some(key) = key {
            self.remember(ctx, key, OperationKind::MoveStatus, &rfq.id, hash, &outcome).await;
        }
        Ok(outcome)
    }

    pub async fn status_history(
        &self,
        line_id: &MaterialLineId,
    ) -> Result<Vec<MaterialStatusChange>, ApplicationError> {
        Ok(self.stores.rfqs.list_status_history(line_id).await?)
    }

    async fn mutate_rfq<T, F>(&self, id: &RfqId, mutate: F) -> Result<(Rfq, T), ApplicationError>
    where
        F: FnOnce(&mut Rfq, DateTime<Utc>) -> Result<T, DomainError>,
    {
        let mut rfq = self.get_rfq(id).await?;
        let expected_version = rfq.version;
        let value = mutate(&mut rfq, Utc::now())?;
        let saved = self.stores.rfqs.save(rfq, expected_version).await?;
        Ok((saved, value))
    }

    async fn existing_project(&self, project_id: &ProjectId) -> Result<Project, ApplicationError> {
        self.collaborators.projects.get_project(project_id).await?.ok_or_else(|| {
            DomainError::validation(
                "projectId",
                format!("project `{}` does not exist", project_id.0),
            )
            .into()
        })
    }

    async fn log_dispatch(
        &self,
        ctx: &RequestContext,
        rfq_id: &RfqId,
        report: &DispatchReport,
    ) {
        if let Err(error) = self
            .stores
            .notifications
            .record_attempts(NotificationAttempt::from_report(rfq_id, report, Utc::now()))
            .await
        {
            warn!(
                event_name = "rfq.dispatch_log_failed",
                correlation_id = %ctx.correlation_id,
                rfq_id = %rfq_id,
                error = %error,
                "delivery attempts were sent but could not be recorded"
            );
        }

        let outcome = if report.all_delivered() { AuditOutcome::Success } else { AuditOutcome::Failed };
        self.collaborators.audit.emit(
            ctx.audit(rfq_id)
                .event("rfq.invitations_dispatched", AuditCategory::Notification, outcome)
                .with_metadata("recipients", report.deliveries.len().to_string())
                .with_metadata("failed", report.failed_count().to_string()),
        );
        if !report.all_delivered() {
            let failed = report
                .failed_suppliers()
                .iter()
                .map(|supplier_id| supplier_id.0.as_str())
                .collect::<Vec<_>>()
                .join(",");
            warn!(
                event_name = "rfq.dispatch_failed",
                correlation_id = %ctx.correlation_id,
                rfq_id = %rfq_id,
                failed_suppliers = %failed,
                failed = report.failed_count(),
                recipients = report.deliveries.len(),
                "some invitations could not be delivered"
            );
        }
    }

    /// Stored result for `key`, if the same request already ran under it.
    async fn replay<T>(
        &self,
        key: Option<&OperationKey>,
        kind: OperationKind,
        hash: &str,
    ) -> Result<Option<T>, ApplicationError>
    where
        T: DeserializeOwned,
    {
        let Some(key) = key else {
            return Ok(None);
        };
        let Some(record) = self.stores.idempotency.find_operation(key).await? else {
            return Ok(None);
        };
        if record.operation_kind != kind || record.payload_hash != hash {
            return Err(ApplicationError::Conflict(format!(
                "idempotency key `{}` was already used for a different request",
                key.0
            )));
        }
        serde_json::from_str(&record.result_json).map(Some).map_err(|error| {
            ApplicationError::Persistence(format!("stored result for `{}` is unreadable: {error}", key.0))
        })
    }

    /// Stores the outcome under `key`. Runs after the change is committed, so
    /// a failure here only costs the replay and is logged instead of returned.
    async fn remember<T>(
        &self,
        ctx: &RequestContext,
        key: OperationKey,
        kind: OperationKind,
        rfq_id: &RfqId,
        hash: String,
        result: &T,
    ) where
        T: Serialize,
    {
        let saved = match serde_json::to_string(result) {
            Ok(result_json) => self
                .stores
                .idempotency
                .save_operation(IdempotencyRecord {
                    operation_key: key.clone(),
                    rfq_id: rfq_id.clone(),
                    operation_kind: kind,
                    payload_hash: hash,
                    result_json,
                    correlation_id: ctx.correlation_id.clone(),
                    created_at: Utc::now(),
                })
                .await
                .map_err(|error| error.to_string()),
            Err(error) => Err(format!("encode operation result: {error}")),
        };
        if let Err(error) = saved {
            warn!(
                event_name = "idempotency.record_failed",
                correlation_id = %ctx.correlation_id,
                rfq_id = %rfq_id,
                operation_key = %key.0,
                error = %error,
                "operation applied but its idempotency record was not stored"
            );
        }
    }
}

fn request_payload<T: Serialize>(payload: &T) -> Result<String, ApplicationError> {
    serde_json::to_string(payload)
        .map_err(|error| ApplicationError::Persistence(format!("encode request payload: {error}")))
}

fn publish_result(outcome: PublishOutcome) -> Result<PublishOutcome, ApplicationError> {
    if outcome.dispatch.all_delivered() {
        Ok(outcome)
    } else {
        Err(ApplicationError::Dispatch { rfq_id: outcome.rfq.id, report: outcome.dispatch })
    }
}
