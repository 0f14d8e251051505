//! JSON API over [`ProcurementService`].
//!
//! Endpoints:
//! - `GET    /api/v1/materials?category=&search=`                 catalog lookup
//! - `POST   /api/v1/rfqs`                                        create draft
//! - `GET    /api/v1/rfqs?projectId=`                             list RFQs
//! - `GET    /api/v1/rfqs/{id}`                                   read
//! - `PATCH  /api/v1/rfqs/{id}`                                   update
//! - `DELETE /api/v1/rfqs/{id}?force=true`                        delete
//! - `POST   /api/v1/rfqs/{id}/materials`                         add lines
//! - `PUT    /api/v1/rfqs/{id}/materials/delivery-date`           bulk delivery date
//! - `PATCH  /api/v1/rfqs/{id}/materials/{index}`                 update line
//! - `DELETE /api/v1/rfqs/{id}/materials/{index}`                 remove line
//! - `GET    /api/v1/rfqs/{id}/summary`                           invitation preview
//! - `POST   /api/v1/rfqs/{id}/publish`                           publish (Idempotency-Key)
//! - `POST   /api/v1/rfqs/{id}/dispatch`                          retry failed invitations
//! - `POST   /api/v1/rfqs/{id}/close`                             close
//! - `POST   /api/v1/rfqs/{id}/responses`                         submit response
//! - `GET    /api/v1/rfqs/{id}/responses`                         list responses
//! - `GET    /api/v1/rfqs/{id}/responses/{response_id}/settlement` settle one response
//! - `GET    /api/v1/rfqs/{id}/comparison`                        compare responses
//! - `GET    /api/v1/material-requests`                           status board
//! - `POST   /api/v1/material-requests/move`                      move status (Idempotency-Key)
//! - `GET    /api/v1/material-lines/{line_id}/history`            status history

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use rfqdesk_core::collector::ResponseSubmission;
use rfqdesk_core::domain::idempotency::OperationKey;
use rfqdesk_core::domain::material::{MaterialLineId, MaterialStatusChange};
use rfqdesk_core::domain::party::{MaterialSummary, ProjectId};
use rfqdesk_core::domain::response::{ResponseId, SupplierResponse};
use rfqdesk_core::domain::rfq::{Rfq, RfqId, RfqPatch};
use rfqdesk_core::errors::{ApplicationError, InterfaceError};
use rfqdesk_core::invitation::{DispatchReport, RfqSummary};
use rfqdesk_core::registry::{MaterialLinePatch, NewMaterialLine};
use rfqdesk_core::settlement::{ResponseComparison, Settlement};
use rfqdesk_core::tracker::StatusBoard;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::procurement::{
    CloseOutcome, CreateRfqRequest, MoveStatusOutcome, MoveStatusRequest, ProcurementService,
    PublishOutcome, RequestContext,
};

pub const CORRELATION_HEADER: &str = "x-correlation-id";
pub const ACTOR_HEADER: &str = "x-actor";
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

#[derive(Clone)]
pub struct ApiState {
    service: Arc<ProcurementService>,
}

impl ApiState {
    pub fn new(service: Arc<ProcurementService>) -> Self {
        Self { service }
    }
}

pub fn router(service: Arc<ProcurementService>) -> Router {
    Router::new()
        .route("/api/v1/materials", get(list_materials))
        .route("/api/v1/rfqs", post(create_rfq).get(list_rfqs))
        .route("/api/v1/rfqs/{id}", get(get_rfq).patch(update_rfq).delete(delete_rfq))
        .route("/api/v1/rfqs/{id}/materials", post(add_lines))
        .route("/api/v1/rfqs/{id}/materials/delivery-date", put(set_delivery_date))
        .route("/api/v1/rfqs/{id}/materials/{index}", patch(update_line).delete(remove_line))
        .route("/api/v1/rfqs/{id}/summary", get(summary))
        .route("/api/v1/rfqs/{id}/publish", post(publish))
        .route("/api/v1/rfqs/{id}/dispatch", post(redispatch))
        .route("/api/v1/rfqs/{id}/close", post(close))
        .route("/api/v1/rfqs/{id}/responses", post(submit_response).get(list_responses))
        .route("/api/v1/rfqs/{id}/responses/{response_id}/settlement", get(settlement))
        .route("/api/v1/rfqs/{id}/comparison", get(comparison))
        .route("/api/v1/material-requests", get(status_board))
        .route("/api/v1/material-requests/move", post(move_status))
        .route("/api/v1/material-lines/{line_id}/history", get(status_history))
        .with_state(ApiState::new(service))
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct MaterialsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRfqsQuery {
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddLinesRequest {
    pub materials: Vec<NewMaterialLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeliveryDateRequest {
    pub delivery_date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub user_message: &'static str,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<DispatchReport>,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn from_application(error: ApplicationError, ctx: &RequestContext) -> Self {
        Self(error.into_interface(ctx.correlation_id.clone()))
    }

    fn bad_body(rejection: JsonRejection, ctx: &RequestContext) -> Self {
        Self(InterfaceError::BadRequest {
            message: rejection.body_text(),
            correlation_id: ctx.correlation_id.clone(),
        })
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::DispatchFailed { .. } => StatusCode::BAD_GATEWAY,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (error, message, report) = match &self.0 {
            InterfaceError::BadRequest { message, .. } => ("bad_request", message, None),
            InterfaceError::NotFound { message, .. } => ("not_found", message, None),
            InterfaceError::Conflict { message, .. } => ("conflict", message, None),
            InterfaceError::DispatchFailed { message, report, .. } => {
                ("dispatch_failed", message, Some(report.clone()))
            }
            InterfaceError::ServiceUnavailable { message, .. } => {
                ("service_unavailable", message, None)
            }
            InterfaceError::Internal { message, .. } => ("internal", message, None),
        };
        ErrorBody {
            error,
            message: message.clone(),
            user_message: self.0.user_message(),
            correlation_id: self.0.correlation_id().to_owned(),
            published: report.as_ref().map(|_| true),
            report,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            error!(
                event_name = "api.request_failed",
                correlation_id = %body.correlation_id,
                status = status.as_u16(),
                error = %body.message,
                "request failed"
            );
        } else {
            warn!(
                event_name = "api.request_rejected",
                correlation_id = %body.correlation_id,
                status = status.as_u16(),
                error = %body.message,
                "request rejected"
            );
        }
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn request_context(headers: &HeaderMap) -> RequestContext {
    let actor = header_value(headers, ACTOR_HEADER).unwrap_or_else(|| "anonymous".to_owned());
    match header_value(headers, CORRELATION_HEADER) {
        Some(correlation_id) => RequestContext::new(correlation_id, actor),
        None => RequestContext::generated(actor),
    }
}

fn operation_key(headers: &HeaderMap) -> Option<OperationKey> {
    header_value(headers, IDEMPOTENCY_HEADER).map(OperationKey)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>, ctx: &RequestContext) -> ApiResult<T> {
    payload.map(|Json(value)| value).map_err(|rejection| ApiError::bad_body(rejection, ctx))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn list_materials(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<MaterialsQuery>,
) -> ApiResult<Json<Vec<MaterialSummary>>> {
    let ctx = request_context(&headers);
    state
        .service
        .list_materials(query.category.as_deref(), query.search.as_deref())
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn create_rfq(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<CreateRfqRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Rfq>)> {
    let ctx = request_context(&headers);
    let request = body(payload, &ctx)?;
    let rfq = state
        .service
        .create_draft(&ctx, request)
        .await
        .map_err(|error| ApiError::from_application(error, &ctx))?;
    Ok((StatusCode::CREATED, Json(rfq)))
}

pub async fn list_rfqs(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<ListRfqsQuery>,
) -> ApiResult<Json<Vec<Rfq>>> {
    let ctx = request_context(&headers);
    let project_id = query.project_id.filter(|id| !id.trim().is_empty()).map(ProjectId);
    state
        .service
        .list_rfqs(project_id.as_ref())
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn get_rfq(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Rfq>> {
    let ctx = request_context(&headers);
    state
        .service
        .get_rfq(&RfqId(id))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn update_rfq(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<RfqPatch>, JsonRejection>,
) -> ApiResult<Json<Rfq>> {
    let ctx = request_context(&headers);
    let patch = body(payload, &ctx)?;
    state
        .service
        .update_rfq(&ctx, &RfqId(id), patch)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn delete_rfq(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<StatusCode> {
    let ctx = request_context(&headers);
    state
        .service
        .delete_rfq(&ctx, &RfqId(id), query.force)
        .await
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn add_lines(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<AddLinesRequest>, JsonRejection>,
) -> ApiResult<Json<Rfq>> {
    let ctx = request_context(&headers);
    let request = body(payload, &ctx)?;
    state
        .service
        .add_lines(&ctx, &RfqId(id), request.materials)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn update_line(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((id, index)): Path<(String, usize)>,
    payload: Result<Json<MaterialLinePatch>, JsonRejection>,
) -> ApiResult<Json<Rfq>> {
    let ctx = request_context(&headers);
    let patch = body(payload, &ctx)?;
    state
        .service
        .update_line(&RfqId(id), index, patch)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn remove_line(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((id, index)): Path<(String, usize)>,
) -> ApiResult<Json<Rfq>> {
    let ctx = request_context(&headers);
    state
        .service
        .remove_line(&RfqId(id), index)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn set_delivery_date(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<DeliveryDateRequest>, JsonRejection>,
) -> ApiResult<Json<Rfq>> {
    let ctx = request_context(&headers);
    let request = body(payload, &ctx)?;
    state
        .service
        .set_delivery_date_for_all(&RfqId(id), request.delivery_date)
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn summary(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<RfqSummary>> {
    let ctx = request_context(&headers);
    state
        .service
        .summary(&RfqId(id))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn publish(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<PublishOutcome>> {
    let ctx = request_context(&headers);
    state
        .service
        .publish(&ctx, &RfqId(id), operation_key(&headers))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn redispatch(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<DispatchReport>> {
    let ctx = request_context(&headers);
    state
        .service
        .redispatch(&ctx, &RfqId(id))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn close(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<CloseOutcome>> {
    let ctx = request_context(&headers);
    state
        .service
        .close(&ctx, &RfqId(id))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn submit_response(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<ResponseSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SupplierResponse>)> {
    let ctx = request_context(&headers);
    let submission = body(payload, &ctx)?;
    let response = state
        .service
        .submit_response(&ctx, &RfqId(id), submission)
        .await
        .map_err(|error| ApiError::from_application(error, &ctx))?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_responses(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<SupplierResponse>>> {
    let ctx = request_context(&headers);
    state
        .service
        .list_responses(&RfqId(id))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn settlement(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((id, response_id)): Path<(String, String)>,
) -> ApiResult<Json<Settlement>> {
    let ctx = request_context(&headers);
    state
        .service
        .settlement(&RfqId(id), &ResponseId(response_id))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn comparison(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<ResponseComparison>> {
    let ctx = request_context(&headers);
    state
        .service
        .comparison(&RfqId(id))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn status_board(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<StatusBoard>> {
    let ctx = request_context(&headers);
    state
        .service
        .status_board()
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn move_status(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<MoveStatusRequest>, JsonRejection>,
) -> ApiResult<Json<MoveStatusOutcome>> {
    let ctx = request_context(&headers);
    let request = body(payload, &ctx)?;
    state
        .service
        .move_status(&ctx, request, operation_key(&headers))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

pub async fn status_history(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(line_id): Path<String>,
) -> ApiResult<Json<Vec<MaterialStatusChange>>> {
    let ctx = request_context(&headers);
    state
        .service
        .status_history(&MaterialLineId(line_id))
        .await
        .map(Json)
        .map_err(|error| ApiError::from_application(error, &ctx))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::{Path, State},
        http::{HeaderMap, HeaderValue, Request, StatusCode},
        Json,
    };
    use rfqdesk_core::domain::material::MaterialStatus;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{
        create_rfq, get_rfq, move_status, publish, router, status_board, ApiState,
        CORRELATION_HEADER,
    };
    use crate::procurement::tests::{harness, scenario_a};
    use crate::procurement::MoveStatusRequest;

    fn headers(correlation_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CORRELATION_HEADER, HeaderValue::from_str(correlation_id).expect("header"));
        headers
    }

    #[tokio::test]
    async fn create_then_read_round_trips_through_handlers() {
        let harness = harness();
        let state = ApiState::new(Arc::new(harness.service));

        let (status, Json(created)) = create_rfq(
            State(state.clone()),
            headers("req-create"),
            Ok(Json(scenario_a(&["SUP-TIMBER"]))),
        )
        .await
        .expect("create");
        let Json(fetched) =
            get_rfq(State(state), headers("req-read"), Path(created.id.0.clone())).await.expect("read");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn missing_rfq_is_not_found_with_the_caller_correlation_id() {
        let state = ApiState::new(Arc::new(harness().service));

        let error = get_rfq(State(state), headers("req-404"), Path("RFQ-missing".to_owned()))
            .await
            .expect_err("missing");

        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        let body = error.body();
        assert_eq!(body.error, "not_found");
        assert_eq!(body.correlation_id, "req-404");
        assert!(body.report.is_none());
    }

    #[tokio::test]
    async fn dispatch_failure_maps_to_bad_gateway_with_the_report() {
        let harness = harness();
        harness.gateway.fail_for("sales@steelmart.in");
        let state = ApiState::new(Arc::new(harness.service));
        let (_, Json(draft)) = create_rfq(
            State(state.clone()),
            HeaderMap::new(),
            Ok(Json(scenario_a(&["SUP-TIMBER", "SUP-STEEL"]))),
        )
        .await
        .expect("create");

        let error = publish(State(state.clone()), headers("req-pub"), Path(draft.id.0.clone()))
            .await
            .expect_err("dispatch failure");

        assert_eq!(error.status(), StatusCode::BAD_GATEWAY);
        let body = error.body();
        assert_eq!(body.published, Some(true));
        assert_eq!(body.report.map(|report| report.failed_count()), Some(1));

        let Json(stored) =
            get_rfq(State(state), HeaderMap::new(), Path(draft.id.0)).await.expect("read");
        assert_eq!(stored.status.as_str(), "published");
    }

    #[tokio::test]
    async fn stale_status_move_is_a_conflict_and_board_lists_every_bucket() {
        let state = ApiState::new(Arc::new(harness().service));
        let (_, Json(draft)) = create_rfq(
            State(state.clone()),
            HeaderMap::new(),
            Ok(Json(scenario_a(&["SUP-TIMBER"]))),
        )
        .await
        .expect("create");

        let error = move_status(
            State(state.clone()),
            headers("req-move"),
            Ok(Json(MoveStatusRequest {
                rfq_id: draft.id.clone(),
                line_id: draft.materials[0].id.clone(),
                from: MaterialStatus::Ordered,
                to: MaterialStatus::Approved,
            })),
        )
        .await
        .expect_err("conflict");
        assert_eq!(error.status(), StatusCode::CONFLICT);

        let Json(board) = status_board(State(state), HeaderMap::new()).await.expect("board");
        let encoded = serde_json::to_value(&board).expect("encode board");
        let keys = encoded
            .as_object()
            .map(|buckets| buckets.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        assert_eq!(keys, vec!["approved", "ordered", "pending", "rejected"]);
        assert_eq!(encoded["pending"]["Tower A Residences"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn router_rejects_unknown_fields_with_bad_request() {
        let app = router(Arc::new(harness().service));
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/rfqs")
            .header("content-type", "application/json")
            .header(CORRELATION_HEADER, "req-oneshot")
            .body(Body::from(r#"{"projectId":"PRJ-TOWER-A","colour":"red"}"#))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["error"], "bad_request");
        assert_eq!(body["correlationId"], "req-oneshot");
        assert!(body["message"].as_str().unwrap_or_default().contains("colour"));
    }

    #[tokio::test]
    async fn router_deletes_with_force_query() {
        let app = router(Arc::new(harness().service));
        let create = Request::builder()
            .method("POST")
            .uri("/api/v1/rfqs")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"projectId":"PRJ-TOWER-A"}"#))
            .expect("request");
        let response = app.clone().oneshot(create).await.expect("create response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let created: Value = serde_json::from_slice(&bytes).expect("json body");
        let id = created["id"].as_str().unwrap_or_default().to_owned();

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/rfqs/{id}?force=true"))
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(delete).await.expect("delete response");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
