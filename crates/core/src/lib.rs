pub mod audit;
pub mod collaborators;
pub mod collector;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod invitation;
pub mod registry;
pub mod settlement;
pub mod tracker;

pub use collaborators::{CatalogDirectory, InMemoryDirectory, ProjectDirectory, SupplierDirectory};
pub use collector::{build_response, ResponseSubmission};
pub use domain::idempotency::{IdempotencyRecord, OperationKey, OperationKind};
pub use domain::material::{
    MaterialLine, MaterialLineId, MaterialRef, MaterialStatus, MaterialStatusChange,
};
pub use domain::party::{MaterialSummary, Project, ProjectId, Supplier, SupplierId};
pub use domain::response::{LineQuote, ResponseId, ResponseStatus, SupplierResponse};
pub use domain::rfq::{Rfq, RfqId, RfqNumber, RfqPatch, RfqStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FlowEngine, FlowTransitionError, RfqLifecycle};
pub use invitation::{
    DeliveryOutcome, DispatchReport, NotificationError, NotificationGateway, OutboundMessage,
    RecordingGateway, RfqSummary, SummaryRenderer, SupplierContact,
};
pub use registry::{MaterialLinePatch, MaterialLineRegistry, NewMaterialLine};
pub use settlement::{compare_responses, settle_response, ResponseComparison, Settlement};
pub use tracker::{MoveOutcome, StatusBoard, TrackedLine};
