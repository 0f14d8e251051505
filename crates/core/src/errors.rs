use thiserror::Error;

use crate::domain::material::MaterialStatus;
use crate::domain::rfq::{RfqId, RfqStatus};
use crate::flows::FlowTransitionError;
use crate::invitation::DispatchReport;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid RFQ transition from {from:?} to {to:?}")]
    InvalidTransition { from: RfqStatus, to: RfqStatus },
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("invalid `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("duplicate `{field}`: {value}")]
    Duplicate { field: String, value: String },
    #[error("material line `{line_id}` is {actual}, not {expected}")]
    StatusConflict { line_id: String, expected: MaterialStatus, actual: MaterialStatus },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(
        "RFQ `{rfq_id}` was published but {} of {} invitation(s) failed",
        .report.failed_count(),
        .report.deliveries.len()
    )]
    Dispatch { rfq_id: RfqId, report: DispatchReport },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("dispatch failed: {message}")]
    DispatchFailed { message: String, correlation_id: String, report: DispatchReport },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested record does not exist.",
            Self::Conflict { .. } => {
                "The record was changed by another request. Reload it and try again."
            }
            Self::DispatchFailed { .. } => {
                "The RFQ was published, but some suppliers may not have been notified. Retry the dispatch."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::DispatchFailed { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::DispatchFailed { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned() }
            }
            error @ ApplicationError::NotFound { .. } => {
                Self::NotFound { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Conflict(message) => {
                Self::Conflict { message, correlation_id: unassigned() }
            }
            error @ ApplicationError::Dispatch { .. } => {
                let message = error.to_string();
                let ApplicationError::Dispatch { report, .. } = error else {
                    unreachable!("matched dispatch variant above")
                };
                Self::DispatchFailed { message, correlation_id: unassigned(), report }
            }
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::party::SupplierId;
    use crate::domain::rfq::RfqId;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::invitation::{DeliveryOutcome, DispatchReport};

    #[test]
    fn validation_error_maps_to_bad_request_naming_the_field() {
        let interface = ApplicationError::from(DomainError::validation("biddingEnd", "missing"))
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref message, ref correlation_id }
                if correlation_id == "req-1" && message.contains("biddingEnd")
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn not_found_and_conflict_keep_their_own_classes() {
        let missing = ApplicationError::not_found("rfq", "RFQ-404").into_interface("req-2");
        assert!(matches!(missing, InterfaceError::NotFound { .. }));
        assert!(missing.to_string().contains("RFQ-404"));

        let conflict =
            ApplicationError::Conflict("rfq version moved".to_owned()).into_interface("req-3");
        assert!(matches!(conflict, InterfaceError::Conflict { .. }));
        assert_eq!(conflict.correlation_id(), "req-3");
    }

    #[test]
    fn dispatch_failure_is_distinct_from_validation_failure() {
        let report = DispatchReport {
            deliveries: vec![
                DeliveryOutcome::delivered(SupplierId("SUP-1".to_owned()), "a@timber.in"),
                DeliveryOutcome::failed(SupplierId("SUP-2".to_owned()), "b@steel.in", "smtp 550"),
            ],
        };
        let interface =
            ApplicationError::Dispatch { rfq_id: RfqId("RFQ-1".to_owned()), report: report.clone() }
                .into_interface("req-4");

        match interface {
            InterfaceError::DispatchFailed { ref message, report: ref carried, .. } => {
                assert!(message.contains("1 of 2"));
                assert_eq!(carried, &report);
            }
            other => panic!("expected dispatch failure, got {other:?}"),
        }
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-5");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("invalid webhook url".to_owned()).into_interface("req-6");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
