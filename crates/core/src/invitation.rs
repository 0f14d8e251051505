//! Supplier invitation text and per-recipient dispatch.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;

use crate::domain::party::{Project, Supplier, SupplierId};
use crate::domain::rfq::Rfq;
use crate::errors::{ApplicationError, DomainError};

const TEMPLATE_NAME: &str = "rfq_invitation.txt";
const TEMPLATE: &str = "\
RFQ {{ rfq_number }} - {{ project_name }}

Project: {{ project_name }}
Delivery location: {{ delivery_location }}
Bidding window: {{ bidding_start }} to {{ bidding_end }}
Delivery date: {{ delivery_date }}

Materials ({{ materials | length }}):
{% for line in materials -%}
{{ loop.index }}. {{ line.name }} | {{ line.quantity }} {{ line.unit }} | deliver by {{ line.delivery_date }}
{% endfor %}
Terms: {{ terms }}

Submit your quotation: {{ link }}
";
const MATERIALS_HEADER: &str = "Materials (";
const UNSET: &str = "-";

#[derive(Debug, Error)]
pub enum InvitationError {
    #[error("invitation template failed: {0}")]
    Template(String),
}

impl From<InvitationError> for ApplicationError {
    fn from(error: InvitationError) -> Self {
        ApplicationError::Integration(error.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfqSummary {
    pub subject: String,
    pub body: String,
    pub link: String,
}

#[derive(Serialize)]
struct SummaryLine {
    name: String,
    quantity: String,
    unit: String,
    delivery_date: String,
}

/// Renders invitation text with an embedded template. Build once and share.
pub struct SummaryRenderer {
    tera: Tera,
    response_base_url: String,
}

impl SummaryRenderer {
    pub fn new(response_base_url: &str) -> Result<Self, InvitationError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
            .map_err(|error| InvitationError::Template(error.to_string()))?;
        Ok(Self { tera, response_base_url: response_base_url.trim_end_matches('/').to_owned() })
    }

    pub fn response_link(&self, rfq: &Rfq) -> String {
        format!("{}/rfq/{}/respond", self.response_base_url, rfq.id)
    }

    /// Deterministic for a given RFQ and project: no clock, no randomness.
    pub fn compose_summary(&self, rfq: &Rfq, project: &Project) -> Result<RfqSummary, InvitationError> {
        let link = self.response_link(rfq);
        let location = if rfq.delivery_location.trim().is_empty() {
            project.delivery_location.as_str()
        } else {
            rfq.delivery_location.as_str()
        };
        let materials = rfq
            .materials
            .iter()
            .map(|line| SummaryLine {
                name: line.material.name.clone(),
                quantity: quantity_text(line.quantity),
                unit: line.material.unit.clone(),
                delivery_date: date_text(line.delivery_date.or(rfq.delivery_date)),
            })
            .collect::<Vec<_>>();

        let mut context = Context::new();
        context.insert("rfq_number", &rfq.number.to_string());
        context.insert("project_name", &project.name);
        context.insert("delivery_location", or_unset(location));
        context.insert("bidding_start", &date_text(rfq.bidding_start));
        context.insert("bidding_end", &date_text(rfq.bidding_end));
        context.insert("delivery_date", &date_text(rfq.delivery_date));
        context.insert("materials", &materials);
        context.insert("terms", or_unset(rfq.terms.trim()));
        context.insert("link", &link);

        let body = self
            .tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|error| InvitationError::Template(error.to_string()))?;

        Ok(RfqSummary {
            subject: format!("Request for quotation {} - {}", rfq.number, project.name),
            body,
            link,
        })
    }
}

/// Reads the material count back out of a rendered summary body.
pub fn parse_material_count(body: &str) -> Option<usize> {
    body.lines()
        .find_map(|line| line.strip_prefix(MATERIALS_HEADER))
        .and_then(|rest| rest.split_once(')'))
        .and_then(|(count, _)| count.trim().parse().ok())
}

fn quantity_text(quantity: Decimal) -> String {
    quantity.normalize().to_string()
}

fn date_text(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%Y-%m-%d").to_string()).unwrap_or_else(|| UNSET.to_owned())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        UNSET
    } else {
        value
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierContact {
    pub supplier_id: SupplierId,
    pub email: String,
}

/// Resolves a deliverable address for every invited supplier. Any supplier
/// that is unknown or lacks a well-formed email fails the whole call.
pub fn resolve_contacts(rfq: &Rfq, suppliers: &[Supplier]) -> Result<Vec<SupplierContact>, DomainError> {
    rfq.supplier_ids
        .iter()
        .map(|supplier_id| {
            let supplier = suppliers
                .iter()
                .find(|supplier| &supplier.id == supplier_id)
                .ok_or_else(|| {
                    DomainError::validation(format!("suppliers[{supplier_id}]"), "unknown supplier")
                })?;
            let email = supplier.contact_email().ok_or_else(|| {
                DomainError::validation(
                    format!("suppliers[{supplier_id}].email"),
                    "missing or malformed email address",
                )
            })?;
            Ok(SupplierContact { supplier_id: supplier_id.clone(), email: email.to_owned() })
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    pub link: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("recipient `{recipient}` rejected: {reason}")]
    Rejected { recipient: String, reason: String },
    #[error("notification transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotificationError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    pub supplier_id: SupplierId,
    pub email: String,
    pub delivered: bool,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(supplier_id: SupplierId, email: impl Into<String>) -> Self {
        Self { supplier_id, email: email.into(), delivered: true, error: None }
    }

    pub fn failed(supplier_id: SupplierId, email: impl Into<String>, error: impl Into<String>) -> Self {
        Self { supplier_id, email: email.into(), delivered: false, error: Some(error.into()) }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub deliveries: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    pub fn failed_count(&self) -> usize {
        self.deliveries.iter().filter(|outcome| !outcome.delivered).count()
    }

    pub fn all_delivered(&self) -> bool {
        self.failed_count() == 0
    }

    pub fn failed_suppliers(&self) -> Vec<SupplierId> {
        self.deliveries
            .iter()
            .filter(|outcome| !outcome.delivered)
            .map(|outcome| outcome.supplier_id.clone())
            .collect()
    }
}

/// Sends `summary` to each contact once, in order. One recipient failing
/// does not stop delivery to the rest.
pub async fn dispatch(
    gateway: &dyn NotificationGateway,
    summary: &RfqSummary,
    contacts: &[SupplierContact],
) -> DispatchReport {
    let mut deliveries = Vec::with_capacity(contacts.len());
    for contact in contacts {
        let message = OutboundMessage {
            recipient_email: contact.email.clone(),
            subject: summary.subject.clone(),
            body: summary.body.clone(),
            link: summary.link.clone(),
        };
        let outcome = match gateway.deliver(&message).await {
            Ok(()) => DeliveryOutcome::delivered(contact.supplier_id.clone(), &contact.email),
            Err(error) => {
                DeliveryOutcome::failed(contact.supplier_id.clone(), &contact.email, error.to_string())
            }
        };
        deliveries.push(outcome);
    }
    DispatchReport { deliveries }
}

/// Captures messages instead of sending them. Addresses registered with
/// [`RecordingGateway::fail_for`] are rejected.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingGateway {
    pub fn fail_for(&self, email: impl Into<String>) {
        match self.failing.lock() {
            Ok(mut failing) => failing.insert(email.into()),
            Err(poisoned) => poisoned.into_inner().insert(email.into()),
        };
    }

    pub fn recover(&self, email: &str) {
        match self.failing.lock() {
            Ok(mut failing) => failing.remove(email),
            Err(poisoned) => poisoned.into_inner().remove(email),
        };
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), NotificationError> {
        let rejected = match self.failing.lock() {
            Ok(failing) => failing.contains(&message.recipient_email),
            Err(poisoned) => poisoned.into_inner().contains(&message.recipient_email),
        };
        if rejected {
            return Err(NotificationError::Rejected {
                recipient: message.recipient_email.clone(),
                reason: "mailbox unavailable".to_owned(),
            });
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(message.clone()),
            Err(poisoned) => poisoned.into_inner().push(message.clone()),
        }
        Ok(())
    }
}
