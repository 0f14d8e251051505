use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::material::MaterialLineId;
use crate::domain::party::SupplierId;
use crate::domain::rfq::RfqId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseId(pub String);

impl ResponseId {
    pub fn generate() -> Self {
        Self(format!("RSP-{}", Uuid::new_v4().simple()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Submitted,
}

impl ResponseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitted" => Some(Self::Submitted),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LineQuote {
    pub line_id: MaterialLineId,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierResponse {
    pub id: ResponseId,
    pub rfq_id: RfqId,
    pub supplier_id: SupplierId,
    /// Assigned by the server at submission; never taken from the client.
    pub submitted_at: DateTime<Utc>,
    /// Percentage, e.g. `18` for 18%.
    pub tax_rate: Decimal,
    pub quotes: Vec<LineQuote>,
    pub status: ResponseStatus,
}

impl SupplierResponse {
    pub fn quote_for(&self, line_id: &MaterialLineId) -> Option<&LineQuote> {
        self.quotes.iter().find(|quote| &quote.line_id == line_id)
    }
}
