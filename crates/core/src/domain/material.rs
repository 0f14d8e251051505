use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::rfq::RfqId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialLineId(pub String);

impl MaterialLineId {
    pub fn generate() -> Self {
        Self(format!("ML-{}", Uuid::new_v4().simple()))
    }
}

/// Request-status bucket of a single material line. Independent of the owning
/// RFQ's lifecycle status; any bucket may move to any other.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    #[default]
    Pending,
    Approved,
    Ordered,
    Rejected,
}

impl MaterialStatus {
    pub const ALL: [MaterialStatus; 4] =
        [Self::Pending, Self::Approved, Self::Ordered, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Ordered => "ordered",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "ordered" => Some(Self::Ordered),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for MaterialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRef {
    /// Catalog identifier when the line was picked from the catalog.
    pub material_id: Option<String>,
    pub name: String,
    pub unit: String,
    pub hsn_code: Option<String>,
}

impl MaterialRef {
    /// Identity used for duplicate detection within one RFQ: the catalog id
    /// when present, otherwise the normalized name and unit.
    pub fn identity_key(&self) -> String {
        match &self.material_id {
            Some(id) if !id.trim().is_empty() => format!("id:{}", id.trim()),
            _ => format!(
                "name:{}|{}",
                self.name.trim().to_lowercase(),
                self.unit.trim().to_lowercase()
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialLine {
    pub id: MaterialLineId,
    pub material: MaterialRef,
    pub quantity: Decimal,
    pub delivery_date: Option<NaiveDate>,
    pub status: MaterialStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialStatusChange {
    pub rfq_id: RfqId,
    pub line_id: MaterialLineId,
    pub from: MaterialStatus,
    pub to: MaterialStatus,
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{MaterialRef, MaterialStatus};

    #[test]
    fn material_status_round_trips_from_storage_encoding() {
        for status in MaterialStatus::ALL {
            assert_eq!(MaterialStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MaterialStatus::parse("shipped"), None);
    }

    #[test]
    fn identity_prefers_catalog_id_over_name() {
        let by_id = MaterialRef {
            material_id: Some("CAT-PLY-18".to_string()),
            name: "Plywood 18mm".to_string(),
            unit: "sheet".to_string(),
            hsn_code: None,
        };
        let renamed = MaterialRef { name: "Marine ply".to_string(), ..by_id.clone() };
        assert_eq!(by_id.identity_key(), renamed.identity_key());

        let free_text = MaterialRef {
            material_id: None,
            name: " Plywood 18MM ".to_string(),
            unit: "Sheet".to_string(),
            hsn_code: None,
        };
        assert_eq!(free_text.identity_key(), "name:plywood 18mm|sheet");
    }
}
