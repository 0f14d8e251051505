use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::material::MaterialLine;
use crate::domain::party::{ProjectId, SupplierId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RfqId(pub String);

impl RfqId {
    pub fn generate() -> Self {
        Self(format!("RFQ-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for RfqId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-facing sequential number, assigned by the store on creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RfqNumber(pub u32);

impl std::fmt::Display for RfqNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RFQ-{:05}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfqStatus {
    Draft,
    Published,
    Closed,
}

impl RfqStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rfq {
    pub id: RfqId,
    pub number: RfqNumber,
    pub project_id: ProjectId,
    pub delivery_location: String,
    pub bidding_start: Option<NaiveDate>,
    pub bidding_end: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub terms: String,
    pub supplier_ids: Vec<SupplierId>,
    pub materials: Vec<MaterialLine>,
    pub status: RfqStatus,
    /// Optimistic concurrency token; bumped by the store on every write.
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field-by-field patch for `Rfq`. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RfqPatch {
    pub project_id: Option<ProjectId>,
    pub delivery_location: Option<String>,
    pub bidding_start: Option<NaiveDate>,
    pub bidding_end: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub terms: Option<String>,
    pub supplier_ids: Option<Vec<SupplierId>>,
}

impl Rfq {
    pub fn draft(id: RfqId, project_id: ProjectId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            number: RfqNumber(0),
            project_id,
            delivery_location: String::new(),
            bidding_start: None,
            bidding_end: None,
            delivery_date: None,
            terms: String::new(),
            supplier_ids: Vec::new(),
            materials: Vec::new(),
            status: RfqStatus::Draft,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_transition_to(&self, next: RfqStatus) -> bool {
        matches!(
            (self.status, next),
            (RfqStatus::Draft, RfqStatus::Published) | (RfqStatus::Published, RfqStatus::Closed)
        )
    }

    pub fn transition_to(&mut self, next: RfqStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidTransition { from: self.status, to: next })
    }

    /// Scheduling problems that block publishing: missing dates, dates that
    /// coincide, and a bidding window that does not move forward.
    pub fn schedule_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let (start, end, delivery) = (self.bidding_start, self.bidding_end, self.delivery_date);

        if start.is_none() {
            issues.push("biddingStart".to_string());
        }
        if end.is_none() {
            issues.push("biddingEnd".to_string());
        }
        if delivery.is_none() {
            issues.push("deliveryDate".to_string());
        }

        if let (Some(start), Some(end)) = (start, end) {
            if start == end {
                issues.push("biddingEnd (must differ from biddingStart)".to_string());
            } else if end < start {
                issues.push("biddingEnd (must be after biddingStart)".to_string());
            }
        }
        if let (Some(start), Some(delivery)) = (start, delivery) {
            if start == delivery {
                issues.push("deliveryDate (must differ from biddingStart)".to_string());
            }
        }
        if let (Some(end), Some(delivery)) = (end, delivery) {
            if end == delivery {
                issues.push("deliveryDate (must differ from biddingEnd)".to_string());
            }
        }

        issues
    }

    /// True while today is still inside (or before) the bidding window.
    pub fn bidding_open_on(&self, today: NaiveDate) -> bool {
        self.bidding_end.map(|end| today < end).unwrap_or(false)
    }

    /// Applies a patch. Closed RFQs reject every field; published RFQs reject
    /// scheduling, project, and supplier fields but still accept terms and
    /// delivery location.
    pub fn apply_patch(&mut self, patch: RfqPatch, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status == RfqStatus::Closed {
            return Err(DomainError::validation("status", "closed RFQs cannot be edited"));
        }

        if self.status == RfqStatus::Published {
            let frozen = [
                ("projectId", patch.project_id.is_some()),
                ("biddingStart", patch.bidding_start.is_some()),
                ("biddingEnd", patch.bidding_end.is_some()),
                ("deliveryDate", patch.delivery_date.is_some()),
                ("supplierIds", patch.supplier_ids.is_some()),
            ];
            if let Some((field, _)) = frozen.iter().find(|(_, touched)| *touched) {
                return Err(DomainError::validation(
                    *field,
                    "cannot be changed after the RFQ is published",
                ));
            }
        }

        if let Some(project_id) = &patch.project_id {
            if project_id.0.trim().is_empty() {
                return Err(DomainError::validation("projectId", "must not be empty"));
            }
        }
        if let Some(supplier_ids) = &patch.supplier_ids {
            validate_supplier_ids(supplier_ids)?;
        }

        if let Some(project_id) = patch.project_id {
            self.project_id = project_id;
        }
        if let Some(delivery_location) = patch.delivery_location {
            self.delivery_location = delivery_location.trim().to_string();
        }
        if let Some(bidding_start) = patch.bidding_start {
            self.bidding_start = Some(bidding_start);
        }
        if let Some(bidding_end) = patch.bidding_end {
            self.bidding_end = Some(bidding_end);
        }
        if let Some(delivery_date) = patch.delivery_date {
            self.delivery_date = Some(delivery_date);
        }
        if let Some(terms) = patch.terms {
            self.terms = terms;
        }
        if let Some(supplier_ids) = patch.supplier_ids {
            self.supplier_ids = supplier_ids;
        }

        self.updated_at = now;
        Ok(())
    }
}

pub fn validate_supplier_ids(supplier_ids: &[SupplierId]) -> Result<(), DomainError> {
    let mut seen = std::collections::HashSet::new();
    for supplier_id in supplier_ids {
        if supplier_id.0.trim().is_empty() {
            return Err(DomainError::validation("supplierIds", "supplier id must not be empty"));
        }
        if !seen.insert(supplier_id.0.as_str()) {
            return Err(DomainError::Duplicate {
                field: "supplierIds".to_string(),
                value: supplier_id.0.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{Rfq, RfqId, RfqNumber, RfqPatch, RfqStatus};
    use crate::domain::party::{ProjectId, SupplierId};
    use crate::errors::DomainError;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).expect("valid date")
    }

    fn rfq(status: RfqStatus) -> Rfq {
        let mut rfq = Rfq::draft(RfqId("RFQ-1".to_string()), ProjectId("PRJ-1".to_string()), Utc::now());
        rfq.status = status;
        rfq
    }

    #[test]
    fn allows_publish_then_close() {
        let mut rfq = rfq(RfqStatus::Draft);
        rfq.transition_to(RfqStatus::Published).expect("draft -> published");
        rfq.transition_to(RfqStatus::Closed).expect("published -> closed");
        assert_eq!(rfq.status, RfqStatus::Closed);
    }

    #[test]
    fn republishing_is_an_invalid_transition() {
        let mut rfq = rfq(RfqStatus::Published);
        let error = rfq.transition_to(RfqStatus::Published).expect_err("second publish");
        assert!(matches!(
            error,
            DomainError::InvalidTransition { from: RfqStatus::Published, to: RfqStatus::Published }
        ));
    }

    #[test]
    fn schedule_issues_name_missing_and_colliding_dates() {
        let mut rfq = rfq(RfqStatus::Draft);
        assert_eq!(rfq.schedule_issues(), vec!["biddingStart", "biddingEnd", "deliveryDate"]);

        rfq.bidding_start = Some(day(1));
        rfq.bidding_end = Some(day(5));
        rfq.delivery_date = Some(day(5));
        assert_eq!(rfq.schedule_issues(), vec!["deliveryDate (must differ from biddingEnd)"]);

        rfq.delivery_date = Some(day(10));
        assert!(rfq.schedule_issues().is_empty());
    }

    #[test]
    fn reversed_bidding_window_is_reported() {
        let mut rfq = rfq(RfqStatus::Draft);
        rfq.bidding_start = Some(day(5));
        rfq.bidding_end = Some(day(1));
        rfq.delivery_date = Some(day(10));
        assert_eq!(rfq.schedule_issues(), vec!["biddingEnd (must be after biddingStart)"]);
    }

    #[test]
    fn published_rfq_rejects_schedule_patch_but_accepts_terms() {
        let mut rfq = rfq(RfqStatus::Published);
        let error = rfq
            .apply_patch(RfqPatch { delivery_date: Some(day(20)), ..RfqPatch::default() }, Utc::now())
            .expect_err("frozen field");
        assert!(matches!(error, DomainError::Validation { ref field, .. } if field == "deliveryDate"));

        rfq.apply_patch(
            RfqPatch { terms: Some("Net 30".to_string()), ..RfqPatch::default() },
            Utc::now(),
        )
        .expect("terms stay editable");
        assert_eq!(rfq.terms, "Net 30");
    }

    #[test]
    fn rejected_patch_leaves_rfq_untouched() {
        let mut rfq = rfq(RfqStatus::Draft);
        let before = rfq.clone();
        let error = rfq
            .apply_patch(
                RfqPatch {
                    terms: Some("changed".to_string()),
                    supplier_ids: Some(vec![
                        SupplierId("SUP-1".to_string()),
                        SupplierId("SUP-1".to_string()),
                    ]),
                    ..RfqPatch::default()
                },
                Utc::now(),
            )
            .expect_err("duplicate supplier");
        assert!(matches!(error, DomainError::Duplicate { .. }));
        assert_eq!(rfq, before);
    }

    #[test]
    fn rfq_number_renders_zero_padded() {
        assert_eq!(RfqNumber(42).to_string(), "RFQ-00042");
    }
}
