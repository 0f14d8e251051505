//! Material line editing for a single RFQ.
//!
//! Lines may be appended while an RFQ is Draft or Published; every other
//! edit is Draft-only. Each operation validates the whole request before it
//! touches the RFQ, so a rejected call leaves the lines exactly as they were.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::material::{MaterialLine, MaterialLineId, MaterialRef, MaterialStatus};
use crate::domain::rfq::{Rfq, RfqStatus};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMaterialLine {
    #[serde(default)]
    pub material_id: Option<String>,
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub hsn_code: Option<String>,
    pub quantity: Decimal,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MaterialLinePatch {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub hsn_code: Option<String>,
    pub quantity: Option<Decimal>,
    pub delivery_date: Option<NaiveDate>,
}

pub struct MaterialLineRegistry<'a> {
    rfq: &'a mut Rfq,
}

impl<'a> MaterialLineRegistry<'a> {
    pub fn new(rfq: &'a mut Rfq) -> Self {
        Self { rfq }
    }

    /// Appends `lines` in order. Duplicates, against existing lines or within
    /// the batch, reject the whole batch.
    pub fn add_lines(
        &mut self,
        lines: Vec<NewMaterialLine>,
        now: DateTime<Utc>,
    ) -> Result<Vec<MaterialLineId>, DomainError> {
        if self.rfq.status == RfqStatus::Closed {
            return Err(DomainError::validation("status", "closed RFQs cannot take new materials"));
        }
        if lines.is_empty() {
            return Err(DomainError::validation("materials", "at least one line is required"));
        }

        let mut seen =
            self.rfq.materials.iter().map(|line| line.material.identity_key()).collect::<HashSet<_>>();
        let mut prepared = Vec::with_capacity(lines.len());
        for (offset, line) in lines.into_iter().enumerate() {
            let field = format!("materials[{offset}]");
            let material = material_ref(line.material_id, &line.name, &line.unit, line.hsn_code);
            validate_material(&field, &material, line.quantity)?;

            let key = material.identity_key();
            if !seen.insert(key) {
                return Err(DomainError::Duplicate { field, value: material.name });
            }
            prepared.push(MaterialLine {
                id: MaterialLineId::generate(),
                material,
                quantity: line.quantity,
                delivery_date: line.delivery_date,
                status: MaterialStatus::Pending,
            });
        }

        let ids = prepared.iter().map(|line| line.id.clone()).collect();
        self.rfq.materials.extend(prepared);
        self.rfq.updated_at = now;
        Ok(ids)
    }

    pub fn remove_line(
        &mut self,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<MaterialLine, DomainError> {
        self.ensure_draft()?;
        self.ensure_index(index)?;
        let removed = self.rfq.materials.remove(index);
        self.rfq.updated_at = now;
        Ok(removed)
    }

    pub fn update_line(
        &mut self,
        index: usize,
        patch: MaterialLinePatch,
        now: DateTime<Utc>,
    ) -> Result<&MaterialLine, DomainError> {
        self.ensure_draft()?;
        self.ensure_index(index)?;

        let current = &self.rfq.materials[index];
        let material = material_ref(
            current.material.material_id.clone(),
            patch.name.as_deref().unwrap_or(&current.material.name),
            patch.unit.as_deref().unwrap_or(&current.material.unit),
            patch.hsn_code.or_else(|| current.material.hsn_code.clone()),
        );
        let quantity = patch.quantity.unwrap_or(current.quantity);
        let field = format!("materials[{index}]");
        validate_material(&field, &material, quantity)?;

        let key = material.identity_key();
        let collides = self
            .rfq
            .materials
            .iter()
            .enumerate()
            .any(|(other, line)| other != index && line.material.identity_key() == key);
        if collides {
            return Err(DomainError::Duplicate { field, value: material.name });
        }

        let line = &mut self.rfq.materials[index];
        line.material = material;
        line.quantity = quantity;
        if let Some(delivery_date) = patch.delivery_date {
            line.delivery_date = Some(delivery_date);
        }
        self.rfq.updated_at = now;
        Ok(&self.rfq.materials[index])
    }

    pub fn set_delivery_date_for_all(
        &mut self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        self.ensure_draft()?;
        for line in &mut self.rfq.materials {
            line.delivery_date = Some(date);
        }
        self.rfq.updated_at = now;
        Ok(self.rfq.materials.len())
    }

    fn ensure_draft(&self) -> Result<(), DomainError> {
        if self.rfq.status == RfqStatus::Draft {
            return Ok(());
        }
        Err(DomainError::validation(
            "status",
            format!("material lines can only be edited while draft (currently {})", self.rfq.status.as_str()),
        ))
    }

    fn ensure_index(&self, index: usize) -> Result<(), DomainError> {
        if index < self.rfq.materials.len() {
            return Ok(());
        }
        Err(DomainError::validation(
            "index",
            format!("no material line at index {index} ({} lines)", self.rfq.materials.len()),
        ))
    }
}

fn material_ref(
    material_id: Option<String>,
    name: &str,
    unit: &str,
    hsn_code: Option<String>,
) -> MaterialRef {
    MaterialRef {
        material_id: material_id.map(|id| id.trim().to_owned()).filter(|id| !id.is_empty()),
        name: name.trim().to_owned(),
        unit: unit.trim().to_owned(),
        hsn_code: hsn_code.map(|code| code.trim().to_owned()).filter(|code| !code.is_empty()),
    }
}

fn validate_material(field: &str, material: &MaterialRef, quantity: Decimal) -> Result<(), DomainError> {
    if material.name.is_empty() {
        return Err(DomainError::validation(format!("{field}.name"), "must not be empty"));
    }
    if material.unit.is_empty() {
        return Err(DomainError::validation(format!("{field}.unit"), "must not be empty"));
    }
    if quantity <= Decimal::ZERO {
        return Err(DomainError::validation(
            format!("{field}.quantity"),
            format!("must be positive, got {quantity}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{MaterialLinePatch, MaterialLineRegistry, NewMaterialLine};
    use crate::domain::party::ProjectId;
    use crate::domain::rfq::{Rfq, RfqId, RfqStatus};
    use crate::errors::DomainError;

    fn rfq() -> Rfq {
        Rfq::draft(RfqId("RFQ-1".to_owned()), ProjectId("PRJ-1".to_owned()), Utc::now())
    }

    fn line(name: &str, unit: &str, quantity: i64) -> NewMaterialLine {
        NewMaterialLine {
            material_id: None,
            name: name.to_owned(),
            unit: unit.to_owned(),
            hsn_code: None,
            quantity: Decimal::new(quantity, 0),
            delivery_date: None,
        }
    }

    #[test]
    fn add_lines_appends_in_order_as_pending() {
        let mut rfq = rfq();
        let ids = MaterialLineRegistry::new(&mut rfq)
            .add_lines(vec![line("Plywood 18mm", "sheet", 50), line("Cement", "bag", 20)], Utc::now())
            .expect("valid lines");

        assert_eq!(ids.len(), 2);
        assert_eq!(rfq.materials[0].material.name, "Plywood 18mm");
        assert_eq!(rfq.materials[1].id, ids[1]);
        assert!(rfq.materials.iter().all(|line| line.status == crate::MaterialStatus::Pending));
    }

    #[test]
    fn invalid_line_rejects_whole_batch() {
        let mut rfq = rfq();
        let error = MaterialLineRegistry::new(&mut rfq)
            .add_lines(vec![line("Cement", "bag", 20), line("  ", "bag", 5)], Utc::now())
            .expect_err("blank name");
        assert_eq!(error, DomainError::validation("materials[1].name", "must not be empty"));
        assert!(rfq.materials.is_empty());

        let error = MaterialLineRegistry::new(&mut rfq)
            .add_lines(vec![line("Cement", "bag", 0)], Utc::now())
            .expect_err("zero quantity");
        assert!(matches!(error, DomainError::Validation { ref field, .. } if field == "materials[0].quantity"));
    }

    #[test]
    fn duplicate_material_is_rejected_within_rfq_and_batch() {
        let mut rfq = rfq();
        MaterialLineRegistry::new(&mut rfq)
            .add_lines(vec![line("Cement", "bag", 20)], Utc::now())
            .expect("first add");

        let error = MaterialLineRegistry::new(&mut rfq)
            .add_lines(vec![line(" cement ", "BAG", 5)], Utc::now())
            .expect_err("same material again");
        assert!(matches!(error, DomainError::Duplicate { .. }));

        let error = MaterialLineRegistry::new(&mut rfq)
            .add_lines(vec![line("Sand", "ton", 2), line("Sand", "ton", 3)], Utc::now())
            .expect_err("duplicate inside batch");
        assert!(matches!(error, DomainError::Duplicate { ref field, .. } if field == "materials[1]"));
        assert_eq!(rfq.materials.len(), 1);
    }

    #[test]
    fn published_rfq_accepts_appends_but_not_edits() {
        let mut rfq = rfq();
        MaterialLineRegistry::new(&mut rfq)
            .add_lines(vec![line("Cement", "bag", 20)], Utc::now())
            .expect("draft add");
        rfq.status = RfqStatus::Published;

        let mut registry = MaterialLineRegistry::new(&mut rfq);
        registry.add_lines(vec![line("Sand", "ton", 2)], Utc::now()).expect("amend by append");
        assert!(registry.remove_line(0, Utc::now()).is_err());
        assert!(registry
            .update_line(0, MaterialLinePatch::default(), Utc::now())
            .is_err());
        assert!(registry
            .set_delivery_date_for_all(NaiveDate::from_ymd_opt(2026, 4, 1).expect("date"), Utc::now())
            .is_err());
        assert_eq!(rfq.materials.len(), 2);
    }

    #[test]
    fn update_line_patches_fields_and_guards_duplicates() {
        let mut rfq = rfq();
        let mut registry = MaterialLineRegistry::new(&mut rfq);
        registry
            .add_lines(vec![line("Cement", "bag", 20), line("Sand", "ton", 2)], Utc::now())
            .expect("add");

        let updated = registry
            .update_line(
                1,
                MaterialLinePatch { quantity: Some(Decimal::new(35, 1)), ..MaterialLinePatch::default() },
                Utc::now(),
            )
            .expect("quantity patch");
        assert_eq!(updated.quantity, Decimal::new(35, 1));

        let error = registry
            .update_line(
                1,
                MaterialLinePatch {
                    name: Some("Cement".to_owned()),
                    unit: Some("bag".to_owned()),
                    ..MaterialLinePatch::default()
                },
                Utc::now(),
            )
            .expect_err("renaming onto an existing material");
        assert!(matches!(error, DomainError::Duplicate { .. }));

        let error = registry
            .update_line(7, MaterialLinePatch::default(), Utc::now())
            .expect_err("out of range");
        assert!(matches!(error, DomainError::Validation { ref field, .. } if field == "index"));
    }

    #[test]
    fn remove_and_bulk_delivery_date_while_draft() {
        let mut rfq = rfq();
        let mut registry = MaterialLineRegistry::new(&mut rfq);
        registry
            .add_lines(
                vec![line("Cement", "bag", 20), line("Sand", "ton", 2), line("Steel", "kg", 900)],
                Utc::now(),
            )
            .expect("add");

        let removed = registry.remove_line(1, Utc::now()).expect("remove sand");
        assert_eq!(removed.material.name, "Sand");

        let date = NaiveDate::from_ymd_opt(2026, 4, 1).expect("date");
        assert_eq!(registry.set_delivery_date_for_all(date, Utc::now()).expect("bulk date"), 2);
        assert!(rfq.materials.iter().all(|line| line.delivery_date == Some(date)));
        assert_eq!(rfq.materials[1].material.name, "Steel");
    }
}
