//! Cross-project view of material lines by request status.
//!
//! Lines are owned by their RFQ. The board is derived on every read from the
//! RFQs themselves, and moves are applied to the owning RFQ.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::material::{MaterialLine, MaterialLineId, MaterialStatus, MaterialStatusChange};
use crate::domain::party::ProjectId;
use crate::domain::rfq::{Rfq, RfqId, RfqNumber};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedLine {
    pub rfq_id: RfqId,
    pub rfq_number: RfqNumber,
    pub project_id: ProjectId,
    pub project_name: String,
    pub line: MaterialLine,
}

/// status -> project name -> lines in insertion order.
pub type StatusBoard = BTreeMap<MaterialStatus, BTreeMap<String, Vec<TrackedLine>>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved(MaterialStatusChange),
    Unchanged,
}

/// Flattens every line of `rfqs` in RFQ order, then line order. Projects
/// missing from `project_names` fall back to their id.
pub fn track_lines(rfqs: &[Rfq], project_names: &HashMap<ProjectId, String>) -> Vec<TrackedLine> {
    rfqs.iter()
        .flat_map(|rfq| {
            let project_name =
                project_names.get(&rfq.project_id).cloned().unwrap_or_else(|| rfq.project_id.0.clone());
            rfq.materials.iter().map(move |line| TrackedLine {
                rfq_id: rfq.id.clone(),
                rfq_number: rfq.number,
                project_id: rfq.project_id.clone(),
                project_name: project_name.clone(),
                line: line.clone(),
            })
        })
        .collect()
}

pub fn group_by_status_then_project<I>(lines: I) -> StatusBoard
where
    I: IntoIterator<Item = TrackedLine>,
{
    let mut board = MaterialStatus::ALL
        .into_iter()
        .map(|status| (status, BTreeMap::new()))
        .collect::<StatusBoard>();
    for tracked in lines {
        board
            .entry(tracked.line.status)
            .or_default()
            .entry(tracked.project_name.clone())
            .or_default()
            .push(tracked);
    }
    board
}

/// Moves one line of `rfq` from `from` to `to`. A line already in `to` is
/// left alone and yields [`MoveOutcome::Unchanged`], so retries are safe.
pub fn move_status(
    rfq: &mut Rfq,
    line_id: &MaterialLineId,
    from: MaterialStatus,
    to: MaterialStatus,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<MoveOutcome, DomainError> {
    let rfq_id = rfq.id.clone();
    let Some(line) = rfq.materials.iter_mut().find(|line| &line.id == line_id) else {
        return Err(DomainError::validation(
            "lineId",
            format!("material line `{}` does not belong to RFQ `{rfq_id}`", line_id.0),
        ));
    };

    if line.status == to {
        return Ok(MoveOutcome::Unchanged);
    }
    if line.status != from {
        return Err(DomainError::StatusConflict {
            line_id: line_id.0.clone(),
            expected: from,
            actual: line.status,
        });
    }

    line.status = to;
    rfq.updated_at = now;
    Ok(MoveOutcome::Moved(MaterialStatusChange {
        rfq_id,
        line_id: line_id.clone(),
        from,
        to,
        actor: actor.to_owned(),
        changed_at: now,
    }))
}
