use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::party::Supplier;
use crate::domain::rfq::{Rfq, RfqStatus};

/// Lifecycle states mirror the persisted RFQ status.
pub type FlowState = RfqStatus;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    PublishRequested,
    CloseRequested,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PersistStatus,
    DispatchInvitations,
    WarnBiddingStillOpen,
    WarnNoResponses,
}

/// Facts gathered before a lifecycle event is applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub missing_required_fields: Vec<String>,
    pub bidding_open: bool,
    pub response_count: usize,
}

impl FlowContext {
    /// Collects publish prerequisites for `rfq`. `suppliers` holds the
    /// directory entries that could be resolved for the invited ids.
    pub fn for_rfq(
        rfq: &Rfq,
        suppliers: &[Supplier],
        response_count: usize,
        today: NaiveDate,
    ) -> Self {
        let mut missing = Vec::new();
        if rfq.materials.is_empty() {
            missing.push("materials".to_owned());
        }
        missing.extend(rfq.schedule_issues());
        if rfq.supplier_ids.is_empty() {
            missing.push("suppliers".to_owned());
        }
        for supplier_id in &rfq.supplier_ids {
            match suppliers.iter().find(|supplier| &supplier.id == supplier_id) {
                None => missing.push(format!("suppliers[{supplier_id}]")),
                Some(supplier) if supplier.contact_email().is_none() => {
                    missing.push(format!("suppliers[{supplier_id}].email"));
                }
                Some(_) => {}
            }
        }

        Self {
            missing_required_fields: missing,
            bidding_open: rfq.bidding_open_on(today),
            response_count,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FlowState,
    pub to: FlowState,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}

impl TransitionOutcome {
    /// Human-readable warnings carried by the transition.
    pub fn warnings(&self, rfq: &Rfq) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                FlowAction::WarnBiddingStillOpen => Some(match rfq.bidding_end {
                    Some(end) => format!("bidding window still open until {end}"),
                    None => "bidding window still open".to_owned(),
                }),
                FlowAction::WarnNoResponses => Some("no responses received".to_owned()),
                _ => None,
            })
            .collect()
    }
}
