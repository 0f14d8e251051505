use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::party::SupplierId;
use crate::domain::response::{LineQuote, ResponseId, ResponseStatus, SupplierResponse};
use crate::domain::rfq::{Rfq, RfqStatus};
use crate::errors::DomainError;
use crate::settlement::checked_totals;

/// Supplier-side submission body. The submission time is never part of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponseSubmission {
    pub supplier_id: SupplierId,
    pub tax_rate: Decimal,
    #[serde(default)]
    pub quotes: Vec<LineQuote>,
}

/// Validates `submission` against `rfq` and stamps it with `submitted_at`.
pub fn build_response(
    rfq: &Rfq,
    submission: ResponseSubmission,
    submitted_at: DateTime<Utc>,
) -> Result<SupplierResponse, DomainError> {
    if rfq.status != RfqStatus::Published {
        return Err(DomainError::validation(
            "status",
            format!("responses are only accepted while published (currently {})", rfq.status.as_str()),
        ));
    }
    if !rfq.supplier_ids.contains(&submission.supplier_id) {
        return Err(DomainError::validation(
            "supplierId",
            format!("supplier `{}` was not invited to this RFQ", submission.supplier_id),
        ));
    }
    if submission.tax_rate < Decimal::ZERO || submission.tax_rate > Decimal::ONE_HUNDRED {
        return Err(DomainError::validation(
            "taxRate",
            format!("must be between 0 and 100, got {}", submission.tax_rate),
        ));
    }

    let mut quoted = HashSet::new();
    let mut line_totals = Vec::with_capacity(submission.quotes.len());
    for (index, quote) in submission.quotes.iter().enumerate() {
        let field = format!("quotes[{index}]");
        if !rfq.materials.iter().any(|line| line.id == quote.line_id) {
            return Err(DomainError::validation(
                format!("{field}.lineId"),
                format!("material line `{}` does not belong to this RFQ", quote.line_id.0),
            ));
        }
        if !quoted.insert(&quote.line_id) {
            return Err(DomainError::Duplicate {
                field: format!("{field}.lineId"),
                value: quote.line_id.0.clone(),
            });
        }
        if quote.quantity < Decimal::ZERO {
            return Err(DomainError::validation(format!("{field}.quantity"), "must not be negative"));
        }
        if quote.unit_price < Decimal::ZERO {
            return Err(DomainError::validation(format!("{field}.unitPrice"), "must not be negative"));
        }
        let line_total = quote.quantity.checked_mul(quote.unit_price).ok_or_else(|| {
            DomainError::validation(
                format!("{field}.unitPrice"),
                "quantity times unit price exceeds the supported range",
            )
        })?;
        line_totals.push(line_total);
    }
    if checked_totals(line_totals, submission.tax_rate).is_none() {
        return Err(DomainError::validation(
            "quotes",
            "response total including tax exceeds the supported range",
        ));
    }

    let quotes = submission
        .quotes
        .into_iter()
        .map(|quote| LineQuote {
            remarks: quote.remarks.map(|remarks| remarks.trim().to_owned()).filter(|r| !r.is_empty()),
            ..quote
        })
        .collect();

    Ok(SupplierResponse {
        id: ResponseId::generate(),
        rfq_id: rfq.id.clone(),
        supplier_id: submission.supplier_id,
        submitted_at,
        tax_rate: submission.tax_rate,
        quotes,
        status: ResponseStatus::Submitted,
    })
}
