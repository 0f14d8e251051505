use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::material::MaterialLineId;
use crate::domain::party::SupplierId;
use crate::domain::response::{ResponseId, SupplierResponse};
use crate::domain::rfq::{Rfq, RfqId};
use crate::errors::DomainError;

const PRESENTATION_DP: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementLine {
    pub line_id: MaterialLineId,
    pub name: String,
    pub unit: String,
    pub requested_quantity: Decimal,
    pub quoted_quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub quoted: bool,
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub rfq_id: RfqId,
    pub response_id: ResponseId,
    pub supplier_id: SupplierId,
    pub lines: Vec<SettlementLine>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub unquoted_lines: usize,
    pub trace: Vec<SettlementTraceStep>,
}

impl Settlement {
    /// Copy with every monetary amount rounded half away from zero to two
    /// places. Totals are rounded from the exact values, never re-summed.
    pub fn rounded(&self) -> Self {
        let mut rounded = self.clone();
        for line in &mut rounded.lines {
            line.line_total = present(line.line_total);
        }
        rounded.subtotal = present(self.subtotal);
        rounded.tax_amount = present(self.tax_amount);
        rounded.grand_total = present(self.grand_total);
        for step in &mut rounded.trace {
            step.amount = present(step.amount);
        }
        rounded
    }
}

pub trait QuoteAggregator: Send + Sync {
    fn settle(&self, rfq: &Rfq, response: &SupplierResponse) -> Result<Settlement, DomainError>;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicAggregator;

impl QuoteAggregator for DeterministicAggregator {
    fn settle(&self, rfq: &Rfq, response: &SupplierResponse) -> Result<Settlement, DomainError> {
        settle_response(rfq, response)
    }
}

/// Totals `response` against every material line of `rfq`. A line without a
/// quote contributes zero. Amounts are exact; see [`Settlement::rounded`].
pub fn settle_response(
    rfq: &Rfq,
    response: &SupplierResponse,
) -> Result<Settlement, DomainError> {
    let lines = rfq
        .materials
        .iter()
        .map(|line| {
            let quote = response.quote_for(&line.id);
            let quoted_quantity = quote.map(|quote| quote.quantity).unwrap_or(Decimal::ZERO);
            let unit_price = quote.map(|quote| quote.unit_price).unwrap_or(Decimal::ZERO);
            let line_total = quoted_quantity.checked_mul(unit_price).ok_or_else(|| {
                DomainError::validation(
                    format!("quotes[{}]", line.id.0),
                    "line total exceeds the supported range",
                )
            })?;
            Ok(SettlementLine {
                line_id: line.id.clone(),
                name: line.material.name.clone(),
                unit: line.material.unit.clone(),
                requested_quantity: line.quantity,
                quoted_quantity,
                unit_price,
                line_total,
                quoted: quote.is_some(),
                remarks: quote.and_then(|quote| quote.remarks.clone()),
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    let (subtotal, tax_amount, grand_total) =
        checked_totals(lines.iter().map(|line| line.line_total), response.tax_rate).ok_or_else(
            || DomainError::validation("quotes", "response total exceeds the supported range"),
        )?;
    let unquoted_lines = lines.iter().filter(|line| !line.quoted).count();

    Ok(Settlement {
        rfq_id: rfq.id.clone(),
        response_id: response.id.clone(),
        supplier_id: response.supplier_id.clone(),
        lines,
        subtotal,
        tax_rate: response.tax_rate,
        tax_amount,
        grand_total,
        unquoted_lines,
        trace: vec![
            SettlementTraceStep {
                stage: "subtotal".to_owned(),
                detail: "sum(quoted_quantity * unit_price) over all RFQ lines".to_owned(),
                amount: subtotal,
            },
            SettlementTraceStep {
                stage: "tax".to_owned(),
                detail: format!("subtotal * {}%", response.tax_rate),
                amount: tax_amount,
            },
            SettlementTraceStep {
                stage: "grand_total".to_owned(),
                detail: "subtotal + tax".to_owned(),
                amount: grand_total,
            },
        ],
    })
}

/// Subtotal, tax and grand total of `line_totals`, or `None` when any of
/// them leaves the range `Decimal` can hold.
pub fn checked_totals<I>(line_totals: I, tax_rate: Decimal) -> Option<(Decimal, Decimal, Decimal)>
where
    I: IntoIterator<Item = Decimal>,
{
    let subtotal =
        line_totals.into_iter().try_fold(Decimal::ZERO, |sum, amount| sum.checked_add(amount))?;
    let tax_amount = subtotal.checked_mul(tax_rate)?.checked_div(Decimal::ONE_HUNDRED)?;
    let grand_total = subtotal.checked_add(tax_amount)?;
    Some((subtotal, tax_amount, grand_total))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    pub rank: usize,
    pub response_id: ResponseId,
    pub supplier_id: SupplierId,
    pub submitted_at: DateTime<Utc>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub grand_total: Decimal,
    pub unquoted_lines: usize,
    pub lowest_bid: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseComparison {
    pub rfq_id: RfqId,
    pub line_count: usize,
    pub entries: Vec<ComparisonEntry>,
}

/// Ranks `responses` (expected in submission order) by grand total, cheapest
/// first. Equal totals keep submission order.
pub fn compare_responses(
    rfq: &Rfq,
    responses: &[SupplierResponse],
) -> Result<ResponseComparison, DomainError> {
    let mut settled = responses
        .iter()
        .map(|response| Ok((response.submitted_at, settle_response(rfq, response)?)))
        .collect::<Result<Vec<_>, DomainError>>()?;
    settled.sort_by(|left, right| left.1.grand_total.cmp(&right.1.grand_total));

    let lowest = settled.first().map(|(_, settlement)| settlement.grand_total);
    let entries = settled
        .into_iter()
        .enumerate()
        .map(|(position, (submitted_at, settlement))| ComparisonEntry {
            rank: position + 1,
            lowest_bid: Some(settlement.grand_total) == lowest,
            response_id: settlement.response_id,
            supplier_id: settlement.supplier_id,
            submitted_at,
            subtotal: present(settlement.subtotal),
            tax_amount: present(settlement.tax_amount),
            grand_total: present(settlement.grand_total),
            unquoted_lines: settlement.unquoted_lines,
        })
        .collect();

    Ok(ResponseComparison { rfq_id: rfq.id.clone(), line_count: rfq.materials.len(), entries })
}

fn present(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(PRESENTATION_DP, RoundingStrategy::MidpointAwayFromZero)
}
