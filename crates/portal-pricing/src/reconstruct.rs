//! ---
//! portal_section: "08-pricing"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Price reconstruction for quotations and calculations."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{PricingError, Result};
use crate::line::{price_line, PricedLine};
use crate::money::{serialize_precise, Amount};

/// Result of re-deriving a quotation's line prices.
#[derive(Debug, Clone, Serialize)]
pub struct PricedQuotation {
    pub lines: Vec<PricedLine>,
    /// Sum of the line amounts as calculated, before scaling.
    pub raw_total: Amount,
    /// Net total the client was quoted, when the quotation carries one.
    pub quoted_total: Option<Amount>,
    /// `quoted_total / raw_total`; one when no scaling applies.
    #[serde(serialize_with = "serialize_precise")]
    pub ratio: Amount,
    pub net_total: Amount,
    #[serde(serialize_with = "serialize_precise")]
    pub vat_rate: Amount,
    pub vat_total: Amount,
    pub gross_total: Amount,
}

/// Price every line and scale the results so they add up to the quoted total.
///
/// Each final line amount is `raw × quoted / raw_total`, rounded to cents. The
/// rounding remainder lands on the line with the largest absolute amount, so
/// the final lines always sum to the quoted total exactly.
pub fn reconstruct(
    lines: &[Value],
    quoted_total: Option<Amount>,
    vat_rate: Amount,
) -> Result<PricedQuotation> {
    let mut priced = lines
        .iter()
        .enumerate()
        .map(|(index, line)| price_line(index, line))
        .collect::<Result<Vec<_>>>()?;

    let raw_total = Amount::checked_sum(priced.iter().map(|line| line.raw_amount))
        .ok_or(PricingError::TotalOverflow { total: "raw total" })?;
    let quoted_total = quoted_total.map(Amount::round_cents);

    let ratio = match quoted_total {
        Some(quoted) if !raw_total.is_zero() => {
            scale_lines(&mut priced, quoted, raw_total)?;
            quoted.checked_div(raw_total).unwrap_or(Amount::ONE)
        }
        _ => Amount::ONE,
    };

    // An unpriced calculation cannot be scaled, but the quoted total still binds.
    let net_total = match quoted_total {
        Some(quoted) => quoted,
        None => Amount::checked_sum(priced.iter().map(|line| line.final_amount))
            .ok_or(PricingError::TotalOverflow { total: "net total" })?,
    };
    let vat_total = net_total
        .percent(vat_rate)
        .map(Amount::round_cents)
        .ok_or(PricingError::TotalOverflow { total: "vat total" })?;
    let gross_total = net_total
        .checked_add(vat_total)
        .ok_or(PricingError::TotalOverflow { total: "gross total" })?;

    debug!(
        lines = priced.len(),
        raw_total = %raw_total,
        net_total = %net_total,
        ratio = %ratio.to_precise_string(),
        "quotation prices reconstructed"
    );

    Ok(PricedQuotation {
        lines: priced,
        raw_total,
        quoted_total,
        ratio,
        net_total,
        vat_rate,
        vat_total,
        gross_total,
    })
}

fn scale_lines(lines: &mut [PricedLine], quoted: Amount, raw_total: Amount) -> Result<()> {
    for line in lines.iter_mut() {
        line.final_amount = line
            .raw_amount
            .mul_div(quoted, raw_total)
            .ok_or(PricingError::Overflow { line: line.index })?
            .round_cents();
    }

    let remainder = Amount::checked_sum(lines.iter().map(|line| line.final_amount))
        .and_then(|distributed| quoted.checked_sub(distributed))
        .ok_or(PricingError::TotalOverflow { total: "line total" })?;
    if remainder.is_zero() {
        return Ok(());
    }
    let largest = lines.iter_mut().reduce(|best, candidate| {
        if candidate.raw_amount.abs() > best.raw_amount.abs() {
            candidate
        } else {
            best
        }
    });
    if let Some(line) = largest {
        debug!(line = line.index, remainder = %remainder, "assigning rounding remainder");
        line.final_amount = line
            .final_amount
            .checked_add(remainder)
            .ok_or(PricingError::Overflow { line: line.index })?;
    }
    Ok(())
}
