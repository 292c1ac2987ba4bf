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
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::{PricingError, Result};
use crate::fields;
use crate::money::{serialize_precise, Amount};

const MM2_PER_M2: Amount = Amount::from_raw(1_000_000 * crate::money::SCALE);

/// Where the raw line amount came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSource {
    FinalPrice { field: &'static str },
    UnitPrice { field: &'static str },
    AreaPrice { field: &'static str },
    Unpriced,
}

/// A calculation line with its reconstructed price.
#[derive(Debug, Clone, Serialize)]
pub struct PricedLine {
    /// Position of the line across all calculations of the quotation.
    pub index: usize,
    pub description: String,
    #[serde(serialize_with = "serialize_precise")]
    pub quantity: Amount,
    pub unit: Option<String>,
    /// Price per unit after factors and discount, when derivable.
    pub unit_price: Option<Amount>,
    #[serde(serialize_with = "serialize_precise")]
    pub factor: Amount,
    #[serde(serialize_with = "serialize_precise")]
    pub discount_pct: Amount,
    pub source: PriceSource,
    /// Amount before scaling to the quoted total.
    pub raw_amount: Amount,
    /// Amount shown to the client, in cents precision.
    pub final_amount: Amount,
}

impl PricedLine {
    pub fn is_unpriced(&self) -> bool {
        self.source == PriceSource::Unpriced
    }
}

/// Price one line object. `final_amount` is set to the raw amount rounded to
/// cents; [`crate::reconstruct`] rescales it afterwards.
pub fn price_line(index: usize, line: &Value) -> Result<PricedLine> {
    let Value::Object(fields) = line else {
        return Err(PricingError::MalformedLine { line: index });
    };

    let description = fields::first_text(fields, fields::DESCRIPTION)
        .map(|(_, text)| text.into_owned())
        .unwrap_or_default();
    let unit = fields::first_text(fields, fields::UNIT).map(|(_, text)| text.into_owned());

    let quantity = fields::first_amount(fields, fields::QUANTITY)?
        .map(|(_, quantity)| quantity)
        .unwrap_or(Amount::ONE);
    if quantity.is_negative() {
        return Err(PricingError::NegativeQuantity { line: index });
    }

    let factor = combined_factor(index, fields)?;
    let discount_pct = discount(index, fields)?;
    let overflow = || PricingError::Overflow { line: index };
    let remaining = Amount::HUNDRED
        .checked_sub(discount_pct)
        .ok_or_else(overflow)?;

    if let Some((field, total)) = fields::first_amount(fields, fields::FINAL_PRICE)? {
        let unit_price = if quantity.is_zero() {
            None
        } else {
            total.checked_div(quantity)
        };
        return Ok(PricedLine {
            index,
            description,
            quantity,
            unit,
            unit_price,
            factor,
            discount_pct,
            source: PriceSource::FinalPrice { field },
            raw_amount: total,
            final_amount: total.round_cents(),
        });
    }

    let base = match area_unit_price(index, fields)? {
        Some((field, price)) => Some((PriceSource::AreaPrice { field }, price)),
        None => fields::first_amount(fields, fields::UNIT_PRICE)?
            .map(|(field, price)| (PriceSource::UnitPrice { field }, price)),
    };

    let Some((source, base_unit)) = base else {
        warn!(line = index, description = %description, "calculation line has no price field");
        return Ok(PricedLine {
            index,
            description,
            quantity,
            unit,
            unit_price: None,
            factor,
            discount_pct,
            source: PriceSource::Unpriced,
            raw_amount: Amount::ZERO,
            final_amount: Amount::ZERO,
        });
    };

    let unit_price = base_unit
        .checked_mul(factor)
        .and_then(|price| price.mul_div(remaining, Amount::HUNDRED))
        .ok_or_else(overflow)?;
    let raw_amount = unit_price.checked_mul(quantity).ok_or_else(overflow)?;

    Ok(PricedLine {
        index,
        description,
        quantity,
        unit,
        unit_price: Some(unit_price),
        factor,
        discount_pct,
        source,
        raw_amount,
        final_amount: raw_amount.round_cents(),
    })
}

/// Product of all present multipliers; zero means "not set" in legacy rows.
fn combined_factor(index: usize, fields: &Map<String, Value>) -> Result<Amount> {
    fields::all_amounts(fields, fields::MULTIPLIERS)?
        .into_iter()
        .filter(|(_, factor)| !factor.is_zero())
        .try_fold(Amount::ONE, |acc, (_, factor)| {
            acc.checked_mul(factor)
                .ok_or(PricingError::Overflow { line: index })
        })
}

fn discount(index: usize, fields: &Map<String, Value>) -> Result<Amount> {
    let Some((_, pct)) = fields::first_amount(fields, fields::DISCOUNT)? else {
        return Ok(Amount::ZERO);
    };
    if pct.is_negative() || pct > Amount::HUNDRED {
        return Err(PricingError::InvalidDiscount {
            line: index,
            value: pct.to_string(),
        });
    }
    Ok(pct)
}

/// Unit price from a per-m² price and the panel dimensions in millimetres.
fn area_unit_price(
    index: usize,
    fields: &Map<String, Value>,
) -> Result<Option<(&'static str, Amount)>> {
    let Some((field, per_m2)) = fields::first_amount(fields, fields::AREA_PRICE)? else {
        return Ok(None);
    };
    let width = fields::first_amount(fields, fields::WIDTH_MM)?;
    let height = fields::first_amount(fields, fields::HEIGHT_MM)?;
    let (Some((_, width)), Some((_, height))) = (width, height) else {
        warn!(line = index, field, "area price without both dimensions; ignoring it");
        return Ok(None);
    };
    let area_m2 = width
        .checked_mul(height)
        .and_then(|mm2| mm2.checked_div(MM2_PER_M2))
        .ok_or(PricingError::Overflow { line: index })?;
    let price = per_m2
        .checked_mul(area_m2)
        .ok_or(PricingError::Overflow { line: index })?;
    Ok(Some((field, price)))
}
