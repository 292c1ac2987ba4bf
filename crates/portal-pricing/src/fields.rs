//! ---
//! portal_section: "08-pricing"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Price reconstruction for quotations and calculations."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Legacy field names found on calculation lines.
//!
//! Calculations were written by several generations of the back-office tool,
//! each naming the same concept differently. Lists are in priority order.

use std::borrow::Cow;

use serde_json::{Map, Value};

use crate::errors::{PricingError, Result};
use crate::money::Amount;

/// Line price that already includes factors and discounts.
pub const FINAL_PRICE: &[&str] = &["final_price", "total_price", "line_total", "total"];
pub const UNIT_PRICE: &[&str] = &["unit_price", "price", "price_per_unit", "sell_price"];
pub const AREA_PRICE: &[&str] = &["price_per_m2", "m2_price"];
pub const WIDTH_MM: &[&str] = &["width_mm", "width"];
pub const HEIGHT_MM: &[&str] = &["height_mm", "height"];
pub const QUANTITY: &[&str] = &["quantity", "qty", "amount", "count"];
/// Every present multiplier applies.
pub const MULTIPLIERS: &[&str] = &["factor", "multiplier", "margin_factor", "markup_factor"];
pub const DISCOUNT: &[&str] = &["discount_pct", "discount"];
pub const DESCRIPTION: &[&str] = &["description", "name", "title", "product"];
pub const UNIT: &[&str] = &["unit", "uom"];

/// Text of a field when it holds a non-empty string or a number.
pub fn text<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<Cow<'a, str>> {
    match fields.get(name)? {
        Value::String(raw) => {
            let trimmed = raw.trim();
            (!trimmed.is_empty()).then_some(Cow::Borrowed(trimmed))
        }
        Value::Number(number) => Some(Cow::Owned(number.to_string())),
        _ => None,
    }
}

/// First field from `names` that carries text, with the name that matched.
pub fn first_text<'a>(
    fields: &'a Map<String, Value>,
    names: &[&'static str],
) -> Option<(&'static str, Cow<'a, str>)> {
    names
        .iter()
        .find_map(|name| text(fields, name).map(|value| (*name, value)))
}

/// First present field from `names`, parsed as an amount.
pub fn first_amount(
    fields: &Map<String, Value>,
    names: &[&'static str],
) -> Result<Option<(&'static str, Amount)>> {
    let Some((name, raw)) = first_text(fields, names) else {
        return Ok(None);
    };
    parse_field(name, &raw).map(|amount| Some((name, amount)))
}

/// Every present field from `names`, parsed as amounts.
pub fn all_amounts(
    fields: &Map<String, Value>,
    names: &[&'static str],
) -> Result<Vec<(&'static str, Amount)>> {
    names
        .iter()
        .filter_map(|name| text(fields, name).map(|raw| (*name, raw)))
        .map(|(name, raw)| parse_field(name, &raw).map(|amount| (name, amount)))
        .collect()
}

fn parse_field(name: &str, raw: &str) -> Result<Amount> {
    raw.parse::<Amount>()
        .map_err(|_| PricingError::InvalidNumber {
            field: name.to_owned(),
            value: raw.to_owned(),
        })
}
