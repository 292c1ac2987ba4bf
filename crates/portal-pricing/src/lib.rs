//! ---
//! portal_section: "08-pricing"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Price reconstruction for quotations and calculations."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
//! Re-derives the prices a client sees on a quotation from calculation lines
//! stored under several generations of field names.

pub mod errors;
pub mod fields;
pub mod line;
pub mod money;
pub mod reconstruct;

pub use errors::{ParseAmountError, PricingError, Result};
pub use line::{price_line, PriceSource, PricedLine};
pub use money::Amount;
pub use reconstruct::{reconstruct, PricedQuotation};
