//! ---
//! portal_section: "03-persistence"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Entity-attribute-value storage and record reconstruction."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Projects, quotations and calculations are stored as flattened attribute
//! rows (`lines.0.qty = "3"`). This crate owns the schema, scoped reads for a
//! client, and the reconstruction of those rows into JSON records and typed
//! views.

/// Result alias used throughout the store crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error type for the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Wrapper for SQLite failures.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Wrapper for IO errors while preparing the database path.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Two attribute paths disagree about the shape of a record.
    #[error("attribute '{attribute}' conflicts with another attribute of the same record")]
    AttributeConflict {
        /// Attribute path that could not be placed.
        attribute: String,
    },
    /// Attribute path with an empty segment.
    #[error("invalid attribute name '{0}'")]
    InvalidAttribute(String),
    /// Stored entity kind is not one of the known kinds.
    #[error("unknown entity kind '{0}'")]
    UnknownKind(String),
    /// Record did not have the kind the caller asked for.
    #[error("entity {id} is a {actual}, expected {expected}")]
    WrongKind {
        /// Entity identifier.
        id: i64,
        /// Kind stored in the database.
        actual: String,
        /// Kind the caller required.
        expected: String,
    },
    /// Parent entity missing, of the wrong kind, or owned by another client.
    #[error("entity {parent} cannot be the parent of a {kind}")]
    InvalidParent {
        /// Parent identifier supplied by the caller.
        parent: i64,
        /// Kind of the entity being created.
        kind: String,
    },
    /// Quotations and calculations must hang below a parent.
    #[error("a {kind} needs a parent entity")]
    MissingParent {
        /// Kind of the entity being created.
        kind: String,
    },
    /// Row referenced by id does not exist.
    #[error("{0} not found")]
    NotFound(String),
    /// Stored timestamp could not be parsed.
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),
}

pub mod demo;
pub mod eav;
pub mod records;
pub mod store;

pub use demo::{seed_demo, DemoIds};
pub use eav::{flatten, unflatten, EavRecord, EntityKind};
pub use records::{Calculation, Project, Quotation, QuotationStatus};
pub use store::{
    Client, ClientId, EntityId, NewClient, PortalStore, QuoteDecision, QuoteResponse,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_subject() {
        let err = StoreError::AttributeConflict {
            attribute: "lines.0".into(),
        };
        assert!(err.to_string().contains("lines.0"));
        let err = StoreError::NotFound("quotation 7".into());
        assert_eq!(err.to_string(), "quotation 7 not found");
    }
}
