//! ---
//! portal_section: "03-persistence"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Entity-attribute-value storage and record reconstruction."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Params};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::eav::{flatten, segments, unflatten, EavRecord, EntityKind};
use crate::records::QuotationStatus;
use crate::{Result, StoreError};

/// Identifier of a row in `clients`.
pub type ClientId = i64;
/// Identifier of a row in `eav_entities`.
pub type EntityId = i64;

/// A portal user, as known to the back office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    /// Client identifier.
    pub id: ClientId,
    /// Login email, unique regardless of case.
    pub email: String,
    /// Contact name.
    pub name: String,
    /// Company the contact works for.
    pub company: Option<String>,
    /// Identifier of the client in the upstream CRM.
    pub crm_id: Option<String>,
    /// Inactive clients cannot sign in.
    pub active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Fields needed to register a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClient {
    /// Login email.
    pub email: String,
    /// Contact name.
    pub name: String,
    /// Company name.
    #[serde(default)]
    pub company: Option<String>,
    /// Upstream CRM identifier.
    #[serde(default)]
    pub crm_id: Option<String>,
}

/// Answer a client gave to a quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteDecision {
    /// The client accepts the offer.
    Accept,
    /// The client declines the offer.
    Reject,
}

impl QuoteDecision {
    /// Name stored in `quote_responses.decision`.
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteDecision::Accept => "accept",
            QuoteDecision::Reject => "reject",
        }
    }

    /// Quotation status after the decision is recorded.
    pub fn resulting_status(self) -> QuotationStatus {
        match self {
            QuoteDecision::Accept => QuotationStatus::Accepted,
            QuoteDecision::Reject => QuotationStatus::Rejected,
        }
    }
}

impl fmt::Display for QuoteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuoteDecision {
    type Err = StoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "accept" => Ok(QuoteDecision::Accept),
            "reject" => Ok(QuoteDecision::Reject),
            other => Err(StoreError::InvalidAttribute(format!("decision={other}"))),
        }
    }
}

/// Audit row written whenever a client answers a quotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteResponse {
    /// Row identifier.
    pub id: i64,
    /// Quotation that was answered.
    pub quotation_id: EntityId,
    /// Client that answered.
    pub client_id: ClientId,
    /// The answer.
    pub decision: QuoteDecision,
    /// Free-text remark left with the answer.
    pub comment: Option<String>,
    /// Whether the CRM acknowledged the webhook.
    pub forwarded: bool,
    /// When the answer was given.
    pub responded_at: DateTime<Utc>,
}

/// SQLite-backed store for clients and their EAV records.
pub struct PortalStore {
    db: Connection,
}

impl PortalStore {
    const SCHEMA: &'static str = r"
        CREATE TABLE IF NOT EXISTS clients (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            name TEXT NOT NULL,
            company TEXT,
            crm_id TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS eav_entities (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            client_id INTEGER NOT NULL REFERENCES clients(id),
            parent_id INTEGER REFERENCES eav_entities(id),
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS eav_values (
            entity_id INTEGER NOT NULL,
            attribute TEXT NOT NULL,
            value TEXT,
            PRIMARY KEY (entity_id, attribute),
            FOREIGN KEY (entity_id) REFERENCES eav_entities(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS quote_responses (
            id INTEGER PRIMARY KEY,
            quotation_id INTEGER NOT NULL REFERENCES eav_entities(id),
            client_id INTEGER NOT NULL REFERENCES clients(id),
            decision TEXT NOT NULL,
            comment TEXT,
            forwarded INTEGER NOT NULL DEFAULT 0,
            responded_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entities_client_kind
        ON eav_entities(client_id, kind);

        CREATE INDEX IF NOT EXISTS idx_entities_parent
        ON eav_entities(parent_id);

        CREATE INDEX IF NOT EXISTS idx_quote_responses_quotation
        ON quote_responses(quotation_id);
    ";

    const RECORD_SELECT: &'static str = "
        SELECT e.id, e.kind, e.client_id, e.parent_id, e.created_at, v.attribute, v.value
        FROM eav_entities e
        LEFT JOIN eav_values v ON v.entity_id = e.id";

    /// Open or create the portal database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        info!(path = %path.display(), "portal database opened");
        Self::initialize(db)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(db: Connection) -> Result<Self> {
        db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        db.execute_batch(Self::SCHEMA)?;
        Ok(Self { db })
    }

    /// Cheap reachability check used by the status route.
    pub fn ping(&self) -> Result<()> {
        self.db.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// Register a client and return the stored row.
    pub fn insert_client(&self, new: &NewClient) -> Result<Client> {
        let email = new.email.trim();
        if email.is_empty() {
            return Err(StoreError::InvalidAttribute("email".into()));
        }
        self.db.execute(
            "INSERT INTO clients (email, name, company, crm_id, active, created_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![email, new.name, new.company, new.crm_id, timestamp(Utc::now())],
        )?;
        let id = self.db.last_insert_rowid();
        debug!(client = id, "client registered");
        self.client(id)?
            .ok_or_else(|| StoreError::NotFound(format!("client {id}")))
    }

    /// Active client with this email, compared case-insensitively.
    pub fn find_client_by_email(&self, email: &str) -> Result<Option<Client>> {
        let email = email.trim();
        if email.is_empty() {
            return Ok(None);
        }
        self.query_client("WHERE email = ?1 AND active = 1", params![email])
    }

    /// Client by id, active or not.
    pub fn client(&self, id: ClientId) -> Result<Option<Client>> {
        self.query_client("WHERE id = ?1", params![id])
    }

    /// Enable or disable a client's access.
    pub fn set_client_active(&self, id: ClientId, active: bool) -> Result<()> {
        let changed = self
            .db
            .execute("UPDATE clients SET active = ?2 WHERE id = ?1", params![id, active])?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("client {id}")));
        }
        Ok(())
    }

    fn query_client<P: Params>(&self, filter: &str, params: P) -> Result<Option<Client>> {
        let sql = format!(
            "SELECT id, email, name, company, crm_id, active, created_at FROM clients {filter}"
        );
        let row = self
            .db
            .query_row(&sql, params, |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .optional()?;
        row.map(|(id, email, name, company, crm_id, active, created_at)| {
            Ok(Client {
                id,
                email,
                name,
                company,
                crm_id,
                active,
                created_at: parse_timestamp(&created_at)?,
            })
        })
        .transpose()
    }

    /// Create an entity with its attribute rows in one transaction.
    ///
    /// Projects have no parent; quotations hang below a project and
    /// calculations below a quotation, all owned by the same client. The
    /// attributes must reconstruct into a record without conflicts.
    pub fn create_entity(
        &mut self,
        kind: EntityKind,
        client: ClientId,
        parent: Option<EntityId>,
        attributes: &[(String, Option<String>)],
    ) -> Result<EntityId> {
        unflatten(attributes.iter().map(|(name, value)| (name.as_str(), value.clone())))?;

        let tx = self.db.transaction()?;
        let client_exists = tx
            .query_row("SELECT 1 FROM clients WHERE id = ?1", params![client], |_| Ok(()))
            .optional()?
            .is_some();
        if !client_exists {
            return Err(StoreError::NotFound(format!("client {client}")));
        }
        check_parent(&tx, kind, client, parent)?;

        tx.execute(
            "INSERT INTO eav_entities (kind, client_id, parent_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![kind.as_str(), client, parent, timestamp(Utc::now())],
        )?;
        let id = tx.last_insert_rowid();
        {
            let mut insert = tx.prepare(
                "INSERT INTO eav_values (entity_id, attribute, value) VALUES (?1, ?2, ?3)",
            )?;
            for (attribute, value) in attributes {
                insert.execute(params![id, attribute, value])?;
            }
        }
        tx.commit()?;
        debug!(entity = id, kind = %kind, client, attributes = attributes.len(), "entity created");
        Ok(id)
    }

    /// Flatten a JSON object and store it as a new entity.
    pub fn create_record(
        &mut self,
        kind: EntityKind,
        client: ClientId,
        parent: Option<EntityId>,
        fields: &Map<String, Value>,
    ) -> Result<EntityId> {
        let attributes = flatten(fields)?;
        self.create_entity(kind, client, parent, &attributes)
    }

    /// Insert or replace one attribute row.
    pub fn set_attribute(
        &mut self,
        entity: EntityId,
        attribute: &str,
        value: Option<&str>,
    ) -> Result<()> {
        let tx = self.db.transaction()?;
        write_attribute(&tx, entity, attribute, value)?;
        tx.commit()?;
        Ok(())
    }

    /// Entity by id, regardless of owner.
    pub fn load_entity(&self, id: EntityId) -> Result<EavRecord> {
        self.load_records("WHERE e.id = ?1", params![id])?
            .pop()
            .ok_or_else(|| StoreError::NotFound(format!("entity {id}")))
    }

    /// Entity of `kind` owned by `client`. Another client's entity, or one of a
    /// different kind, is reported as absent.
    pub fn client_entity(
        &self,
        id: EntityId,
        kind: EntityKind,
        client: ClientId,
    ) -> Result<Option<EavRecord>> {
        Ok(self
            .load_records(
                "WHERE e.id = ?1 AND e.kind = ?2 AND e.client_id = ?3",
                params![id, kind.as_str(), client],
            )?
            .pop())
    }

    /// All entities of `kind` owned by `client`, ordered by id.
    pub fn list_entities(&self, kind: EntityKind, client: ClientId) -> Result<Vec<EavRecord>> {
        self.load_records(
            "WHERE e.kind = ?1 AND e.client_id = ?2",
            params![kind.as_str(), client],
        )
    }

    /// Direct children of `parent` with the given kind, ordered by id.
    pub fn children(&self, parent: EntityId, kind: EntityKind) -> Result<Vec<EavRecord>> {
        self.load_records(
            "WHERE e.parent_id = ?1 AND e.kind = ?2",
            params![parent, kind.as_str()],
        )
    }

    fn load_records<P: Params>(&self, filter: &str, params: P) -> Result<Vec<EavRecord>> {
        let sql = format!("{} {filter} ORDER BY e.id, v.attribute", Self::RECORD_SELECT);
        let mut stmt = self.db.prepare(&sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut grouped: Vec<(EntityHeader, Vec<(String, Option<String>)>)> = Vec::new();
        for row in rows {
            let (id, kind, client_id, parent_id, created_at, attribute, value) = row?;
            if grouped.last().map(|(header, _)| header.id) != Some(id) {
                grouped.push((
                    EntityHeader {
                        id,
                        kind,
                        client_id,
                        parent_id,
                        created_at,
                    },
                    Vec::new(),
                ));
            }
            if let (Some(attribute), Some((_, attributes))) = (attribute, grouped.last_mut()) {
                attributes.push((attribute, value));
            }
        }

        grouped
            .into_iter()
            .map(|(header, attributes)| -> Result<EavRecord> {
                Ok(EavRecord {
                    id: header.id,
                    kind: header.kind.parse()?,
                    client_id: header.client_id,
                    parent_id: header.parent_id,
                    created_at: parse_timestamp(&header.created_at)?,
                    fields: unflatten(attributes)?,
                })
            })
            .collect()
    }

    /// Store a client's answer to a quotation.
    ///
    /// Sets the quotation's `status` and `responded_at` attributes and writes
    /// the audit row in one transaction. The row starts as not forwarded.
    pub fn record_quote_response(
        &mut self,
        quotation: EntityId,
        client: ClientId,
        decision: QuoteDecision,
        comment: Option<&str>,
        responded_at: DateTime<Utc>,
    ) -> Result<QuoteResponse> {
        let comment = comment.map(str::trim).filter(|text| !text.is_empty());
        let stamp = timestamp(responded_at);

        let tx = self.db.transaction()?;
        let owner = tx
            .query_row(
                "SELECT client_id FROM eav_entities WHERE id = ?1 AND kind = ?2",
                params![quotation, EntityKind::Quotation.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if owner != Some(client) {
            return Err(StoreError::NotFound(format!("quotation {quotation}")));
        }
        write_attribute(
            &tx,
            quotation,
            "status",
            Some(decision.resulting_status().as_str()),
        )?;
        write_attribute(&tx, quotation, "responded_at", Some(&stamp))?;
        tx.execute(
            "INSERT INTO quote_responses
                 (quotation_id, client_id, decision, comment, forwarded, responded_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
            params![quotation, client, decision.as_str(), comment, stamp],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!(quotation, client, decision = %decision, "quote response recorded");
        Ok(QuoteResponse {
            id,
            quotation_id: quotation,
            client_id: client,
            decision,
            comment: comment.map(str::to_owned),
            forwarded: false,
            responded_at: parse_timestamp(&stamp)?,
        })
    }

    /// Flag an audit row as acknowledged by the CRM.
    pub fn mark_response_forwarded(&self, response: i64) -> Result<()> {
        let changed = self.db.execute(
            "UPDATE quote_responses SET forwarded = 1 WHERE id = ?1",
            params![response],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("quote response {response}")));
        }
        Ok(())
    }

    /// Audit rows for a quotation, oldest first.
    pub fn quote_responses(&self, quotation: EntityId) -> Result<Vec<QuoteResponse>> {
        let mut stmt = self.db.prepare(
            "SELECT id, quotation_id, client_id, decision, comment, forwarded, responded_at
             FROM quote_responses
             WHERE quotation_id = ?1
             ORDER BY responded_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![quotation], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?;

        let mut responses = Vec::new();
        for row in rows {
            let (id, quotation_id, client_id, decision, comment, forwarded, responded_at) = row?;
            responses.push(QuoteResponse {
                id,
                quotation_id,
                client_id,
                decision: decision.parse()?,
                comment,
                forwarded,
                responded_at: parse_timestamp(&responded_at)?,
            });
        }
        Ok(responses)
    }
}

struct EntityHeader {
    id: i64,
    kind: String,
    client_id: i64,
    parent_id: Option<i64>,
    created_at: String,
}

fn check_parent(
    db: &Connection,
    kind: EntityKind,
    client: ClientId,
    parent: Option<EntityId>,
) -> Result<()> {
    match (kind.parent_kind(), parent) {
        (None, None) => Ok(()),
        (None, Some(parent)) => Err(StoreError::InvalidParent {
            parent,
            kind: kind.to_string(),
        }),
        (Some(_), None) => Err(StoreError::MissingParent {
            kind: kind.to_string(),
        }),
        (Some(expected), Some(parent)) => {
            let found = db
                .query_row(
                    "SELECT kind, client_id FROM eav_entities WHERE id = ?1",
                    params![parent],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()?;
            match found {
                Some((parent_kind, owner))
                    if parent_kind == expected.as_str() && owner == client =>
                {
                    Ok(())
                }
                _ => Err(StoreError::InvalidParent {
                    parent,
                    kind: kind.to_string(),
                }),
            }
        }
    }
}

/// Upsert one attribute after checking the record still reconstructs.
fn write_attribute(
    db: &Connection,
    entity: EntityId,
    attribute: &str,
    value: Option<&str>,
) -> Result<()> {
    segments(attribute)?;
    let exists = db
        .query_row("SELECT 1 FROM eav_entities WHERE id = ?1", params![entity], |_| Ok(()))
        .optional()?
        .is_some();
    if !exists {
        return Err(StoreError::NotFound(format!("entity {entity}")));
    }

    let mut stmt = db.prepare(
        "SELECT attribute, value FROM eav_values WHERE entity_id = ?1 AND attribute <> ?2",
    )?;
    let mut rows = stmt
        .query_map(params![entity, attribute], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.push((attribute.to_owned(), value.map(str::to_owned)));
    unflatten(rows)?;

    db.execute(
        "INSERT INTO eav_values (entity_id, attribute, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(entity_id, attribute) DO UPDATE SET value = excluded.value",
        params![entity, attribute, value],
    )?;
    Ok(())
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp(raw.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, Option<String>)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), Some(value.to_string())))
            .collect()
    }

    fn store_with_client() -> (PortalStore, Client) {
        let store = PortalStore::open_in_memory().unwrap();
        let client = store
            .insert_client(&NewClient {
                email: "Anna@Example.com".into(),
                name: "Anna de Vries".into(),
                company: Some("Bakkerij De Vries".into()),
                crm_id: Some("C-1001".into()),
            })
            .unwrap();
        (store, client)
    }

    #[test]
    fn email_lookup_ignores_case_and_inactive_clients() {
        let (store, client) = store_with_client();
        let found = store.find_client_by_email(" anna@example.COM ").unwrap().unwrap();
        assert_eq!(found.id, client.id);
        assert_eq!(found.crm_id.as_deref(), Some("C-1001"));

        store.set_client_active(client.id, false).unwrap();
        assert!(store.find_client_by_email("anna@example.com").unwrap().is_none());
        assert!(!store.client(client.id).unwrap().unwrap().active);
        assert!(store.find_client_by_email("").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (store, _) = store_with_client();
        let err = store
            .insert_client(&NewClient {
                email: "anna@example.com".into(),
                name: "Other".into(),
                ..NewClient::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn entities_round_trip_through_rows() {
        let (mut store, client) = store_with_client();
        let project = store
            .create_entity(
                EntityKind::Project,
                client.id,
                None,
                &attrs(&[("title", "Shopfront"), ("meta.width_mm", "4200")]),
            )
            .unwrap();
        let record = store.load_entity(project).unwrap();
        assert_eq!(record.kind, EntityKind::Project);
        assert_eq!(
            Value::Object(record.fields),
            json!({ "title": "Shopfront", "meta": { "width_mm": "4200" } })
        );
    }

    #[test]
    fn parent_rules_are_enforced() {
        let (mut store, client) = store_with_client();
        let project = store
            .create_entity(EntityKind::Project, client.id, None, &[])
            .unwrap();

        let err = store
            .create_entity(EntityKind::Calculation, client.id, Some(project), &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidParent { parent, .. } if parent == project));

        let err = store
            .create_entity(EntityKind::Quotation, client.id, None, &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingParent { .. }));

        let err = store
            .create_entity(EntityKind::Project, 999, None, &[])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn conflicting_attributes_are_refused_on_write() {
        let (mut store, client) = store_with_client();
        let err = store
            .create_entity(
                EntityKind::Project,
                client.id,
                None,
                &attrs(&[("lines", "x"), ("lines.0.qty", "1")]),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::AttributeConflict { .. }));

        let project = store
            .create_entity(EntityKind::Project, client.id, None, &attrs(&[("lines.0.qty", "1")]))
            .unwrap();
        let err = store.set_attribute(project, "lines", Some("x")).unwrap_err();
        assert!(matches!(err, StoreError::AttributeConflict { .. }));
        assert!(store.set_attribute(project, "a..b", None).is_err());
        assert!(matches!(
            store.set_attribute(4242, "title", Some("x")).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn dotted_keys_are_refused_before_anything_is_written() {
        let (mut store, client) = store_with_client();
        let Value::Object(fields) = json!({ "title": "Signs", "size.mm": "10" }) else {
            unreachable!()
        };
        let err = store
            .create_record(EntityKind::Project, client.id, None, &fields)
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidAttribute(ref path) if path == "size.mm"));
        assert!(store
            .list_entities(EntityKind::Project, client.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn set_attribute_replaces_value() {
        let (mut store, client) = store_with_client();
        let project = store
            .create_entity(EntityKind::Project, client.id, None, &attrs(&[("status", "open")]))
            .unwrap();
        store.set_attribute(project, "status", Some("done")).unwrap();
        store.set_attribute(project, "notes", None).unwrap();
        let record = store.load_entity(project).unwrap();
        assert_eq!(record.fields["status"], json!("done"));
        assert_eq!(record.fields["notes"], Value::Null);
    }

    #[test]
    fn entity_without_attributes_loads_empty() {
        let (mut store, client) = store_with_client();
        let project = store
            .create_entity(EntityKind::Project, client.id, None, &[])
            .unwrap();
        let listed = store.list_entities(EntityKind::Project, client.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, project);
        assert!(listed[0].fields.is_empty());
    }

    #[test]
    fn decisions_parse_and_map_to_status() {
        assert_eq!("accept".parse::<QuoteDecision>().unwrap(), QuoteDecision::Accept);
        assert!("maybe".parse::<QuoteDecision>().is_err());
        assert_eq!(
            QuoteDecision::Reject.resulting_status(),
            QuotationStatus::Rejected
        );
    }
}
