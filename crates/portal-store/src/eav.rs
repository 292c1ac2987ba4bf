//! ---
//! portal_section: "03-persistence"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Entity-attribute-value storage and record reconstruction."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Result, StoreError};

/// Kinds of entity kept in `eav_entities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Top-level job for a client.
    Project,
    /// Offer sent to the client; child of a project.
    Quotation,
    /// Priced breakdown behind a quotation; child of a quotation.
    Calculation,
}

impl EntityKind {
    /// Name stored in the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Quotation => "quotation",
            EntityKind::Calculation => "calculation",
        }
    }

    /// Kind a parent must have, if any.
    pub fn parent_kind(self) -> Option<EntityKind> {
        match self {
            EntityKind::Project => None,
            EntityKind::Quotation => Some(EntityKind::Project),
            EntityKind::Calculation => Some(EntityKind::Quotation),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = StoreError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "project" => Ok(EntityKind::Project),
            "quotation" => Ok(EntityKind::Quotation),
            "calculation" => Ok(EntityKind::Calculation),
            other => Err(StoreError::UnknownKind(other.to_owned())),
        }
    }
}

/// An entity with its attribute rows folded back into a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EavRecord {
    /// Entity identifier.
    pub id: i64,
    /// Entity kind.
    pub kind: EntityKind,
    /// Owning client.
    pub client_id: i64,
    /// Parent entity, if any.
    pub parent_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Reconstructed attribute tree.
    pub fields: Map<String, Value>,
}

impl EavRecord {
    /// Fail unless the record has the expected kind.
    pub fn expect_kind(&self, expected: EntityKind) -> Result<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(StoreError::WrongKind {
                id: self.id,
                actual: self.kind.to_string(),
                expected: expected.to_string(),
            })
        }
    }
}

enum Node {
    Leaf(Option<String>),
    Object(BTreeMap<String, Node>),
    Array(BTreeMap<u64, Node>),
}

impl Node {
    fn container(array: bool) -> Node {
        if array {
            Node::Array(BTreeMap::new())
        } else {
            Node::Object(BTreeMap::new())
        }
    }

    fn child_mut(&mut self, segment: &str, array: bool) -> Option<&mut Node> {
        match self {
            Node::Object(map) => Some(
                map.entry(segment.to_owned())
                    .or_insert_with(|| Node::container(array)),
            ),
            Node::Array(items) => {
                let index = segment.parse::<u64>().ok()?;
                Some(items.entry(index).or_insert_with(|| Node::container(array)))
            }
            Node::Leaf(_) => None,
        }
    }

    fn insert_leaf(&mut self, segment: &str, value: Option<String>) -> Option<()> {
        match self {
            Node::Object(map) => {
                if map.contains_key(segment) {
                    return None;
                }
                map.insert(segment.to_owned(), Node::Leaf(value));
            }
            Node::Array(items) => {
                let index = segment.parse::<u64>().ok()?;
                if items.contains_key(&index) {
                    return None;
                }
                items.insert(index, Node::Leaf(value));
            }
            Node::Leaf(_) => return None,
        }
        Some(())
    }

    fn into_value(self) -> Value {
        match self {
            Node::Leaf(Some(text)) => Value::String(text),
            Node::Leaf(None) => Value::Null,
            Node::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, node)| (key, node.into_value()))
                    .collect(),
            ),
            Node::Array(items) => {
                Value::Array(items.into_values().map(Node::into_value).collect())
            }
        }
    }
}

fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Split an attribute path, rejecting empty segments.
pub(crate) fn segments(attribute: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = attribute.split('.').collect();
    if parts.iter().any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidAttribute(attribute.to_owned()));
    }
    Ok(parts)
}

fn insert(root: &mut Node, attribute: &str, value: Option<String>) -> Result<()> {
    let parts = segments(attribute)?;
    let conflict = || StoreError::AttributeConflict {
        attribute: attribute.to_owned(),
    };
    let Some((last, parents)) = parts.split_last() else {
        return Err(StoreError::InvalidAttribute(attribute.to_owned()));
    };

    let mut current = root;
    for (position, segment) in parents.iter().enumerate() {
        let array = is_index(parts[position + 1]);
        let child = current.child_mut(segment, array).ok_or_else(conflict)?;
        match (&*child, array) {
            (Node::Array(_), true) | (Node::Object(_), false) => {}
            _ => return Err(conflict()),
        }
        current = child;
    }
    current.insert_leaf(last, value).ok_or_else(conflict)
}

/// Rebuild a JSON object from flattened `(attribute, value)` rows.
///
/// Segments are separated by `.`; an all-digit segment below the first level
/// addresses an array slot. Arrays are compacted in index order, so `lines.0`
/// and `lines.7` become a two-element array. The first segment is always an
/// object key.
pub fn unflatten<I, K>(rows: I) -> Result<Map<String, Value>>
where
    I: IntoIterator<Item = (K, Option<String>)>,
    K: AsRef<str>,
{
    let mut root = Node::Object(BTreeMap::new());
    for (attribute, value) in rows {
        insert(&mut root, attribute.as_ref(), value)?;
    }
    match root.into_value() {
        Value::Object(map) => Ok(map),
        _ => unreachable!("root node is always an object"),
    }
}

/// Flatten a JSON object into attribute rows, the inverse of [`unflatten`].
///
/// Numbers and booleans are stored as their JSON text; empty objects and
/// arrays produce no rows. An object key that is empty or contains `.` cannot
/// be read back under the same shape and is rejected as `InvalidAttribute`.
pub fn flatten(fields: &Map<String, Value>) -> Result<Vec<(String, Option<String>)>> {
    let mut rows = Vec::new();
    for (key, value) in fields {
        flatten_into(checked_key(None, key)?, value, &mut rows)?;
    }
    Ok(rows)
}

fn checked_key(parent: Option<&str>, key: &str) -> Result<String> {
    let path = match parent {
        Some(parent) => format!("{parent}.{key}"),
        None => key.to_owned(),
    };
    if key.is_empty() || key.contains('.') {
        return Err(StoreError::InvalidAttribute(path));
    }
    Ok(path)
}

fn flatten_into(
    path: String,
    value: &Value,
    rows: &mut Vec<(String, Option<String>)>,
) -> Result<()> {
    match value {
        Value::Null => rows.push((path, None)),
        Value::String(text) => rows.push((path, Some(text.clone()))),
        Value::Bool(flag) => rows.push((path, Some(flag.to_string()))),
        Value::Number(number) => rows.push((path, Some(number.to_string()))),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(format!("{path}.{index}"), item, rows)?;
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_into(checked_key(Some(&path), key)?, item, rows)?;
            }
        }
    }
    Ok(())
}
