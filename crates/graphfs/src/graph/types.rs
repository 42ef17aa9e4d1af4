//! Core graph records: vertices, edges, IDs and traversal direction.

use super::property::PropertyMap;
use crate::codec;
use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend-internal vertex identifier (monotonic counter).
pub type VertexId = u64;

/// Backend-internal edge identifier (monotonic counter).
pub type EdgeId = u64;

/// The default vertex label. Elided from encoded identifiers.
pub const DEFAULT_LABEL: &str = "vertex";

/// Names of the core vertex fields, in the order [`Vertex::all`] emits them.
pub const CORE_FIELDS: [&str; 9] = [
    "id", "uuid", "label", "name", "created", "modified", "mode", "owner", "group",
];

/// Direction of an edge relative to the vertex it is queried from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Edges whose target is this vertex
    Inbound,
    /// Edges whose source is this vertex
    Outbound,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Inbound => write!(f, "in"),
            Direction::Outbound => write!(f, "out"),
        }
    }
}

/// A vertex snapshot.
///
/// Fetched by a backend query; mutations go through the backend and are
/// mirrored into the snapshot by the node model, never the other way round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Backend identifier
    pub id: VertexId,
    /// Stable canonical UUID, assigned at creation
    pub uuid: String,
    /// Semantic type; also selects file or folder role
    pub label: String,
    /// Filename component
    pub name: String,
    /// Custom properties
    pub properties: PropertyMap,
    /// Creation time, Unix seconds
    pub created: i64,
    /// Last content modification, Unix seconds
    pub modified: i64,
    /// Permission bits
    pub mode: u32,
    /// Owner uid
    pub owner: u32,
    /// Owner gid
    pub group: u32,
}

impl Vertex {
    /// Look up a core field or custom property by name.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "id" => Some(self.id.to_string()),
            "uuid" => Some(self.uuid.clone()),
            "label" => Some(self.label.clone()),
            "name" => Some(self.name.clone()),
            "created" => Some(self.created.to_string()),
            "modified" => Some(self.modified.to_string()),
            "mode" => Some(self.mode.to_string()),
            "owner" => Some(self.owner.to_string()),
            "group" => Some(self.group.to_string()),
            _ => self.properties.get(key).map(str::to_string),
        }
    }

    /// True if `key` is a core field or a present custom property.
    pub fn has(&self, key: &str) -> bool {
        CORE_FIELDS.contains(&key) || self.properties.contains_key(key)
    }

    /// Write a core field or custom property.
    ///
    /// Numeric core fields accept decimal or `0o`-prefixed octal text. `id` is
    /// owned by the backend and cannot be written.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "id" => {
                return Err(GraphError::Serialization {
                    message: "vertex id is assigned by the backend".to_string(),
                    source: None,
                })
            }
            "uuid" => self.uuid = value.to_string(),
            "label" => self.label = value.to_string(),
            "name" => self.name = value.to_string(),
            "created" => self.created = parse_number(key, value)?,
            "modified" => self.modified = parse_number(key, value)?,
            "mode" => self.mode = parse_number(key, value)?,
            "owner" => self.owner = parse_number(key, value)?,
            "group" => self.group = parse_number(key, value)?,
            _ => {
                self.properties.insert(key, value);
            }
        }
        Ok(())
    }

    /// Composite identifier of this vertex; see [`codec::encode`].
    pub fn to_id(&self, short: bool) -> String {
        codec::encode(Some(&self.name), Some(&self.label), Some(&self.uuid), short)
    }

    /// Remove a custom property. Core fields are left untouched.
    pub fn unset(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    /// The full property map: core fields followed by custom properties.
    pub fn all(&self) -> BTreeMap<String, String> {
        let mut map: BTreeMap<String, String> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for field in CORE_FIELDS {
            if let Some(value) = self.get(field) {
                map.insert(field.to_string(), value);
            }
        }
        map
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: TryFrom<i64>,
{
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0o") {
        Some(octal) => i64::from_str_radix(octal, 8),
        None => trimmed.parse::<i64>(),
    };
    parsed
        .ok()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| GraphError::Serialization {
            message: format!("invalid numeric value {value:?} for {key}"),
            source: None,
        })
}

/// A directed edge snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Backend identifier
    pub id: EdgeId,
    /// Stable canonical UUID
    pub uuid: String,
    /// Relationship label (`in`, `self`, `template` are reserved)
    pub label: String,
    /// Optional disambiguating name
    pub name: Option<String>,
    /// Source vertex
    pub source: VertexId,
    /// Target vertex
    pub target: VertexId,
}

impl Edge {
    /// Filesystem entry name: `name@label`, or the bare label.
    pub fn to_id(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => format!("{name}@{}", self.label),
            _ => self.label.clone(),
        }
    }

    /// The far end of this edge as seen from `from`.
    pub fn other(&self, from: VertexId) -> VertexId {
        if self.source == from {
            self.target
        } else {
            self.source
        }
    }

    /// The full property map of the edge.
    pub fn all(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("id".to_string(), self.id.to_string());
        map.insert("uuid".to_string(), self.uuid.clone());
        map.insert("label".to_string(), self.label.clone());
        if let Some(name) = &self.name {
            map.insert("name".to_string(), name.clone());
        }
        map.insert("source".to_string(), self.source.to_string());
        map.insert("target".to_string(), self.target.to_string());
        map
    }
}

/// Vertex creation request. The backend assigns `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVertex {
    /// Canonical UUID
    pub uuid: String,
    /// Label
    pub label: String,
    /// Filename component
    pub name: String,
    /// Initial custom properties
    pub properties: PropertyMap,
    /// Creation time, Unix seconds
    pub created: i64,
    /// Permission bits
    pub mode: u32,
    /// Owner uid
    pub owner: u32,
    /// Owner gid
    pub group: u32,
}

impl NewVertex {
    /// A request for `name` with `label` and `uuid`, all other fields zeroed.
    pub fn named(uuid: impl Into<String>, label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            label: label.into(),
            name: name.into(),
            properties: PropertyMap::new(),
            created: 0,
            mode: 0,
            owner: 0,
            group: 0,
        }
    }
}

/// Edge creation request. The backend assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEdge {
    /// Canonical UUID
    pub uuid: String,
    /// Relationship label
    pub label: String,
    /// Optional name
    pub name: Option<String>,
    /// Source vertex
    pub source: VertexId,
    /// Target vertex
    pub target: VertexId,
}

/// Label and name filter for adjacent-edge queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeFilter {
    /// Exact label, or any label when `None`
    pub label: Option<String>,
    /// Exact name, or any name when `None`
    pub name: Option<String>,
}

impl EdgeFilter {
    /// Match every edge.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match edges with the given label.
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            name: None,
        }
    }

    /// Match edges with the given label and name.
    pub fn named(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            name: Some(name.into()),
        }
    }

    /// Whether `edge` passes this filter.
    pub fn matches(&self, edge: &Edge) -> bool {
        if let Some(label) = &self.label {
            if &edge.label != label {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if edge.name.as_deref() != Some(name.as_str()) {
                return false;
            }
        }
        true
    }
}

/// One element of a traversal path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    /// A vertex on the path
    Vertex(Vertex),
    /// An edge on the path
    Edge(Edge),
}
