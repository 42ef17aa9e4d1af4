//! Change notifications published after every mutation.
//!
//! Delivery is fire-and-forget: the engine logs a failed publish and keeps
//! the mutation.

use crate::error::Result;
use crate::graph::{Edge, Vertex};
use log::info;
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A vertex was created
    CreateNode,
    /// A vertex was renamed, moved or had content or properties changed
    UpdateNode,
    /// A vertex was removed
    DeleteNode,
    /// An edge was created
    CreateLink,
    /// An edge was removed
    DeleteLink,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::CreateNode => "create_node",
            EventKind::UpdateNode => "update_node",
            EventKind::DeleteNode => "delete_node",
            EventKind::CreateLink => "create_link",
            EventKind::DeleteLink => "delete_link",
        };
        f.write_str(name)
    }
}

/// One change record.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// What happened
    pub event: EventKind,
    /// Affected vertex
    pub node: Option<Vertex>,
    /// Affected edge
    pub link: Option<Edge>,
    /// Source vertex of `link`
    pub source: Option<Vertex>,
    /// Target vertex of `link`
    pub target: Option<Vertex>,
}

impl Event {
    /// A node event.
    pub fn node(event: EventKind, node: Vertex) -> Self {
        Self {
            event,
            node: Some(node),
            link: None,
            source: None,
            target: None,
        }
    }

    /// A link event with both endpoints.
    pub fn link(event: EventKind, link: Edge, source: Option<Vertex>, target: Option<Vertex>) -> Self {
        Self {
            event,
            node: None,
            link: Some(link),
            source,
            target,
        }
    }

    /// JSON payload; each entity becomes its full property map.
    pub fn to_json(&self) -> Value {
        let mut data = Map::new();
        data.insert("event".to_string(), Value::String(self.event.to_string()));
        if let Some(node) = &self.node {
            data.insert("node".to_string(), object(node.all()));
        }
        if let Some(link) = &self.link {
            data.insert("link".to_string(), object(link.all()));
        }
        if let Some(source) = &self.source {
            data.insert("source".to_string(), object(source.all()));
        }
        if let Some(target) = &self.target {
            data.insert("target".to_string(), object(target.all()));
        }
        Value::Object(data)
    }
}

fn object(map: BTreeMap<String, String>) -> Value {
    Value::Object(map.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Destination of change records.
pub trait EventSink: Send + Sync {
    /// Publish one event.
    fn publish(&self, event: &Event) -> Result<()>;
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &Event) -> Result<()> {
        Ok(())
    }
}

/// Writes every event to the log at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: &Event) -> Result<()> {
        info!("{}: {}", event.event, event.to_json());
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Kinds recorded so far, in order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|e| e.event).collect()
    }

    /// Take and clear the recording.
    pub fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: &Event) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
