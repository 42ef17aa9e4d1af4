//! Graph node model: navigation and mutation over vertex snapshots.
//!
//! [`Nodes`] issues one backend request per call and mirrors each successful
//! property write into the caller's snapshot. Nothing is cached between calls.

use crate::codec::{self, IdField};
use crate::config::FsType;
use crate::context::FsContext;
use crate::error::{GraphError, Result};
use crate::graph::{Direction, Edge, EdgeFilter, NewEdge, NewVertex, PropertyMap, Vertex, VertexId, DEFAULT_LABEL};
use crate::render::Renderer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::{debug, trace};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Prefix marking base64-encoded property values.
pub const BASE64_PREFIX: &str = "base64:";

/// Encode bytes for storage in a string property.
pub fn encode_data(data: &[u8]) -> String {
    format!("{BASE64_PREFIX}{}", STANDARD.encode(data))
}

/// Decode a stored property value. Values without the prefix, or with an
/// undecodable payload, are returned as their raw bytes.
pub fn decode_data(value: &str) -> Vec<u8> {
    match value.strip_prefix(BASE64_PREFIX) {
        Some(payload) => STANDARD
            .decode(payload)
            .unwrap_or_else(|_| value.as_bytes().to_vec()),
        None => value.as_bytes().to_vec(),
    }
}

/// Current time as Unix seconds.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Filter for an edge entry name: `name@label`, or a bare label.
pub fn edge_filter(edge_id: &str) -> EdgeFilter {
    match codec::parse_edge(edge_id) {
        (Some(name), label) => EdgeFilter::named(label, name),
        (None, label) => EdgeFilter::label(label),
    }
}

/// Identity of a vertex about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Entry name
    pub name: String,
    /// Label
    pub label: String,
    /// UUID; generated when absent
    pub uuid: Option<String>,
}

impl NodeSpec {
    /// Infer name, label and uuid from an entry name.
    ///
    /// The label is the explicit `@label` segment, else the first rule of
    /// type `fs_type` matching the name, else `default_label`.
    pub fn infer(ctx: &FsContext, entry: &str, fs_type: FsType, default_label: &str) -> Option<Self> {
        let name = codec::infer(IdField::Name, entry, None)?;
        let candidate = codec::infer(IdField::Label, entry, Some(default_label));
        let label = codec::label(&ctx.config, Some(&name), candidate.as_deref(), fs_type, default_label);
        Some(Self {
            name,
            label,
            uuid: codec::infer(IdField::Uuid, entry, None),
        })
    }
}

/// Result of [`Nodes::attribute`].
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// A property value or rendered content
    Property(String),
    /// Exactly one vertex across the named edges
    SingleEdge(Vertex),
    /// Several vertices across the named edges
    MultiEdge(Vec<Vertex>),
    /// Nothing under that name
    Missing,
}

/// Node model operations bound to one context.
#[derive(Clone, Copy)]
pub struct Nodes<'a> {
    ctx: &'a FsContext,
}

impl<'a> Nodes<'a> {
    /// Bind to a context.
    pub fn new(ctx: &'a FsContext) -> Self {
        Self { ctx }
    }

    /// The bound context.
    pub fn context(&self) -> &'a FsContext {
        self.ctx
    }

    /// Fetch a vertex by backend id.
    pub fn get(&self, id: VertexId) -> Result<Option<Vertex>> {
        self.ctx.backend.vertex(id)
    }

    /// Re-fetch a snapshot.
    pub fn refresh(&self, vertex: &Vertex) -> Result<Vertex> {
        self.get(vertex.id)?
            .ok_or_else(|| GraphError::not_found(vertex.to_id(false)))
    }

    /// Look up a vertex by composite identifier.
    ///
    /// Needs a uuid; an explicit non-default label must also match.
    /// Identifiers without a uuid resolve to nothing.
    pub fn load(&self, id: &str) -> Result<Option<Vertex>> {
        let parsed = codec::parse(id);
        let Some(uuid) = parsed.uuid.as_deref() else {
            return Ok(None);
        };
        let label = parsed.label.as_deref().filter(|l| *l != DEFAULT_LABEL);
        self.ctx.backend.vertex_by_uuid(uuid, label)
    }

    /// Adjacent edges, optionally filtered by an edge entry name.
    pub fn edges(&self, vertex: &Vertex, edge_id: Option<&str>, direction: Direction) -> Result<Vec<Edge>> {
        let filter = edge_id.map(edge_filter).unwrap_or_default();
        self.ctx.backend.edges_of(vertex.id, direction, &filter)
    }

    /// First adjacent edge matching an edge entry name.
    pub fn edge(&self, vertex: &Vertex, edge_id: &str, direction: Direction) -> Result<Option<Edge>> {
        Ok(self.edges(vertex, Some(edge_id), direction)?.into_iter().next())
    }

    /// Vertices at the far end of matching edges.
    pub fn edge_nodes(&self, vertex: &Vertex, edge_id: Option<&str>, direction: Direction) -> Result<Vec<Vertex>> {
        let mut nodes = Vec::new();
        for edge in self.edges(vertex, edge_id, direction)? {
            if let Some(node) = self.get(edge.other(vertex.id))? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Vertex at the far end of the first matching edge.
    pub fn edge_node(&self, vertex: &Vertex, edge_id: &str, direction: Direction) -> Result<Option<Vertex>> {
        match self.edge(vertex, edge_id, direction)? {
            Some(edge) => self.get(edge.other(vertex.id)),
            None => Ok(None),
        }
    }

    /// Sources of inbound edges.
    pub fn inbound(&self, vertex: &Vertex, edge_id: Option<&str>) -> Result<Vec<Vertex>> {
        self.edge_nodes(vertex, edge_id, Direction::Inbound)
    }

    /// Targets of outbound edges.
    pub fn outbound(&self, vertex: &Vertex, edge_id: Option<&str>) -> Result<Vec<Vertex>> {
        self.edge_nodes(vertex, edge_id, Direction::Outbound)
    }

    /// Target of the outbound hierarchy edge.
    pub fn parent(&self, vertex: &Vertex) -> Result<Option<Vertex>> {
        let config = &self.ctx.config;
        let filter = EdgeFilter::label(config.in_label.as_str());
        match self
            .ctx
            .backend
            .edges_of(vertex.id, Direction::Outbound, &filter)?
            .into_iter()
            .next()
        {
            Some(edge) => self.get(edge.target),
            None => Ok(None),
        }
    }

    /// Ancestors, nearest first.
    ///
    /// Stops at a vertex without a parent or that is its own parent.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Consistency`] if the hierarchy loops back on
    /// itself.
    pub fn parents(&self, vertex: &Vertex) -> Result<Vec<Vertex>> {
        let mut seen = HashSet::from([vertex.id]);
        let mut chain = Vec::new();
        let mut current = vertex.clone();

        while let Some(parent) = self.parent(&current)? {
            if parent.id == current.id {
                break;
            }
            if !seen.insert(parent.id) {
                return Err(GraphError::Consistency {
                    message: format!("cycle in hierarchy at {}", parent.to_id(false)),
                });
            }
            chain.push(parent.clone());
            current = parent;
        }
        Ok(chain)
    }

    /// Root-first chain ending at `vertex`.
    pub fn path(&self, vertex: &Vertex) -> Result<Vec<Vertex>> {
        let mut chain = self.parents(vertex)?;
        chain.reverse();
        chain.push(vertex.clone());
        Ok(chain)
    }

    /// Hierarchy children of `vertex`, in id order. With no vertex, the root
    /// set: every vertex with no outbound hierarchy edge.
    pub fn children(&self, vertex: Option<&Vertex>) -> Result<Vec<Vertex>> {
        let config = &self.ctx.config;
        let Some(vertex) = vertex else {
            return self.ctx.backend.vertices_without_out_edge(&config.in_label);
        };

        let filter = EdgeFilter::named(config.in_label.as_str(), config.in_name.as_str());
        let mut children = Vec::new();
        for edge in self.ctx.backend.edges_of(vertex.id, Direction::Inbound, &filter)? {
            if edge.source == vertex.id {
                continue;
            }
            if let Some(child) = self.get(edge.source)? {
                children.push(child);
            }
        }
        Ok(children)
    }

    /// True if the vertex label classifies as a folder.
    pub fn is_folder(&self, vertex: &Vertex) -> bool {
        self.ctx.config.is_folder_label(&vertex.label)
    }

    /// True if the vertex label classifies as a file.
    pub fn is_file(&self, vertex: &Vertex) -> bool {
        self.ctx.config.is_file_label(&vertex.label)
    }

    /// Write one property, remotely then into the snapshot.
    pub fn set_property(&self, vertex: &mut Vertex, key: &str, value: &str) -> Result<()> {
        self.ctx.backend.set_property(vertex.id, key, value)?;
        vertex.apply(key, value)
    }

    /// Drop one property, remotely then from the snapshot.
    pub fn unset_property(&self, vertex: &mut Vertex, key: &str) -> Result<()> {
        self.ctx.backend.remove_property(vertex.id, key)?;
        vertex.unset(key);
        Ok(())
    }

    /// Decoded bytes of a property, if present.
    pub fn read_property(&self, vertex: &Vertex, key: &str) -> Option<Vec<u8>> {
        vertex.properties.get(key).map(decode_data)
    }

    /// Store bytes in a property with the base64 encoding.
    pub fn write_property(&self, vertex: &mut Vertex, key: &str, data: &[u8]) -> Result<()> {
        self.set_property(vertex, key, &encode_data(data))
    }

    /// Create a vertex, optionally under `parent`.
    ///
    /// Folders also receive the folder properties and a self-loop edge.
    pub fn create(&self, spec: NodeSpec, parent: Option<&Vertex>, folder: bool) -> Result<Vertex> {
        let config = &self.ctx.config;
        debug!(
            "Creating {}: name={}, label={}, parent={:?}",
            if folder { "folder" } else { "file" },
            spec.name,
            spec.label,
            parent.map(|p| p.id)
        );

        let mut properties = PropertyMap::new().with("namespace", config.fs_ns.as_str());
        if folder {
            properties.insert("type", config.folder_label.as_str());
            properties.insert("in_label", config.in_label.as_str());
            properties.insert("in_name", config.in_name.as_str());
        }

        let mut vertex = self.ctx.backend.add_vertex(NewVertex {
            uuid: spec.uuid.unwrap_or_else(|| Uuid::new_v4().to_string()),
            label: spec.label,
            name: spec.name,
            properties,
            created: unix_now(),
            mode: config.default_mode,
            owner: config.default_uid,
            group: config.default_gid,
        })?;

        if let Some(parent) = parent {
            self.link_parent(&vertex, parent)?;
        }

        if folder {
            let query = format!(
                "g.V('{}').has('uuid', '{}').has('type', '{}').inE('{}').outV()",
                vertex.id, vertex.uuid, config.folder_label, config.in_label
            );
            self.set_property(&mut vertex, "query", &query)?;
            self.ctx.backend.add_edge(NewEdge {
                uuid: Uuid::new_v4().to_string(),
                label: config.self_label.clone(),
                name: Some(config.self_name.clone()),
                source: vertex.id,
                target: vertex.id,
            })?;
        }

        trace!("Created vertex {}", vertex.to_id(false));
        Ok(vertex)
    }

    fn link_parent(&self, vertex: &Vertex, parent: &Vertex) -> Result<Edge> {
        let config = &self.ctx.config;
        self.ctx.backend.add_edge(NewEdge {
            uuid: Uuid::new_v4().to_string(),
            label: config.in_label.clone(),
            name: Some(config.in_name.clone()),
            source: vertex.id,
            target: parent.id,
        })
    }

    /// Change the entry name. The uuid is preserved.
    pub fn rename(&self, vertex: &mut Vertex, name: &str) -> Result<()> {
        debug!("Renaming vertex {} to {name}", vertex.id);
        self.set_property(vertex, "name", name)
    }

    /// Replace the hierarchy edge. With no parent the vertex joins the root set.
    pub fn move_to(&self, vertex: &Vertex, parent: Option<&Vertex>) -> Result<()> {
        debug!("Moving vertex {} under {:?}", vertex.id, parent.map(|p| p.id));
        let filter = EdgeFilter::label(self.ctx.config.in_label.as_str());
        for edge in self.ctx.backend.edges_of(vertex.id, Direction::Outbound, &filter)? {
            self.ctx.backend.remove_edge(edge.id)?;
        }
        if let Some(parent) = parent {
            self.link_parent(vertex, parent)?;
        }
        Ok(())
    }

    /// Remove the vertex and its incident edges. Children are left in place.
    pub fn delete(&self, vertex: &Vertex) -> Result<()> {
        debug!("Deleting vertex {}", vertex.to_id(false));
        self.ctx.backend.remove_vertex(vertex.id)
    }

    /// Create a directed edge.
    pub fn create_link(&self, source: &Vertex, target: &Vertex, label: &str, name: Option<&str>) -> Result<Edge> {
        debug!("Linking {} -[{label}]-> {}", source.id, target.id);
        self.ctx.backend.add_edge(NewEdge {
            uuid: Uuid::new_v4().to_string(),
            label: label.to_string(),
            name: name.map(str::to_string),
            source: source.id,
            target: target.id,
        })
    }

    /// First adjacent edge with `label` and, if given, `name`.
    pub fn get_link(&self, vertex: &Vertex, label: &str, name: Option<&str>, direction: Direction) -> Result<Option<Edge>> {
        let filter = match name {
            Some(name) => EdgeFilter::named(label, name),
            None => EdgeFilter::label(label),
        };
        Ok(self
            .ctx
            .backend
            .edges_of(vertex.id, direction, &filter)?
            .into_iter()
            .next())
    }

    /// Remove every adjacent edge with `label` and, if given, `name`.
    /// Returns the removed edges.
    pub fn delete_link(&self, vertex: &Vertex, label: &str, name: Option<&str>, direction: Direction) -> Result<Vec<Edge>> {
        let filter = match name {
            Some(name) => EdgeFilter::named(label, name),
            None => EdgeFilter::label(label),
        };
        let edges = self.ctx.backend.edges_of(vertex.id, direction, &filter)?;
        for edge in &edges {
            debug!("Removing edge {} ({})", edge.id, edge.to_id());
            self.ctx.backend.remove_edge(edge.id)?;
        }
        Ok(edges)
    }

    /// Named attribute lookup.
    ///
    /// `content`/`contents` render the vertex. `inbound`/`outbound` and the
    /// `inbound__<edge>`/`outbound__<edge>` forms traverse edges. Any other
    /// name is tried as an outbound edge, then as a property.
    pub fn attribute(&self, vertex: &Vertex, name: &str) -> Result<Attribute> {
        if name == "content" || name == "contents" {
            let data = Renderer::new(self.ctx).render(vertex)?;
            if !data.is_empty() {
                return Ok(Attribute::Property(String::from_utf8_lossy(&data).into_owned()));
            }
        }

        let nodes = if name == "inbound" {
            self.inbound(vertex, None)?
        } else if name == "outbound" {
            self.outbound(vertex, None)?
        } else if let Some(edge_id) = name.strip_prefix("inbound__") {
            self.inbound(vertex, Some(edge_id))?
        } else if let Some(edge_id) = name.strip_prefix("outbound__") {
            self.outbound(vertex, Some(edge_id))?
        } else {
            self.outbound(vertex, Some(name))?
        };

        let mut nodes = nodes;
        Ok(match nodes.len() {
            0 => vertex.get(name).map_or(Attribute::Missing, Attribute::Property),
            1 => Attribute::SingleEdge(nodes.remove(0)),
            _ => Attribute::MultiEdge(nodes),
        })
    }
}
