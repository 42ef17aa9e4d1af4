//! Filesystem operations over resolved matches.
//!
//! [`GraphFs`] is the call surface a syscall binding drives: resolve a path,
//! then run one operation against the [`Match`]. Every operation checks the
//! match's existence and type first and fails with the corresponding
//! filesystem error kind. Backend failures in between are logged and
//! reported as [`GraphError::DoesNotExist`] for the path.

use crate::codec;
use crate::config::FsType;
use crate::context::FsContext;
use crate::error::{GraphError, Result};
use crate::event::{Event, EventKind};
use crate::graph::{Direction, Edge, Vertex, DEFAULT_LABEL};
use crate::node::{decode_data, encode_data, unix_now, NodeSpec, Nodes};
use crate::path::{Match, MatchKind, Resolver};
use crate::render::Renderer;
use log::{debug, error, warn};

/// Overwrite part of `old` with `data` at `offset`.
///
/// Absent or empty `old` takes `data` only at offset zero; otherwise the
/// write is a no-op and `None` is returned. Empty `data`, a negative offset
/// or an offset past the end leave `old` unchanged. The result never gets
/// padding and only grows by the part of `data` that runs past the end.
pub fn splice(old: Option<&[u8]>, data: &[u8], offset: i64) -> Option<Vec<u8>> {
    let old = match old {
        Some(old) if !old.is_empty() => old,
        _ => return (offset == 0 && !data.is_empty()).then(|| data.to_vec()),
    };
    if data.is_empty() || offset < 0 || offset as usize > old.len() {
        return Some(old.to_vec());
    }

    let offset = offset as usize;
    let end = offset + data.len();
    let mut out = Vec::with_capacity(old.len().max(end));
    out.extend_from_slice(&old[..offset]);
    out.extend_from_slice(data);
    if old.len() > end {
        out.extend_from_slice(&old[end..]);
    }
    Some(out)
}

/// Vertex fields that no filesystem operation may rewrite.
const IDENTITY_FIELDS: [&str; 2] = ["id", "uuid"];

/// Text if `data` is UTF-8, else the base64 storage encoding.
fn property_text(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => encode_data(data),
    }
}

/// File attributes reported by [`GraphFs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Entry type
    pub kind: FsType,
    /// Permission bits
    pub mode: u32,
    /// Owner uid
    pub owner: u32,
    /// Owner gid
    pub group: u32,
    /// Content length in bytes
    pub size: u64,
    /// Creation time, Unix seconds
    pub created: i64,
    /// Last modification, Unix seconds
    pub modified: i64,
}

/// The filesystem call surface.
///
/// # Example
///
/// ```
/// use graphfs::{Config, FsContext, GraphFs, GraphStore};
/// use std::sync::Arc;
///
/// let ctx = FsContext::new(Config::default(), Arc::new(GraphStore::in_memory().unwrap()));
/// let fs = GraphFs::new(ctx);
///
/// fs.create_folder(&fs.resolve("/docs").unwrap()).unwrap();
/// fs.create_file(&fs.resolve("/docs/notes.txt").unwrap(), b"hello").unwrap();
///
/// let m = fs.resolve("/docs/notes.txt").unwrap();
/// fs.write_file(&m, b"XY", 1).unwrap();
/// assert_eq!(fs.read_file(&m, None, 0).unwrap(), b"hXYlo");
/// ```
#[derive(Debug, Clone)]
pub struct GraphFs {
    ctx: FsContext,
}

impl GraphFs {
    /// Wrap a context.
    pub fn new(ctx: FsContext) -> Self {
        Self { ctx }
    }

    /// The shared context.
    pub fn context(&self) -> &FsContext {
        &self.ctx
    }

    fn nodes(&self) -> Nodes<'_> {
        Nodes::new(&self.ctx)
    }

    /// Resolve a path. See [`Resolver::resolve`].
    pub fn resolve(&self, path: &str) -> Result<Match> {
        Resolver::new(&self.ctx).resolve(path)
    }

    /// Run `op` for `m`, reporting backend failures as `DoesNotExist`.
    fn guarded<T>(&self, m: &Match, op: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        f().map_err(|e| {
            if e.is_filesystem_kind() {
                e
            } else {
                error!("{op} failed for {}: {e}", m.path());
                GraphError::not_found(m.path())
            }
        })
    }

    fn require_found(m: &Match) -> Result<()> {
        if m.is_found() {
            Ok(())
        } else {
            Err(GraphError::not_found(m.path()))
        }
    }

    /// Refuse writes to the identity fields of a vertex.
    fn require_writable(m: &Match, key: &str) -> Result<()> {
        if IDENTITY_FIELDS.contains(&key) {
            warn!("Refusing to rewrite {key} of {}", m.path());
            return Err(GraphError::not_permitted(m.path()));
        }
        Ok(())
    }

    fn require_absent(m: &Match) -> Result<()> {
        if !m.parent_resolved() {
            return Err(GraphError::not_found(m.path()));
        }
        if m.is_found() {
            return Err(GraphError::exists(m.path()));
        }
        Ok(())
    }

    fn emit_node(&self, kind: EventKind, vertex: &Vertex) {
        let vertex = self.nodes().refresh(vertex).unwrap_or_else(|_| vertex.clone());
        self.ctx.emit(Event::node(kind, vertex));
    }

    fn emit_link(&self, kind: EventKind, edge: Edge) {
        let nodes = self.nodes();
        let source = nodes.get(edge.source).ok().flatten();
        let target = nodes.get(edge.target).ok().flatten();
        self.ctx.emit(Event::link(kind, edge, source, target));
    }

    // Folders

    /// Create a folder vertex at `m`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if `m` resolves, `DoesNotExist` if its parent does not,
    /// `IsAFile` for file-typed locations.
    pub fn create_folder(&self, m: &Match) -> Result<Vertex> {
        self.guarded(m, "create_folder", || {
            Self::require_absent(m)?;
            let default_label = self.ctx.config.folder_label.clone();
            match m.kind {
                MatchKind::AtPath | MatchKind::Vertex => self.create_vertex(m, FsType::Folder, &default_label, None),
                MatchKind::VertexProperty | MatchKind::VertexLabel => Err(GraphError::IsAFile { path: m.path() }),
                _ => Err(GraphError::not_found(m.path())),
            }
        })
    }

    /// Entry names of the folder at `m`.
    pub fn read_folder(&self, m: &Match) -> Result<Vec<String>> {
        self.guarded(m, "read_folder", || {
            Self::require_found(m)?;
            if !m.is_folder() {
                return Err(GraphError::IsAFile { path: m.path() });
            }

            let config = &self.ctx.config;
            let nodes = self.nodes();
            let mut entries = Vec::new();
            match m.kind {
                MatchKind::Root => {
                    entries.push(config.vertex_folder.clone());
                    entries.push(config.label_folder.clone());
                    for child in Resolver::new(&self.ctx).children(None)? {
                        entries.push(child.to_id(true));
                    }
                }
                MatchKind::AtPath => {
                    entries.push(config.vertex_folder.clone());
                    for child in nodes.children(m.node.as_ref())? {
                        entries.push(child.to_id(true));
                    }
                }
                MatchKind::VertexLabels => entries.extend(self.ctx.backend.labels()?),
                MatchKind::Vertexes => {
                    let label = (m.vertex_label != DEFAULT_LABEL).then_some(m.vertex_label.as_str());
                    match &m.parent {
                        Some(parent) => {
                            for child in nodes.children(Some(parent))? {
                                if label.map_or(true, |l| child.label == l) {
                                    entries.push(child.to_id(true));
                                }
                            }
                        }
                        None => {
                            for vertex in self.ctx.backend.vertices(label)? {
                                entries.push(vertex.to_id(false));
                            }
                        }
                    }
                }
                MatchKind::Vertex => {
                    let node = m.require_node()?;
                    entries.extend(node.all().into_keys());
                    entries.push(config.in_edge_folder.clone());
                    entries.push(config.out_edge_folder.clone());
                    for edge in nodes.edges(node, None, Direction::Outbound)? {
                        entries.push(edge.to_id());
                    }
                }
                MatchKind::VertexInEdges | MatchKind::VertexOutEdges => {
                    let direction = if m.kind == MatchKind::VertexInEdges {
                        Direction::Inbound
                    } else {
                        Direction::Outbound
                    };
                    for edge in nodes.edges(m.require_node()?, None, direction)? {
                        entries.push(edge.to_id());
                    }
                }
                _ => return Err(GraphError::IsAFile { path: m.path() }),
            }

            let mut seen = std::collections::HashSet::new();
            entries.retain(|e| seen.insert(e.clone()));
            Ok(entries)
        })
    }

    /// Rename or move the folder at `m` to the location `target`.
    pub fn rename_folder(&self, m: &Match, target: &Match) -> Result<()> {
        if m.is_found() && !m.is_folder() {
            return Err(GraphError::IsAFile { path: m.path() });
        }
        self.move_node(m, target)
    }

    /// Remove the folder at `m`. Its children are left in place.
    pub fn delete_folder(&self, m: &Match) -> Result<()> {
        if m.is_found() && !m.is_folder() {
            return Err(GraphError::IsAFile { path: m.path() });
        }
        self.delete_node(m)
    }

    // Files

    /// Create a file at `m` with initial content `data`.
    ///
    /// At a `vertex_property` location this sets the property.
    pub fn create_file(&self, m: &Match, data: &[u8]) -> Result<()> {
        self.guarded(m, "create_file", || {
            Self::require_absent(m)?;
            match m.kind {
                MatchKind::AtPath | MatchKind::Vertex => {
                    let content = (!data.is_empty()).then_some(data);
                    self.create_vertex(m, FsType::File, DEFAULT_LABEL, content)?;
                    Ok(())
                }
                MatchKind::VertexProperty => {
                    let mut node = m.require_node()?.clone();
                    let key = m.vertex_property.as_deref().unwrap_or_default();
                    debug!("Creating property {key} on vertex {}", node.id);
                    self.nodes().set_property(&mut node, key, &property_text(data))?;
                    self.emit_node(EventKind::UpdateNode, &node);
                    Ok(())
                }
                _ if m.is_folder() => Err(GraphError::IsAFolder { path: m.path() }),
                _ => Err(GraphError::not_found(m.path())),
            }
        })
    }

    /// Read up to `size` bytes of the file at `m` from `offset`.
    pub fn read_file(&self, m: &Match, size: Option<usize>, offset: usize) -> Result<Vec<u8>> {
        let content = self.guarded(m, "read_file", || self.content(m))?;
        let start = offset.min(content.len());
        let end = size.map_or(content.len(), |size| start.saturating_add(size).min(content.len()));
        Ok(content[start..end].to_vec())
    }

    /// Length of the file content at `m`.
    pub fn read_file_length(&self, m: &Match) -> Result<u64> {
        let content = self.guarded(m, "read_file_length", || self.content(m))?;
        Ok(content.len() as u64)
    }

    /// Splice `data` into the file at `m` at `offset`; see [`splice`].
    pub fn write_file(&self, m: &Match, data: &[u8], offset: i64) -> Result<()> {
        self.guarded(m, "write_file", || {
            Self::require_found(m)?;
            if m.is_folder() {
                return Err(GraphError::IsAFolder { path: m.path() });
            }
            match m.kind {
                MatchKind::AtPath => {
                    let key = self.ctx.config.data_property.clone();
                    let mut node = self.nodes().refresh(m.require_node()?)?;
                    let old = self.nodes().read_property(&node, &key);
                    if let Some(new) = splice(old.as_deref(), data, offset) {
                        self.store_content(&mut node, &new)?;
                    }
                    Ok(())
                }
                MatchKind::VertexProperty => {
                    let key = m.vertex_property.as_deref().unwrap_or_default();
                    Self::require_writable(m, key)?;
                    let mut node = self.nodes().refresh(m.require_node()?)?;
                    let old = node.get(key).map(|value| decode_data(&value));
                    if let Some(new) = splice(old.as_deref(), data, offset) {
                        debug!("Writing {} bytes to property {key} of vertex {}", new.len(), node.id);
                        self.nodes().set_property(&mut node, key, &property_text(&new))?;
                        self.emit_node(EventKind::UpdateNode, &node);
                    }
                    Ok(())
                }
                _ => Err(GraphError::not_found(m.path())),
            }
        })
    }

    /// Truncate the file at `m` to nothing.
    pub fn clear_file(&self, m: &Match) -> Result<()> {
        self.guarded(m, "clear_file", || {
            Self::require_found(m)?;
            if m.is_folder() {
                return Err(GraphError::IsAFolder { path: m.path() });
            }
            match m.kind {
                MatchKind::AtPath => {
                    let mut node = m.require_node()?.clone();
                    self.store_content(&mut node, b"")
                }
                MatchKind::VertexProperty => {
                    let mut node = m.require_node()?.clone();
                    let key = m.vertex_property.as_deref().unwrap_or_default();
                    Self::require_writable(m, key)?;
                    self.nodes().set_property(&mut node, key, "")?;
                    self.emit_node(EventKind::UpdateNode, &node);
                    Ok(())
                }
                _ => Err(GraphError::not_found(m.path())),
            }
        })
    }

    /// Rename or move the file at `m` to the location `target`.
    pub fn rename_file(&self, m: &Match, target: &Match) -> Result<()> {
        if m.is_found() && m.is_folder() {
            return Err(GraphError::IsAFolder { path: m.path() });
        }
        self.move_node(m, target)
    }

    /// Remove the file at `m`.
    pub fn delete_file(&self, m: &Match) -> Result<()> {
        if m.is_found() && m.is_folder() {
            return Err(GraphError::IsAFolder { path: m.path() });
        }
        self.delete_node(m)
    }

    // Links

    /// Create the link `m` pointing at `target`.
    ///
    /// `m` names the new edge: a `vertex_property` or `vertex_out_edge`
    /// location makes an edge from `m`'s vertex to `target`'s, a
    /// `vertex_in_edge` location the reverse. The entry name gives the edge
    /// label and optional name (`name@label`); a bare name is the label.
    pub fn create_link(&self, m: &Match, target: &Match) -> Result<Edge> {
        self.guarded(m, "create_link", || {
            Self::require_absent(m)?;
            let node = m.require_node()?;
            let Some(other) = target.node.as_ref() else {
                return Err(GraphError::not_found(target.path()));
            };

            let (entry, source, dest) = match m.kind {
                MatchKind::VertexProperty => (m.vertex_property.as_deref(), node, other),
                MatchKind::VertexOutEdge => (m.vertex_edge.as_deref(), node, other),
                MatchKind::VertexInEdge => (m.vertex_edge.as_deref(), other, node),
                _ => return Err(GraphError::not_found(m.path())),
            };
            let (name, label) = codec::parse_edge(entry.unwrap_or_default());

            let edge = self.nodes().create_link(source, dest, &label, name.as_deref())?;
            self.ctx
                .emit(Event::link(EventKind::CreateLink, edge.clone(), Some(source.clone()), Some(dest.clone())));
            Ok(edge)
        })
    }

    /// Absolute path of the vertex at the far end of the link `m`.
    ///
    /// The path follows the hierarchy from the filesystem root, prefixed by
    /// the configured mount point. A vertex outside the hierarchy below a
    /// configured root is addressed through the vertex folder instead.
    pub fn read_link(&self, m: &Match) -> Result<String> {
        self.guarded(m, "read_link", || {
            Self::require_found(m)?;
            let far = self.link_target(m)?;
            self.absolute_path(&far)
        })
    }

    /// Remove the edge(s) named by the link `m`.
    ///
    /// # Errors
    ///
    /// `DoesNotExist` when no edge stands behind `m`, as for a plain
    /// property entry.
    pub fn delete_link(&self, m: &Match) -> Result<()> {
        self.guarded(m, "delete_link", || {
            Self::require_found(m)?;
            let node = m.require_node()?;
            if m.edge.is_none() {
                return Err(GraphError::not_found(m.path()));
            }
            let (entry, direction) = match m.kind {
                MatchKind::VertexProperty => (m.vertex_property.as_deref(), Direction::Outbound),
                MatchKind::VertexOutEdge => (m.vertex_edge.as_deref(), Direction::Outbound),
                MatchKind::VertexInEdge => (m.vertex_edge.as_deref(), Direction::Inbound),
                _ => return Err(GraphError::not_found(m.path())),
            };
            let (name, label) = codec::parse_edge(entry.unwrap_or_default());

            let removed = self.nodes().delete_link(node, &label, name.as_deref(), direction)?;
            if removed.is_empty() {
                return Err(GraphError::not_found(m.path()));
            }
            for edge in removed {
                self.emit_link(EventKind::DeleteLink, edge);
            }
            Ok(())
        })
    }

    // Properties

    /// Read a core field or custom property of the vertex at `m`.
    pub fn get_property(&self, m: &Match, key: &str) -> Result<Option<String>> {
        Self::require_found(m)?;
        match (m.kind, &m.node) {
            (MatchKind::AtPath, Some(node)) => Ok(node.get(key)),
            _ => Err(GraphError::not_found(m.path())),
        }
    }

    /// Write a core field or custom property of the vertex at `m`.
    ///
    /// # Errors
    ///
    /// `NotPermitted` for the identity fields `id` and `uuid`.
    pub fn set_property(&self, m: &Match, key: &str, value: &str) -> Result<()> {
        self.guarded(m, "set_property", || {
            Self::require_found(m)?;
            Self::require_writable(m, key)?;
            match (m.kind, &m.node) {
                (MatchKind::AtPath, Some(node)) => {
                    let mut node = node.clone();
                    self.nodes().set_property(&mut node, key, value)?;
                    self.emit_node(EventKind::UpdateNode, &node);
                    Ok(())
                }
                _ => Err(GraphError::not_found(m.path())),
            }
        })
    }

    /// Attributes of the entry at `m`.
    pub fn stat(&self, m: &Match) -> Result<Metadata> {
        self.guarded(m, "stat", || {
            Self::require_found(m)?;
            let config = &self.ctx.config;
            let kind = m.fs_type().unwrap_or(FsType::File);
            let size = match kind {
                FsType::File => self.content(m)?.len() as u64,
                FsType::Link => self.read_link(m)?.len() as u64,
                FsType::Folder => 0,
            };
            let node = match m.kind {
                MatchKind::AtPath | MatchKind::Vertex | MatchKind::VertexProperty => m.node.as_ref(),
                _ => None,
            };
            Ok(match node {
                Some(node) => Metadata {
                    kind,
                    mode: node.mode,
                    owner: node.owner,
                    group: node.group,
                    size,
                    created: node.created,
                    modified: node.modified,
                },
                None => Metadata {
                    kind,
                    mode: config.default_mode,
                    owner: config.default_uid,
                    group: config.default_gid,
                    size,
                    created: 0,
                    modified: 0,
                },
            })
        })
    }

    // Shared steps

    fn create_vertex(&self, m: &Match, fs_type: FsType, default_label: &str, data: Option<&[u8]>) -> Result<Vertex> {
        let entry = match m.kind {
            MatchKind::Vertex => m.vertex_id.as_deref(),
            _ => m.name.as_deref(),
        };
        let restricted = m.kind == MatchKind::Vertex && m.vertex_label != DEFAULT_LABEL;
        let default_label = if restricted { m.vertex_label.as_str() } else { default_label };
        let Some(spec) = entry.and_then(|e| NodeSpec::infer(&self.ctx, e, fs_type, default_label)) else {
            return Err(GraphError::not_found(m.path()));
        };
        if restricted && spec.label != m.vertex_label {
            warn!("Refusing to create {} label {} under {}", spec.name, spec.label, m.vertex_label);
            return Err(GraphError::not_found(m.path()));
        }

        let folder = fs_type == FsType::Folder;
        if self.ctx.config.is_folder_label(&spec.label) != folder {
            warn!("Refusing to create {fs_type} {} with label {}", spec.name, spec.label);
            return Err(GraphError::not_found(m.path()));
        }

        let nodes = self.nodes();
        let mut vertex = nodes.create(spec, m.parent.as_ref(), folder)?;
        if let Some(data) = data {
            nodes.write_property(&mut vertex, &self.ctx.config.data_property, data)?;
        }
        self.emit_node(EventKind::CreateNode, &vertex);
        Ok(vertex)
    }

    /// Store whole-file content, bump `modified` and run the write hook.
    fn store_content(&self, node: &mut Vertex, data: &[u8]) -> Result<()> {
        let nodes = self.nodes();
        debug!("Writing {} bytes to vertex {}", data.len(), node.id);
        nodes.write_property(node, &self.ctx.config.data_property, data)?;
        nodes.set_property(node, "modified", &unix_now().to_string())?;
        self.emit_node(EventKind::UpdateNode, node);

        if let Some(hook) = self
            .ctx
            .config
            .label_rule(&node.label)
            .and_then(|rule| rule.write_hook())
        {
            if let Err(e) = hook(node, data) {
                warn!("Write hook failed for {}: {e}", node.to_id(false));
            }
        }
        Ok(())
    }

    fn content(&self, m: &Match) -> Result<Vec<u8>> {
        Self::require_found(m)?;
        if m.is_folder() {
            return Err(GraphError::IsAFolder { path: m.path() });
        }
        match m.kind {
            MatchKind::AtPath => Renderer::new(&self.ctx).render(m.require_node()?),
            MatchKind::VertexProperty => {
                let node = m.require_node()?;
                let key = m.vertex_property.as_deref().unwrap_or_default();
                match node.get(key) {
                    Some(value) => Ok(decode_data(&value)),
                    None => Ok(self.link_target(m)?.to_id(false).into_bytes()),
                }
            }
            MatchKind::VertexLabel => {
                let mut text = String::new();
                for vertex in self.ctx.backend.vertices(Some(m.vertex_label.as_str()))? {
                    text.push_str(&vertex.to_id(false));
                    text.push('\n');
                }
                Ok(text.into_bytes())
            }
            MatchKind::VertexInEdge | MatchKind::VertexOutEdge => Ok(self.read_link(m)?.into_bytes()),
            _ => Err(GraphError::not_found(m.path())),
        }
    }

    fn link_target(&self, m: &Match) -> Result<Vertex> {
        let node = m.require_node()?;
        let Some(edge) = &m.edge else {
            return Err(GraphError::not_found(m.path()));
        };
        let far = match m.kind {
            MatchKind::VertexInEdge => edge.source,
            MatchKind::VertexOutEdge | MatchKind::VertexProperty => edge.target,
            _ => edge.other(node.id),
        };
        self.nodes()
            .get(far)?
            .ok_or_else(|| GraphError::not_found(m.path()))
    }

    fn absolute_path(&self, vertex: &Vertex) -> Result<String> {
        let config = &self.ctx.config;
        let mount = config.mount_point.trim_end_matches('/');
        let mut chain = self.nodes().path(vertex)?;

        if let Some(root) = Resolver::new(&self.ctx).root()? {
            match chain.iter().position(|v| v.id == root.id) {
                Some(index) => {
                    chain.drain(..=index);
                }
                None => return Ok(format!("{mount}/{}/{}", config.vertex_folder, vertex.to_id(false))),
            }
        }

        let names: Vec<String> = chain.iter().map(|v| v.to_id(true)).collect();
        Ok(format!("{mount}/{}", names.join("/")))
    }

    fn move_node(&self, m: &Match, target: &Match) -> Result<()> {
        self.guarded(m, "move", || {
            Self::require_found(m)?;
            Self::require_absent(target)?;
            let nodes = self.nodes();
            match (m.kind, target.kind) {
                (MatchKind::AtPath, MatchKind::AtPath) => {
                    let mut node = m.require_node()?.clone();
                    if let Some(name) = target.name.as_deref() {
                        if name != node.name {
                            nodes.rename(&mut node, name)?;
                        }
                    }
                    let same_parent = m.parent.as_ref().map(|p| p.id) == target.parent.as_ref().map(|p| p.id);
                    if !same_parent {
                        nodes.move_to(&node, target.parent.as_ref())?;
                    }
                    self.emit_node(EventKind::UpdateNode, &node);
                    Ok(())
                }
                (MatchKind::VertexProperty, MatchKind::VertexProperty) => {
                    let mut source = nodes.refresh(m.require_node()?)?;
                    let source_key = m.vertex_property.as_deref().unwrap_or_default();
                    let target_key = target.vertex_property.as_deref().unwrap_or_default();
                    let value = source
                        .get(source_key)
                        .ok_or_else(|| GraphError::not_found(m.path()))?;

                    let mut dest = nodes.refresh(target.require_node()?)?;
                    nodes.set_property(&mut dest, target_key, &value)?;
                    let copied = nodes.refresh(&dest)?.get(target_key);
                    if copied.as_deref() != Some(value.as_str()) {
                        return Err(GraphError::Consistency {
                            message: format!("copy of {} to {} did not verify", m.path(), target.path()),
                        });
                    }

                    if source.id == dest.id {
                        source = dest.clone();
                    }
                    nodes.unset_property(&mut source, source_key)?;
                    self.emit_node(EventKind::UpdateNode, &dest);
                    if source.id != dest.id {
                        self.emit_node(EventKind::UpdateNode, &source);
                    }
                    Ok(())
                }
                _ => Err(GraphError::not_found(target.path())),
            }
        })
    }

    fn delete_node(&self, m: &Match) -> Result<()> {
        self.guarded(m, "delete", || {
            Self::require_found(m)?;
            match m.kind {
                MatchKind::AtPath | MatchKind::Vertex => {
                    let node = m.require_node()?;
                    self.nodes().delete(node)?;
                    self.ctx.emit(Event::node(EventKind::DeleteNode, node.clone()));
                    Ok(())
                }
                MatchKind::VertexProperty => {
                    let mut node = m.require_node()?.clone();
                    let key = m.vertex_property.as_deref().unwrap_or_default();
                    if node.properties.contains_key(key) {
                        self.nodes().unset_property(&mut node, key)?;
                        self.emit_node(EventKind::UpdateNode, &node);
                        Ok(())
                    } else if node.has(key) {
                        Err(GraphError::not_permitted(m.path()))
                    } else {
                        // Only the outbound edge of that name supplies the entry.
                        self.delete_link(m)
                    }
                }
                MatchKind::VertexInEdge | MatchKind::VertexOutEdge => self.delete_link(m),
                _ => Err(GraphError::not_found(m.path())),
            }
        })
    }
}
