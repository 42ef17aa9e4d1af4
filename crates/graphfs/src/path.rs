//! Path resolution: from a `/`-delimited path to a [`Match`].
//!
//! Paths are read in one of two modes. Without the vertex-folder marker
//! each segment names a hierarchy child, starting at the filesystem root.
//! With the marker, the segments after it address a vertex directly, then
//! its properties and edge folders:
//!
//! ```text
//! /a/b                      atpath
//! /a/.V                     vertexes under a
//! /.V/<id>                  vertex
//! /.V/<id>/<property>       vertex_property
//! /.V/<id>/IN | OUT         vertex_in_edges | vertex_out_edges
//! /.V/<id>/IN/<edge>        vertex_in_edge
//! /.L                       vertex_labels
//! /.L/<label>               vertex_label
//! /.L/<label>/.V/...        as /.V/..., restricted to <label>
//! ```

use crate::config::FsType;
use crate::context::FsContext;
use crate::error::{GraphError, Result};
use crate::graph::{Direction, Edge, Vertex, DEFAULT_LABEL};
use crate::codec;
use crate::node::Nodes;
use log::{debug, error, trace};

/// Location kinds a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// The filesystem root
    Root,
    /// A point in the user hierarchy
    AtPath,
    /// Listing of vertex labels
    VertexLabels,
    /// Vertices carrying one label
    VertexLabel,
    /// Listing of vertices
    Vertexes,
    /// One directly addressed vertex
    Vertex,
    /// One property of a vertex
    VertexProperty,
    /// Inbound edges of a vertex
    VertexInEdges,
    /// Outbound edges of a vertex
    VertexOutEdges,
    /// One inbound edge
    VertexInEdge,
    /// One outbound edge
    VertexOutEdge,
}

/// Static properties of a [`MatchKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo {
    /// Kind described
    pub kind: MatchKind,
    /// Name used in logs
    pub name: &'static str,
    /// Entry type; `None` when it depends on the resolved vertex
    pub fs_type: Option<FsType>,
    /// Trace resolution of this kind
    pub debug: bool,
}

static KIND_TABLE: [KindInfo; 11] = [
    KindInfo { kind: MatchKind::Root, name: "root", fs_type: Some(FsType::Folder), debug: false },
    KindInfo { kind: MatchKind::AtPath, name: "atpath", fs_type: None, debug: false },
    KindInfo { kind: MatchKind::VertexLabels, name: "vertex_labels", fs_type: Some(FsType::Folder), debug: false },
    KindInfo { kind: MatchKind::VertexLabel, name: "vertex_label", fs_type: Some(FsType::File), debug: false },
    KindInfo { kind: MatchKind::Vertexes, name: "vertexes", fs_type: Some(FsType::Folder), debug: false },
    KindInfo { kind: MatchKind::Vertex, name: "vertex", fs_type: Some(FsType::Folder), debug: false },
    KindInfo { kind: MatchKind::VertexProperty, name: "vertex_property", fs_type: Some(FsType::File), debug: false },
    KindInfo { kind: MatchKind::VertexInEdges, name: "vertex_in_edges", fs_type: Some(FsType::Folder), debug: false },
    KindInfo { kind: MatchKind::VertexOutEdges, name: "vertex_out_edges", fs_type: Some(FsType::Folder), debug: false },
    KindInfo { kind: MatchKind::VertexInEdge, name: "vertex_in_edge", fs_type: Some(FsType::Link), debug: true },
    KindInfo { kind: MatchKind::VertexOutEdge, name: "vertex_out_edge", fs_type: Some(FsType::Link), debug: true },
];

impl MatchKind {
    /// Table entry for this kind.
    pub fn info(self) -> &'static KindInfo {
        &KIND_TABLE[self as usize]
    }

    /// Name used in logs.
    pub fn as_str(self) -> &'static str {
        self.info().name
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved path. Built fresh for every call and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// Location kind
    pub kind: MatchKind,
    /// Path segments
    pub segments: Vec<String>,
    /// Resolved parent vertex
    pub parent: Option<Vertex>,
    /// Resolved vertex
    pub node: Option<Vertex>,
    /// Last segment of a hierarchy path
    pub name: Option<String>,
    /// Label the match is restricted to
    pub vertex_label: String,
    /// Vertex identifier segment
    pub vertex_id: Option<String>,
    /// Property name segment
    pub vertex_property: Option<String>,
    /// Edge identifier segment
    pub vertex_edge: Option<String>,
    /// Edge addressed by an edge kind, or aliased by a property
    pub edge: Option<Edge>,
    fs_type: Option<FsType>,
    parent_resolved: bool,
}

impl Match {
    fn new(kind: MatchKind, segments: Vec<String>) -> Self {
        Self {
            kind,
            segments,
            parent: None,
            node: None,
            name: None,
            vertex_label: DEFAULT_LABEL.to_string(),
            vertex_id: None,
            vertex_property: None,
            vertex_edge: None,
            edge: None,
            fs_type: kind.info().fs_type,
            parent_resolved: true,
        }
    }

    /// The absolute path this match was resolved from.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Entry type, if known.
    pub fn fs_type(&self) -> Option<FsType> {
        self.fs_type
    }

    /// True for directories.
    pub fn is_folder(&self) -> bool {
        self.fs_type == Some(FsType::Folder)
    }

    /// True for regular files.
    pub fn is_file(&self) -> bool {
        self.fs_type == Some(FsType::File)
    }

    /// True for symbolic links.
    pub fn is_link(&self) -> bool {
        self.fs_type == Some(FsType::Link)
    }

    /// False when a path prefix that should name the parent did not resolve.
    pub fn parent_resolved(&self) -> bool {
        self.parent_resolved
    }

    /// Whether the addressed entry exists.
    pub fn is_found(&self) -> bool {
        if !self.parent_resolved {
            return false;
        }
        match self.kind {
            MatchKind::AtPath | MatchKind::Vertex => self.node.is_some(),
            MatchKind::VertexProperty => match (&self.node, &self.vertex_property) {
                (Some(node), Some(property)) => node.has(property) || self.edge.is_some(),
                _ => false,
            },
            MatchKind::VertexInEdge | MatchKind::VertexOutEdge => self.edge.is_some(),
            MatchKind::VertexInEdges | MatchKind::VertexOutEdges => self.node.is_some(),
            _ => self.fs_type.is_some(),
        }
    }

    /// The resolved vertex, or `DoesNotExist`.
    pub fn require_node(&self) -> Result<&Vertex> {
        self.node.as_ref().ok_or_else(|| GraphError::not_found(self.path()))
    }
}

/// Split a path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Path resolver bound to one context.
pub struct Resolver<'a> {
    ctx: &'a FsContext,
    nodes: Nodes<'a>,
}

impl<'a> Resolver<'a> {
    /// Bind to a context.
    pub fn new(ctx: &'a FsContext) -> Self {
        Self {
            ctx,
            nodes: Nodes::new(ctx),
        }
    }

    /// Classify `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DoesNotExist`] for paths no kind can address,
    /// and in place of any backend failure.
    pub fn resolve(&self, path: &str) -> Result<Match> {
        let resolved = self.classify(split_path(path));
        match resolved {
            Ok(m) => {
                if m.kind.info().debug {
                    debug!("Resolved {path} as {} (found={})", m.kind, m.is_found());
                } else {
                    trace!("Resolved {path} as {} (found={})", m.kind, m.is_found());
                }
                Ok(m)
            }
            Err(e) if e.is_filesystem_kind() => Err(e),
            Err(e) => {
                error!("Failed to resolve {path}: {e}");
                Err(GraphError::not_found(path))
            }
        }
    }

    /// The configured filesystem root vertex, if any.
    pub fn root(&self) -> Result<Option<Vertex>> {
        match &self.ctx.config.fs_root {
            Some(id) => self.nodes.load(id),
            None => Ok(None),
        }
    }

    /// Hierarchy children of `node`, or of the filesystem root when `None`.
    pub fn children(&self, node: Option<&Vertex>) -> Result<Vec<Vertex>> {
        match node {
            Some(node) => self.nodes.children(Some(node)),
            None => {
                let root = self.root()?;
                self.nodes.children(root.as_ref())
            }
        }
    }

    /// Walk hierarchy names from the filesystem root.
    ///
    /// Each segment selects the first child whose short identifier equals
    /// it. An empty walk yields the filesystem root.
    pub fn at_path(&self, segments: &[String]) -> Result<Option<Vertex>> {
        let mut current = self.root()?;
        for segment in segments {
            let next = self
                .children(current.as_ref())?
                .into_iter()
                .find(|child| child.to_id(true) == *segment);
            match next {
                Some(child) => current = Some(child),
                None => return Ok(None),
            }
        }
        Ok(current)
    }

    fn classify(&self, segments: Vec<String>) -> Result<Match> {
        let config = &self.ctx.config;

        if segments.is_empty() {
            return Ok(Match::new(MatchKind::Root, segments));
        }

        if segments[0] == config.label_folder {
            return self.classify_labels(segments);
        }

        if let Some(v) = segments.iter().rposition(|s| *s == config.vertex_folder) {
            let mut m = Match::new(MatchKind::Vertexes, segments.clone());
            if v == 0 {
                m.parent = self.root()?;
            } else {
                m.parent = self.at_path(&segments[..v])?;
                m.parent_resolved = m.parent.is_some();
            }
            return self.classify_vertex(m, v);
        }

        let mut m = Match::new(MatchKind::AtPath, segments.clone());
        let (last, prefix) = segments.split_last().map_or((None, &[][..]), |(l, p)| (Some(l), p));
        m.name = last.cloned();
        m.parent = self.at_path(prefix)?;
        m.parent_resolved = prefix.is_empty() || m.parent.is_some();
        if m.parent_resolved {
            if let Some(last) = last {
                m.node = self
                    .children(m.parent.as_ref())?
                    .into_iter()
                    .find(|child| child.to_id(true) == *last);
            }
        }
        m.fs_type = m.node.as_ref().map(|node| {
            if self.nodes.is_folder(node) {
                FsType::Folder
            } else {
                FsType::File
            }
        });
        Ok(m)
    }

    fn classify_labels(&self, segments: Vec<String>) -> Result<Match> {
        let config = &self.ctx.config;
        match segments.len() {
            1 => Ok(Match::new(MatchKind::VertexLabels, segments)),
            2 => {
                let mut m = Match::new(MatchKind::VertexLabel, segments);
                m.vertex_label = m.segments[1].clone();
                if !self.ctx.backend.labels()?.contains(&m.vertex_label) {
                    m.fs_type = None;
                }
                Ok(m)
            }
            _ if segments[2] == config.vertex_folder => {
                let mut m = Match::new(MatchKind::Vertexes, segments);
                m.vertex_label = m.segments[1].clone();
                self.classify_vertex(m, 2)
            }
            _ => Err(GraphError::not_found(format!("/{}", segments.join("/")))),
        }
    }

    /// Fill in the part of `m` after the vertex-folder marker at index `v`.
    fn classify_vertex(&self, mut m: Match, v: usize) -> Result<Match> {
        let config = &self.ctx.config;
        let rest: Vec<String> = m.segments[v + 1..].to_vec();

        if rest.is_empty() {
            m.kind = MatchKind::Vertexes;
            m.fs_type = MatchKind::Vertexes.info().fs_type;
            return Ok(m);
        }

        m.vertex_id = Some(rest[0].clone());
        m.name = Some(rest[0].clone());
        if m.parent_resolved {
            let top_level = v == 0 || m.segments[0] == config.label_folder;
            m.node = self.path_node(&rest[0], m.parent.as_ref(), &m.vertex_label, top_level)?;
        }

        let kind = match rest.len() {
            1 => MatchKind::Vertex,
            2 if rest[1] == config.in_edge_folder => MatchKind::VertexInEdges,
            2 if rest[1] == config.out_edge_folder => MatchKind::VertexOutEdges,
            2 => {
                m.vertex_property = Some(rest[1].clone());
                if let Some(node) = &m.node {
                    m.edge = self.nodes.edge(node, &rest[1], Direction::Outbound)?;
                }
                MatchKind::VertexProperty
            }
            3 if rest[1] == config.in_edge_folder || rest[1] == config.out_edge_folder => {
                let direction = if rest[1] == config.in_edge_folder {
                    Direction::Inbound
                } else {
                    Direction::Outbound
                };
                m.vertex_edge = Some(rest[2].clone());
                if let Some(node) = &m.node {
                    let (name, label) = codec::parse_edge(&rest[2]);
                    m.edge = self.nodes.get_link(node, &label, name.as_deref(), direction)?;
                }
                match direction {
                    Direction::Inbound => MatchKind::VertexInEdge,
                    Direction::Outbound => MatchKind::VertexOutEdge,
                }
            }
            _ => return Err(GraphError::not_found(m.path())),
        };

        m.kind = kind;
        m.fs_type = kind.info().fs_type;
        Ok(m)
    }

    /// Find the vertex named by `id`: among the children of `parent` by name
    /// or full identifier, or globally by identifier when there is no parent.
    ///
    /// A top-level vertex folder also falls back to the global lookup, so a
    /// full identifier reaches vertices outside a configured root.
    fn path_node(&self, id: &str, parent: Option<&Vertex>, label: &str, top_level: bool) -> Result<Option<Vertex>> {
        let mut node = match parent {
            Some(parent) => self
                .nodes
                .children(Some(parent))?
                .into_iter()
                .find(|child| child.name == id || child.to_id(false) == id),
            None => None,
        };
        if node.is_none() && (parent.is_none() || top_level) {
            node = self.nodes.load(id)?;
        }
        Ok(node.filter(|n| label == DEFAULT_LABEL || n.label == label))
    }
}
