//! The query backend interface consumed by the engine.
//!
//! A backend owns all graph state. Every method is one request; the engine
//! never caches results across calls and never holds a lock between them.
//! Implementations must serialise individual writes but are not expected to
//! provide isolation across several calls.

use super::types::{Direction, Edge, EdgeFilter, EdgeId, NewEdge, NewVertex, PathStep, Vertex, VertexId};
use crate::error::Result;
use std::collections::VecDeque;

/// Graph traversal and mutation requests.
pub trait QueryBackend: Send + Sync {
    /// Fetch a vertex by backend id.
    fn vertex(&self, id: VertexId) -> Result<Option<Vertex>>;

    /// Fetch a vertex by UUID, optionally requiring a label.
    fn vertex_by_uuid(&self, uuid: &str, label: Option<&str>) -> Result<Option<Vertex>>;

    /// Fetch an edge by backend id.
    fn edge(&self, id: EdgeId) -> Result<Option<Edge>>;

    /// All vertices, optionally restricted to one label, in id order.
    fn vertices(&self, label: Option<&str>) -> Result<Vec<Vertex>>;

    /// Vertices that have no outbound edge labelled `label`.
    fn vertices_without_out_edge(&self, label: &str) -> Result<Vec<Vertex>>;

    /// Edges adjacent to `vertex` in `direction` that pass `filter`, in id order.
    fn edges_of(&self, vertex: VertexId, direction: Direction, filter: &EdgeFilter) -> Result<Vec<Edge>>;

    /// Distinct vertex labels present in the graph, sorted.
    fn labels(&self) -> Result<Vec<String>>;

    /// Create a vertex.
    fn add_vertex(&self, vertex: NewVertex) -> Result<Vertex>;

    /// Remove a vertex and its incident edges. Other vertices are untouched.
    fn remove_vertex(&self, id: VertexId) -> Result<()>;

    /// Create an edge between two existing vertices.
    fn add_edge(&self, edge: NewEdge) -> Result<Edge>;

    /// Remove an edge.
    fn remove_edge(&self, id: EdgeId) -> Result<()>;

    /// Write one core field or custom property of a vertex.
    fn set_property(&self, vertex: VertexId, key: &str, value: &str) -> Result<()>;

    /// Drop one custom property of a vertex.
    fn remove_property(&self, vertex: VertexId, key: &str) -> Result<()>;

    /// Bounded repeat traversal along inbound edges.
    ///
    /// Emits the start path `[start]` and every path
    /// `[start, e1, v1, e2, v2, ...]` obtained by repeatedly following an
    /// inbound edge to its source vertex, breadth first, stopping a branch at
    /// a vertex with no inbound edges or after `max_depth` hops. A path never
    /// revisits one of its own vertices, so self-loops and cycles end it.
    fn inbound_paths(&self, start: VertexId, max_depth: usize) -> Result<Vec<Vec<PathStep>>> {
        let mut paths = Vec::new();
        let Some(origin) = self.vertex(start)? else {
            return Ok(paths);
        };

        let mut queue = VecDeque::new();
        let first = vec![PathStep::Vertex(origin)];
        paths.push(first.clone());
        queue.push_back((first, start, 0usize));

        while let Some((path, current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }

            for edge in self.edges_of(current, Direction::Inbound, &EdgeFilter::any())? {
                if on_path(&path, edge.source) {
                    continue;
                }
                let Some(source) = self.vertex(edge.source)? else {
                    continue;
                };
                let source_id = source.id;
                let mut next = path.clone();
                next.push(PathStep::Edge(edge));
                next.push(PathStep::Vertex(source));
                paths.push(next.clone());
                queue.push_back((next, source_id, depth + 1));
            }
        }

        Ok(paths)
    }
}

fn on_path(path: &[PathStep], id: VertexId) -> bool {
    path.iter()
        .any(|step| matches!(step, PathStep::Vertex(v) if v.id == id))
}
