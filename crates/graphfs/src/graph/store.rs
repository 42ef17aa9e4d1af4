//! Reference [`QueryBackend`] over a key/value [`StorageBackend`].

use super::backend::QueryBackend;
use super::types::{Direction, Edge, EdgeFilter, EdgeId, NewEdge, NewVertex, Vertex, VertexId};
use crate::error::{GraphError, Result};
use crate::storage::{
    edge_key, vertex_key, BatchOperation, MemoryStorage, StorageBackend, COUNTERS_KEY, EDGE_PREFIX,
    VERTEX_PREFIX,
};
use log::{debug, info, trace};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Graph store with in-memory indexes and write-through persistence.
///
/// Every vertex and edge lives in memory, indexed by id, by uuid and by
/// adjacency. Each mutation is written to the storage before the indexes are
/// updated. One lock serialises all requests; no lock is held between calls.
pub struct GraphStore {
    inner: RwLock<StoreInner>,
}

struct StoreInner {
    storage: Box<dyn StorageBackend>,
    // Monotonic id generation
    vertex_counter: VertexId,
    edge_counter: EdgeId,
    vertices: BTreeMap<VertexId, Vertex>,
    edges: BTreeMap<EdgeId, Edge>,
    by_uuid: HashMap<String, VertexId>,
    adjacency_out: HashMap<VertexId, BTreeSet<EdgeId>>,
    adjacency_in: HashMap<VertexId, BTreeSet<EdgeId>>,
}

impl GraphStore {
    /// Open a store over the given storage, loading any records it holds.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the storage cannot be read, or
    /// [`GraphError::Serialization`] if a record is malformed.
    pub fn with_backend(storage: Box<dyn StorageBackend>) -> Result<Self> {
        let mut inner = StoreInner {
            storage,
            vertex_counter: 0,
            edge_counter: 0,
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            by_uuid: HashMap::new(),
            adjacency_out: HashMap::new(),
            adjacency_in: HashMap::new(),
        };
        inner.rebuild_from_storage()?;

        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Create a volatile store. All data is lost when it is dropped.
    pub fn in_memory() -> Result<Self> {
        Self::with_backend(Box::new(MemoryStorage::new()))
    }

    /// Open a persistent store at the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the database cannot be opened.
    #[cfg(feature = "rocksdb-backend")]
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        use crate::storage::RocksDBStorage;
        info!("Opening graph store at path: {:?}", path.as_ref());
        let storage = RocksDBStorage::open(path)?;
        Self::with_backend(Box::new(storage))
    }

    /// Number of vertices held.
    pub fn vertex_count(&self) -> usize {
        self.inner.read().vertices.len()
    }

    /// Number of edges held.
    pub fn edge_count(&self) -> usize {
        self.inner.read().edges.len()
    }

    /// Persist the id counters and flush the storage.
    pub fn flush(&self) -> Result<()> {
        debug!("Flushing graph store");
        let mut inner = self.inner.write();
        inner.save_counters()?;
        inner.storage.flush()?;
        trace!("Flush complete");
        Ok(())
    }
}

impl StoreInner {
    fn next_vertex_id(&mut self) -> VertexId {
        let id = self.vertex_counter;
        self.vertex_counter += 1;
        id
    }

    fn next_edge_id(&mut self) -> EdgeId {
        let id = self.edge_counter;
        self.edge_counter += 1;
        id
    }

    fn persist_vertex(&mut self, vertex: &Vertex) -> Result<()> {
        let value = serde_json::to_vec(vertex)
            .map_err(|e| GraphError::serialization("Failed to serialize vertex", Some(e)))?;
        self.storage.put(&vertex_key(vertex.id), &value)
    }

    fn vertex_mut(&mut self, id: VertexId) -> Result<&mut Vertex> {
        self.vertices
            .get_mut(&id)
            .ok_or_else(|| GraphError::not_found(format!("vertex {id}")))
    }

    fn edges_of(&self, vertex: VertexId, direction: Direction) -> Vec<&Edge> {
        let index = match direction {
            Direction::Inbound => &self.adjacency_in,
            Direction::Outbound => &self.adjacency_out,
        };
        index
            .get(&vertex)
            .map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    fn drop_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(&id)?;
        if let Some(out_edges) = self.adjacency_out.get_mut(&edge.source) {
            out_edges.remove(&id);
        }
        if let Some(in_edges) = self.adjacency_in.get_mut(&edge.target) {
            in_edges.remove(&id);
        }
        Some(edge)
    }

    fn index_edge(&mut self, edge: Edge) {
        self.adjacency_out.entry(edge.source).or_default().insert(edge.id);
        self.adjacency_in.entry(edge.target).or_default().insert(edge.id);
        self.edges.insert(edge.id, edge);
    }

    fn save_counters(&mut self) -> Result<()> {
        let counters = serde_json::json!({
            "vertex_counter": self.vertex_counter,
            "edge_counter": self.edge_counter,
        });
        let value = serde_json::to_vec(&counters)
            .map_err(|e| GraphError::serialization("Failed to serialize counters", Some(e)))?;
        self.storage.put(COUNTERS_KEY, &value)
    }

    fn load_counters(&mut self) -> Result<()> {
        if let Some(value) = self.storage.get(COUNTERS_KEY)? {
            let counters: serde_json::Value = serde_json::from_slice(&value)
                .map_err(|e| GraphError::serialization("Failed to deserialize counters", Some(e)))?;

            if let Some(n) = counters.get("vertex_counter").and_then(|v| v.as_u64()) {
                self.vertex_counter = n;
            }
            if let Some(n) = counters.get("edge_counter").and_then(|v| v.as_u64()) {
                self.edge_counter = n;
            }
        }
        Ok(())
    }

    fn rebuild_from_storage(&mut self) -> Result<()> {
        self.load_counters()?;

        for (_, value) in self.storage.scan_prefix(VERTEX_PREFIX.as_bytes())? {
            let vertex: Vertex = serde_json::from_slice(&value)
                .map_err(|e| GraphError::serialization("Failed to deserialize vertex", Some(e)))?;
            // counters may lag behind records written after the last flush
            self.vertex_counter = self.vertex_counter.max(vertex.id + 1);
            self.by_uuid.insert(vertex.uuid.clone(), vertex.id);
            self.vertices.insert(vertex.id, vertex);
        }

        for (_, value) in self.storage.scan_prefix(EDGE_PREFIX.as_bytes())? {
            let edge: Edge = serde_json::from_slice(&value)
                .map_err(|e| GraphError::serialization("Failed to deserialize edge", Some(e)))?;
            self.edge_counter = self.edge_counter.max(edge.id + 1);
            self.index_edge(edge);
        }

        if !self.vertices.is_empty() {
            info!(
                "Loaded {} vertices and {} edges from storage",
                self.vertices.len(),
                self.edges.len()
            );
        }
        Ok(())
    }
}

impl QueryBackend for GraphStore {
    fn vertex(&self, id: VertexId) -> Result<Option<Vertex>> {
        Ok(self.inner.read().vertices.get(&id).cloned())
    }

    fn vertex_by_uuid(&self, uuid: &str, label: Option<&str>) -> Result<Option<Vertex>> {
        let inner = self.inner.read();
        let vertex = inner
            .by_uuid
            .get(uuid)
            .and_then(|id| inner.vertices.get(id))
            .filter(|v| label.map_or(true, |l| v.label == l));
        Ok(vertex.cloned())
    }

    fn edge(&self, id: EdgeId) -> Result<Option<Edge>> {
        Ok(self.inner.read().edges.get(&id).cloned())
    }

    fn vertices(&self, label: Option<&str>) -> Result<Vec<Vertex>> {
        let inner = self.inner.read();
        Ok(inner
            .vertices
            .values()
            .filter(|v| label.map_or(true, |l| v.label == l))
            .cloned()
            .collect())
    }

    fn vertices_without_out_edge(&self, label: &str) -> Result<Vec<Vertex>> {
        let inner = self.inner.read();
        Ok(inner
            .vertices
            .values()
            .filter(|v| {
                !inner
                    .edges_of(v.id, Direction::Outbound)
                    .iter()
                    .any(|e| e.label == label)
            })
            .cloned()
            .collect())
    }

    fn edges_of(&self, vertex: VertexId, direction: Direction, filter: &EdgeFilter) -> Result<Vec<Edge>> {
        let inner = self.inner.read();
        Ok(inner
            .edges_of(vertex, direction)
            .into_iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn labels(&self) -> Result<Vec<String>> {
        let inner = self.inner.read();
        let labels: BTreeSet<&str> = inner.vertices.values().map(|v| v.label.as_str()).collect();
        Ok(labels.into_iter().map(str::to_string).collect())
    }

    fn add_vertex(&self, new: NewVertex) -> Result<Vertex> {
        let mut inner = self.inner.write();
        if inner.by_uuid.contains_key(&new.uuid) {
            return Err(GraphError::exists(format!("vertex {}", new.uuid)));
        }

        let id = inner.next_vertex_id();
        debug!("Adding vertex: id={id}, label={}, name={}", new.label, new.name);
        let vertex = Vertex {
            id,
            uuid: new.uuid,
            label: new.label,
            name: new.name,
            properties: new.properties,
            created: new.created,
            modified: new.created,
            mode: new.mode,
            owner: new.owner,
            group: new.group,
        };

        inner.persist_vertex(&vertex)?;
        inner.by_uuid.insert(vertex.uuid.clone(), id);
        inner.vertices.insert(id, vertex.clone());
        trace!("Vertex {id} added");
        Ok(vertex)
    }

    fn remove_vertex(&self, id: VertexId) -> Result<()> {
        debug!("Removing vertex: id={id}");
        let mut inner = self.inner.write();
        if !inner.vertices.contains_key(&id) {
            return Err(GraphError::not_found(format!("vertex {id}")));
        }

        let mut incident: BTreeSet<EdgeId> = BTreeSet::new();
        if let Some(out_edges) = inner.adjacency_out.get(&id) {
            incident.extend(out_edges.iter().copied());
        }
        if let Some(in_edges) = inner.adjacency_in.get(&id) {
            incident.extend(in_edges.iter().copied());
        }
        trace!("Removing {} incident edges of vertex {id}", incident.len());

        let mut operations: Vec<BatchOperation> = incident
            .iter()
            .map(|edge_id| BatchOperation::Delete { key: edge_key(*edge_id) })
            .collect();
        operations.push(BatchOperation::Delete { key: vertex_key(id) });
        inner.storage.write_batch(operations)?;

        for edge_id in incident {
            inner.drop_edge(edge_id);
        }
        inner.adjacency_out.remove(&id);
        inner.adjacency_in.remove(&id);
        if let Some(vertex) = inner.vertices.remove(&id) {
            inner.by_uuid.remove(&vertex.uuid);
        }
        Ok(())
    }

    fn add_edge(&self, new: NewEdge) -> Result<Edge> {
        debug!(
            "Adding edge: source={}, target={}, label={}, name={:?}",
            new.source, new.target, new.label, new.name
        );
        let mut inner = self.inner.write();
        for end in [new.source, new.target] {
            if !inner.vertices.contains_key(&end) {
                return Err(GraphError::Consistency {
                    message: format!("edge endpoint {end} does not exist"),
                });
            }
        }

        let id = inner.next_edge_id();
        let edge = Edge {
            id,
            uuid: new.uuid,
            label: new.label,
            name: new.name,
            source: new.source,
            target: new.target,
        };
        let value = serde_json::to_vec(&edge)
            .map_err(|e| GraphError::serialization("Failed to serialize edge", Some(e)))?;
        inner.storage.put(&edge_key(id), &value)?;

        inner.index_edge(edge.clone());
        Ok(edge)
    }

    fn remove_edge(&self, id: EdgeId) -> Result<()> {
        debug!("Removing edge: id={id}");
        let mut inner = self.inner.write();
        if !inner.edges.contains_key(&id) {
            return Err(GraphError::not_found(format!("edge {id}")));
        }
        inner.storage.delete(&edge_key(id))?;
        inner.drop_edge(id);
        Ok(())
    }

    fn set_property(&self, vertex: VertexId, key: &str, value: &str) -> Result<()> {
        trace!("Setting property {key} on vertex {vertex}");
        let mut inner = self.inner.write();
        let mut updated = inner.vertex_mut(vertex)?.clone();
        let old_uuid = updated.uuid.clone();
        updated.apply(key, value)?;
        if updated.uuid != old_uuid && inner.by_uuid.contains_key(&updated.uuid) {
            return Err(GraphError::exists(format!("vertex {}", updated.uuid)));
        }

        inner.persist_vertex(&updated)?;
        if updated.uuid != old_uuid {
            inner.by_uuid.remove(&old_uuid);
            inner.by_uuid.insert(updated.uuid.clone(), vertex);
        }
        *inner.vertex_mut(vertex)? = updated;
        Ok(())
    }

    fn remove_property(&self, vertex: VertexId, key: &str) -> Result<()> {
        trace!("Removing property {key} from vertex {vertex}");
        let mut inner = self.inner.write();
        let mut updated = inner.vertex_mut(vertex)?.clone();
        if updated.unset(key).is_none() {
            return Ok(());
        }
        inner.persist_vertex(&updated)?;
        *inner.vertex_mut(vertex)? = updated;
        Ok(())
    }
}
