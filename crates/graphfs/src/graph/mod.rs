//! Graph records and the backend they are queried from.

mod backend;
mod property;
mod store;
mod types;

pub use backend::QueryBackend;
pub use property::PropertyMap;
pub use store::GraphStore;
pub use types::{
    Direction, Edge, EdgeFilter, EdgeId, NewEdge, NewVertex, PathStep, Vertex, VertexId, CORE_FIELDS,
    DEFAULT_LABEL,
};
