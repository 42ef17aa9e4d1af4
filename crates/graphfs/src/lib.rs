//! # graphfs
//!
//! A path resolution and graph mapping engine that presents a property graph
//! as a hierarchical filesystem.
//!
//! ## Core Principles
//!
//! - **Backend Agnostic**: the graph lives behind the [`QueryBackend`] trait
//! - **Stateless Calls**: every path is resolved from a fresh query, nothing is cached
//! - **Explicit Context**: configuration, backend and event sink travel in one [`FsContext`]
//! - **Fail Closed**: backend failures surface as `DoesNotExist`, never as partial results
//!
//! ## Architecture
//!
//! graphfs is organized in layers:
//!
//! ```text
//! Filesystem call surface (GraphFs)
//!     ↓
//! Template rendering (render, template)
//!     ↓
//! Path resolver (path)
//!     ↓
//! Graph node model (node)
//!     ↓
//! Identifier codec + label configuration (codec, config)
//!     ↓
//! Query backend (graph::QueryBackend, graph::GraphStore)
//!     ↓
//! Storage backend (memory, RocksDB)
//! ```
//!
//! ## Addressing
//!
//! Hierarchy paths (`/docs/notes.txt`) follow `in` edges from the root.
//! The vertex folder `.V` switches to direct addressing by composite
//! identifier `name[.ext][@label]@uuid`, with `IN` and `OUT` listing a
//! vertex's edges:
//!
//! ```text
//! /docs/.V/notes.txt/OUT/template
//! /.V/report@a1b2c3d4-0000-4000-8000-000000000001/title
//! /.L/person/.V
//! ```
//!
//! ## Example
//!
//! ```rust
//! use graphfs::{Config, FsContext, GraphFs, GraphStore};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(GraphStore::in_memory().unwrap());
//! let fs = GraphFs::new(FsContext::new(Config::default(), backend));
//!
//! fs.create_folder(&fs.resolve("/docs").unwrap()).unwrap();
//! fs.create_file(&fs.resolve("/docs/readme.txt").unwrap(), b"hello").unwrap();
//!
//! let listing = fs.read_folder(&fs.resolve("/docs").unwrap()).unwrap();
//! assert_eq!(listing, vec![".V", "readme.txt"]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod graph;
pub mod node;
pub mod ops;
pub mod path;
pub mod render;
pub mod storage;
pub mod template;

// Re-export main types
pub use config::{Config, FsType, LabelRule};
pub use context::FsContext;
pub use error::{GraphError, Result};
pub use event::{Event, EventKind, EventSink, LogSink, NullSink, RecordingSink};
pub use graph::{Direction, Edge, EdgeId, GraphStore, PropertyMap, QueryBackend, Vertex, VertexId};
pub use node::{Attribute, NodeSpec, Nodes};
pub use ops::{splice, GraphFs, Metadata};
pub use path::{Match, MatchKind, Resolver};
pub use render::Renderer;
pub use storage::{MemoryStorage, StorageBackend};
#[cfg(feature = "rocksdb-backend")]
pub use storage::RocksDBStorage;
