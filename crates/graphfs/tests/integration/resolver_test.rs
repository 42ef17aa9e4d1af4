//! Integration tests for path resolution
//!
//! Tests cover:
//! - Root, hierarchy and vertex-folder kinds
//! - Edge folders and edge entries under `IN`/`OUT`
//! - The label folder
//! - Configured filesystem roots
//! - Unaddressable and unresolved paths

use graphfs::{Config, FsContext, FsType, GraphError, GraphFs, GraphStore, MatchKind, Nodes};
use std::sync::Arc;

fn setup() -> GraphFs {
    let ctx = FsContext::new(Config::default(), Arc::new(GraphStore::in_memory().unwrap()));
    let fs = GraphFs::new(ctx);
    fs.create_folder(&fs.resolve("/a").unwrap()).unwrap();
    fs.create_folder(&fs.resolve("/a/b").unwrap()).unwrap();
    fs.create_file(&fs.resolve("/a/b/c.txt").unwrap(), b"content").unwrap();
    fs
}

#[test]
fn test_root_kind() {
    let fs = setup();
    for path in ["/", "", "//"] {
        let m = fs.resolve(path).unwrap();
        assert_eq!(m.kind, MatchKind::Root);
        assert!(m.is_found());
        assert!(m.is_folder());
    }
}

#[test]
fn test_tree_mode_resolution() {
    let fs = setup();

    let m = fs.resolve("/a/b").unwrap();
    assert_eq!(m.kind, MatchKind::AtPath);
    assert!(m.is_found());
    assert!(m.is_folder());
    assert_eq!(m.node.as_ref().unwrap().name, "b");
    assert_eq!(m.parent.as_ref().unwrap().name, "a");

    let m = fs.resolve("/a/b/c.txt").unwrap();
    assert!(m.is_file());
    assert_eq!(m.fs_type(), Some(FsType::File));

    let m = fs.resolve("/a/missing").unwrap();
    assert_eq!(m.kind, MatchKind::AtPath);
    assert!(!m.is_found());
    assert!(m.parent_resolved());
    assert_eq!(m.fs_type(), None);

    let m = fs.resolve("/nope/deeper").unwrap();
    assert!(!m.is_found());
    assert!(!m.parent_resolved());
}

#[test]
fn test_vertex_folder_kinds() {
    let fs = setup();
    let file = fs.resolve("/a/b/c.txt").unwrap().node.unwrap();
    let id = file.to_id(false);

    let m = fs.resolve("/.V").unwrap();
    assert_eq!(m.kind, MatchKind::Vertexes);
    assert!(m.is_folder());

    let m = fs.resolve(&format!("/.V/{id}")).unwrap();
    assert_eq!(m.kind, MatchKind::Vertex);
    assert!(m.is_found());
    assert_eq!(m.node.as_ref().unwrap().id, file.id);

    let m = fs.resolve(&format!("/.V/{id}/name")).unwrap();
    assert_eq!(m.kind, MatchKind::VertexProperty);
    assert_eq!(m.vertex_property.as_deref(), Some("name"));
    assert!(m.is_found());
    assert!(m.is_file());

    let m = fs.resolve(&format!("/.V/{id}/color")).unwrap();
    assert_eq!(m.kind, MatchKind::VertexProperty);
    assert!(!m.is_found());

    let m = fs.resolve(&format!("/.V/{id}/IN")).unwrap();
    assert_eq!(m.kind, MatchKind::VertexInEdges);
    assert!(m.is_folder());

    let m = fs.resolve(&format!("/.V/{id}/OUT")).unwrap();
    assert_eq!(m.kind, MatchKind::VertexOutEdges);

    // The file's hierarchy edge is an outbound `in0@in`
    let m = fs.resolve(&format!("/.V/{id}/OUT/in0@in")).unwrap();
    assert_eq!(m.kind, MatchKind::VertexOutEdge);
    assert!(m.is_link());
    assert!(m.is_found());
    assert_eq!(m.edge.as_ref().unwrap().label, "in");

    let m = fs.resolve(&format!("/.V/{id}/IN/in0@in")).unwrap();
    assert_eq!(m.kind, MatchKind::VertexInEdge);
    assert!(!m.is_found());
}

#[test]
fn test_vertex_folder_under_hierarchy() {
    let fs = setup();

    // Under a parent, vertices are matched by name
    let m = fs.resolve("/a/b/.V/c.txt").unwrap();
    assert_eq!(m.kind, MatchKind::Vertex);
    assert!(m.is_found());
    assert_eq!(m.parent.as_ref().unwrap().name, "b");

    let m = fs.resolve("/a/b/.V").unwrap();
    assert_eq!(m.kind, MatchKind::Vertexes);
    assert!(m.is_found());

    // The last marker wins
    let m = fs.resolve("/a/.V/b/.V/c.txt").unwrap();
    assert_eq!(m.kind, MatchKind::Vertex);
    assert!(!m.parent_resolved());
    assert!(!m.is_found());
}

#[test]
fn test_label_folder_kinds() {
    let fs = setup();

    let m = fs.resolve("/.L").unwrap();
    assert_eq!(m.kind, MatchKind::VertexLabels);
    assert!(m.is_folder());

    let m = fs.resolve("/.L/group").unwrap();
    assert_eq!(m.kind, MatchKind::VertexLabel);
    assert!(m.is_file());
    assert!(m.is_found());

    let m = fs.resolve("/.L/unknown").unwrap();
    assert!(!m.is_found());

    let file = fs.resolve("/a/b/c.txt").unwrap().node.unwrap();
    let m = fs.resolve(&format!("/.L/vertex/.V/{}", file.to_id(false))).unwrap();
    assert_eq!(m.kind, MatchKind::Vertex);
    assert!(m.is_found());

    let m = fs.resolve(&format!("/.L/group/.V/{}", file.to_id(false))).unwrap();
    assert!(!m.is_found());
}

#[test]
fn test_unaddressable_paths() {
    let fs = setup();
    let id = fs.resolve("/a/b/c.txt").unwrap().node.unwrap().to_id(false);

    for path in [
        format!("/.V/{id}/name/extra"),
        format!("/.V/{id}/IN/x/y"),
        "/.L/group/other".to_string(),
    ] {
        match fs.resolve(&path) {
            Err(GraphError::DoesNotExist { .. }) => {}
            other => panic!("expected DoesNotExist for {path}, got {other:?}"),
        }
    }
}

#[test]
fn test_configured_root() {
    let store = Arc::new(GraphStore::in_memory().unwrap());
    let plain = FsContext::new(Config::default(), store.clone());
    let nodes = Nodes::new(&plain);
    let home = graphfs::NodeSpec::infer(&plain, "home", FsType::Folder, "group").unwrap();
    let home = nodes.create(home, None, true).unwrap();
    let docs = graphfs::NodeSpec::infer(&plain, "docs", FsType::Folder, "group").unwrap();
    nodes.create(docs, Some(&home), true).unwrap();
    let other = graphfs::NodeSpec::infer(&plain, "other", FsType::Folder, "group").unwrap();
    nodes.create(other, None, true).unwrap();

    let config = Config::default().with_root(home.to_id(false));
    let fs = GraphFs::new(FsContext::new(config, store));

    let m = fs.resolve("/docs").unwrap();
    assert!(m.is_found());
    assert_eq!(m.parent.as_ref().unwrap().id, home.id);
    assert!(!fs.resolve("/other").unwrap().is_found());
    assert_eq!(fs.read_folder(&fs.resolve("/").unwrap()).unwrap(), vec![".V", ".L", "docs"]);
}

#[test]
fn test_parents_terminate_on_cycle() {
    let fs = setup();
    let ctx = fs.context();
    let nodes = Nodes::new(ctx);
    let a = fs.resolve("/a").unwrap().node.unwrap();
    let b = fs.resolve("/a/b").unwrap().node.unwrap();

    // Close the loop: a -> b -> a
    nodes.move_to(&a, Some(&b)).unwrap();
    match nodes.parents(&b) {
        Err(GraphError::Consistency { .. }) => {}
        other => panic!("expected a consistency error, got {other:?}"),
    }
}
