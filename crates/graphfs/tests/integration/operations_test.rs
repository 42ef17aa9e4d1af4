//! Integration tests for filesystem operations
//!
//! Tests cover:
//! - Folder create/list/rename/delete
//! - File create/read/write/clear with the splice semantics
//! - Property files and the two-phase property move
//! - Links under `IN`/`OUT` and property aliases
//! - Events emitted per mutation
//! - Error kinds for violated preconditions

use graphfs::{
    Config, EventKind, FsContext, FsType, GraphError, GraphFs, GraphStore, LabelRule, Match, RecordingSink,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn setup() -> (GraphFs, Arc<RecordingSink>) {
    setup_with(Config::default())
}

fn setup_with(config: Config) -> (GraphFs, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let ctx = FsContext::new(config, Arc::new(GraphStore::in_memory().unwrap())).with_events(sink.clone());
    (GraphFs::new(ctx), sink)
}

fn at(fs: &GraphFs, path: &str) -> Match {
    fs.resolve(path).unwrap()
}

#[test]
fn test_folder_listing_includes_vertex_folder() {
    let (fs, _) = setup();
    fs.create_folder(&at(&fs, "/docs")).unwrap();
    fs.create_file(&at(&fs, "/docs/readme.md"), b"").unwrap();
    fs.create_folder(&at(&fs, "/docs/img")).unwrap();

    let listing = fs.read_folder(&at(&fs, "/docs")).unwrap();
    assert_eq!(listing, vec![".V", "readme.md", "img"]);

    let root = fs.read_folder(&at(&fs, "/")).unwrap();
    assert_eq!(root, vec![".V", ".L", "docs"]);
}

#[test]
fn test_write_then_read_round_trip() {
    let (fs, _) = setup();
    fs.create_file(&at(&fs, "/greeting.txt"), b"").unwrap();

    fs.write_file(&at(&fs, "/greeting.txt"), b"hello", 0).unwrap();
    fs.write_file(&at(&fs, "/greeting.txt"), b"XY", 1).unwrap();

    let m = at(&fs, "/greeting.txt");
    assert_eq!(fs.read_file(&m, None, 0).unwrap(), b"hXYlo");
    assert_eq!(fs.read_file(&m, Some(2), 1).unwrap(), b"XY");
    assert_eq!(fs.read_file(&m, Some(100), 3).unwrap(), b"lo");
    assert_eq!(fs.read_file(&m, None, 99).unwrap(), b"");
    assert_eq!(fs.read_file_length(&m).unwrap(), 5);

    // Beyond the end is a no-op
    fs.write_file(&m, b"!!", 10).unwrap();
    assert_eq!(fs.read_file(&at(&fs, "/greeting.txt"), None, 0).unwrap(), b"hXYlo");
}

#[test]
fn test_write_bumps_modified_and_runs_write_hook() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook_seen = seen.clone();
    let config = Config::default()
        .with_rule(LabelRule::new("note", FsType::File, Some(r"\.note$")).unwrap())
        .with_write_hook("note", move |vertex, data| {
            hook_seen.lock().push((vertex.name.clone(), data.to_vec()));
            Ok(())
        });
    let (fs, _) = setup_with(config);

    fs.create_file(&at(&fs, "/a.note"), b"").unwrap();
    let before = at(&fs, "/a.note").node.unwrap();
    assert_eq!(before.label, "note");

    fs.write_file(&at(&fs, "/a.note"), b"abc", 0).unwrap();
    let after = at(&fs, "/a.note").node.unwrap();
    assert!(after.modified >= before.modified);
    assert_eq!(seen.lock().as_slice(), &[("a.note".to_string(), b"abc".to_vec())]);
}

#[test]
fn test_failing_write_hook_keeps_content() {
    let config = Config::default().with_write_hook("vertex", |_, _| {
        Err(GraphError::Consistency {
            message: "downstream rejected".to_string(),
        })
    });
    let (fs, _) = setup_with(config);
    fs.create_file(&at(&fs, "/x"), b"").unwrap();
    fs.write_file(&at(&fs, "/x"), b"kept", 0).unwrap();
    assert_eq!(fs.read_file(&at(&fs, "/x"), None, 0).unwrap(), b"kept");
}

#[test]
fn test_clear_file() {
    let (fs, sink) = setup();
    fs.create_file(&at(&fs, "/f"), b"data").unwrap();
    sink.drain();

    fs.clear_file(&at(&fs, "/f")).unwrap();
    assert_eq!(fs.read_file_length(&at(&fs, "/f")).unwrap(), 0);
    assert_eq!(sink.kinds(), vec![EventKind::UpdateNode]);
}

#[test]
fn test_create_errors() {
    let (fs, _) = setup();
    fs.create_folder(&at(&fs, "/docs")).unwrap();
    fs.create_file(&at(&fs, "/docs/a.txt"), b"").unwrap();

    assert!(matches!(fs.create_folder(&at(&fs, "/docs")), Err(GraphError::AlreadyExists { .. })));
    assert!(matches!(fs.create_file(&at(&fs, "/docs/a.txt"), b""), Err(GraphError::AlreadyExists { .. })));
    assert!(matches!(fs.create_file(&at(&fs, "/nope/a.txt"), b""), Err(GraphError::DoesNotExist { .. })));
    assert!(matches!(fs.read_file(&at(&fs, "/docs"), None, 0), Err(GraphError::IsAFolder { .. })));
    assert!(matches!(fs.read_folder(&at(&fs, "/docs/a.txt")), Err(GraphError::IsAFile { .. })));
    assert!(matches!(fs.read_file(&at(&fs, "/docs/b.txt"), None, 0), Err(GraphError::DoesNotExist { .. })));
    assert!(matches!(fs.delete_folder(&at(&fs, "/docs/a.txt")), Err(GraphError::IsAFile { .. })));
    assert!(matches!(fs.delete_file(&at(&fs, "/docs")), Err(GraphError::IsAFolder { .. })));
}

#[test]
fn test_rename_and_move() {
    let (fs, sink) = setup();
    fs.create_folder(&at(&fs, "/a")).unwrap();
    fs.create_folder(&at(&fs, "/b")).unwrap();
    fs.create_file(&at(&fs, "/a/f.txt"), b"body").unwrap();
    let uuid = at(&fs, "/a/f.txt").node.unwrap().uuid;
    sink.drain();

    fs.rename_file(&at(&fs, "/a/f.txt"), &at(&fs, "/b/g.txt")).unwrap();

    assert!(!at(&fs, "/a/f.txt").is_found());
    let moved = at(&fs, "/b/g.txt");
    assert!(moved.is_found());
    assert_eq!(moved.node.as_ref().unwrap().uuid, uuid);
    assert_eq!(fs.read_file(&moved, None, 0).unwrap(), b"body");
    assert_eq!(sink.kinds(), vec![EventKind::UpdateNode]);

    fs.rename_folder(&at(&fs, "/b"), &at(&fs, "/c")).unwrap();
    assert!(at(&fs, "/c/g.txt").is_found());

    assert!(matches!(
        fs.rename_folder(&at(&fs, "/a"), &at(&fs, "/c")),
        Err(GraphError::AlreadyExists { .. })
    ));
}

#[test]
fn test_delete_parent_orphans_child() {
    let (fs, sink) = setup();
    fs.create_folder(&at(&fs, "/p")).unwrap();
    fs.create_file(&at(&fs, "/p/child.txt"), b"x").unwrap();
    let child = at(&fs, "/p/child.txt").node.unwrap();
    sink.drain();

    fs.delete_folder(&at(&fs, "/p")).unwrap();
    assert_eq!(sink.kinds(), vec![EventKind::DeleteNode]);
    assert!(!at(&fs, "/p").is_found());

    // Still addressable by identifier, and now a root
    let m = at(&fs, &format!("/.V/{}", child.to_id(false)));
    assert!(m.is_found());
    assert_eq!(m.node.unwrap().uuid, child.uuid);
    assert!(at(&fs, "/child.txt").is_found());
}

#[test]
fn test_property_files() {
    let (fs, sink) = setup();
    fs.create_file(&at(&fs, "/v"), b"").unwrap();
    let id = at(&fs, "/v").node.unwrap().to_id(false);
    let prop = format!("/.V/{id}/color");
    sink.drain();

    fs.create_file(&at(&fs, &prop), b"").unwrap();
    fs.write_file(&at(&fs, &prop), b"red", 0).unwrap();
    fs.write_file(&at(&fs, &prop), b"o", 2).unwrap();
    assert_eq!(fs.read_file(&at(&fs, &prop), None, 0).unwrap(), b"reo");
    assert_eq!(fs.get_property(&at(&fs, "/v"), "color").unwrap().as_deref(), Some("reo"));

    let listing = fs.read_folder(&at(&fs, &format!("/.V/{id}"))).unwrap();
    assert!(listing.contains(&"color".to_string()));
    assert!(listing.contains(&"uuid".to_string()));
    assert!(listing.contains(&"IN".to_string()));
    assert!(listing.contains(&"OUT".to_string()));

    fs.delete_file(&at(&fs, &prop)).unwrap();
    assert!(!at(&fs, &prop).is_found());
    assert!(sink.kinds().iter().all(|k| *k == EventKind::UpdateNode));
}

#[test]
fn test_binary_property_stored_encoded() {
    let (fs, _) = setup();
    fs.create_file(&at(&fs, "/v"), b"").unwrap();
    let id = at(&fs, "/v").node.unwrap().to_id(false);
    let prop = format!("/.V/{id}/blob");

    fs.create_file(&at(&fs, &prop), &[0xff, 0x00, 0x01]).unwrap();
    assert_eq!(fs.read_file(&at(&fs, &prop), None, 0).unwrap(), vec![0xff, 0x00, 0x01]);
    assert!(fs
        .get_property(&at(&fs, "/v"), "blob")
        .unwrap()
        .unwrap()
        .starts_with("base64:"));
}

#[test]
fn test_property_move_between_vertices() {
    let (fs, _) = setup();
    fs.create_file(&at(&fs, "/s"), b"").unwrap();
    fs.create_file(&at(&fs, "/t"), b"").unwrap();
    fs.set_property(&at(&fs, "/s"), "note", "keep me").unwrap();
    let s = at(&fs, "/s").node.unwrap().to_id(false);
    let t = at(&fs, "/t").node.unwrap().to_id(false);

    fs.rename_file(&at(&fs, &format!("/.V/{s}/note")), &at(&fs, &format!("/.V/{t}/moved"))).unwrap();

    assert_eq!(fs.get_property(&at(&fs, "/t"), "moved").unwrap().as_deref(), Some("keep me"));
    assert_eq!(fs.get_property(&at(&fs, "/s"), "note").unwrap(), None);
}

#[test]
fn test_links_under_edge_folders() {
    let (fs, sink) = setup();
    fs.create_folder(&at(&fs, "/people")).unwrap();
    fs.create_file(&at(&fs, "/people/ana"), b"").unwrap();
    fs.create_file(&at(&fs, "/people/bo"), b"").unwrap();
    let ana = at(&fs, "/people/ana").node.unwrap().to_id(false);
    sink.drain();

    let link = at(&fs, &format!("/.V/{ana}/OUT/best@knows"));
    assert!(!link.is_found());
    let edge = fs.create_link(&link, &at(&fs, "/people/bo")).unwrap();
    assert_eq!(edge.label, "knows");
    assert_eq!(edge.name.as_deref(), Some("best"));

    let events = sink.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, EventKind::CreateLink);
    assert_eq!(events[0].source.as_ref().unwrap().name, "ana");
    assert_eq!(events[0].target.as_ref().unwrap().name, "bo");

    let link = at(&fs, &format!("/.V/{ana}/OUT/best@knows"));
    assert!(link.is_found());
    assert!(link.is_link());
    assert_eq!(fs.read_link(&link).unwrap(), "/people/bo");

    let outs = fs.read_folder(&at(&fs, &format!("/.V/{ana}/OUT"))).unwrap();
    assert_eq!(outs, vec!["in0@in", "best@knows"]);

    let bo = at(&fs, "/people/bo").node.unwrap().to_id(false);
    let ins = fs.read_folder(&at(&fs, &format!("/.V/{bo}/IN"))).unwrap();
    assert_eq!(ins, vec!["best@knows"]);
    assert_eq!(fs.read_link(&at(&fs, &format!("/.V/{bo}/IN/best@knows"))).unwrap(), "/people/ana");

    fs.delete_link(&link).unwrap();
    assert!(!at(&fs, &format!("/.V/{ana}/OUT/best@knows")).is_found());
    assert_eq!(sink.kinds(), vec![EventKind::DeleteLink]);
}

#[test]
fn test_in_edge_link_and_property_alias() {
    let (fs, _) = setup();
    fs.create_file(&at(&fs, "/doc"), b"").unwrap();
    fs.create_file(&at(&fs, "/ana"), b"").unwrap();
    let doc = at(&fs, "/doc").node.unwrap().to_id(false);
    let ana = at(&fs, "/ana").node.unwrap().to_id(false);

    // An IN entry points the edge at the vertex owning the folder
    fs.create_link(&at(&fs, &format!("/.V/{doc}/IN/author")), &at(&fs, "/ana")).unwrap();
    let alias = at(&fs, &format!("/.V/{ana}/author"));
    assert!(alias.is_found());
    assert_eq!(fs.read_link(&alias).unwrap(), "/doc");

    // A bare property-style link is an outbound edge labelled by the name
    fs.create_link(&at(&fs, &format!("/.V/{doc}/reviewer")), &at(&fs, "/ana")).unwrap();
    assert!(at(&fs, &format!("/.V/{doc}/OUT/reviewer")).is_found());
    assert_eq!(fs.read_file(&at(&fs, &format!("/.V/{doc}/reviewer")), None, 0).unwrap(), ana.as_bytes());

    fs.delete_link(&at(&fs, &format!("/.V/{doc}/reviewer"))).unwrap();
    assert!(!at(&fs, &format!("/.V/{doc}/reviewer")).is_found());
}

#[test]
fn test_read_link_with_mount_point() {
    let mut config = Config::default();
    config.mount_point = "/mnt/graph".to_string();
    let (fs, _) = setup_with(config);
    fs.create_folder(&at(&fs, "/d")).unwrap();
    fs.create_file(&at(&fs, "/d/x"), b"").unwrap();
    let x = at(&fs, "/d/x").node.unwrap().to_id(false);

    let link = at(&fs, &format!("/.V/{x}/OUT/in0@in"));
    assert_eq!(fs.read_link(&link).unwrap(), "/mnt/graph/d");
}

#[test]
fn test_vertex_label_file_and_listings() {
    let config = Config::default().with_rule(LabelRule::new("person", FsType::File, Some(r"^p-")).unwrap());
    let (fs, _) = setup_with(config);
    fs.create_folder(&at(&fs, "/team")).unwrap();
    fs.create_file(&at(&fs, "/team/p-ana"), b"").unwrap();
    fs.create_file(&at(&fs, "/team/notes"), b"").unwrap();
    let ana = at(&fs, "/team/p-ana").node.unwrap();

    let labels = fs.read_folder(&at(&fs, "/.L")).unwrap();
    assert_eq!(labels, vec!["group", "person", "vertex"]);

    let content = fs.read_file(&at(&fs, "/.L/person"), None, 0).unwrap();
    assert_eq!(content, format!("{}\n", ana.to_id(false)).into_bytes());

    let all = fs.read_folder(&at(&fs, "/.L/person/.V")).unwrap();
    assert_eq!(all, vec![ana.to_id(false)]);

    let children = fs.read_folder(&at(&fs, "/team/.V")).unwrap();
    assert_eq!(children, vec!["p-ana", "notes"]);
}

#[test]
fn test_create_at_vertex_folder() {
    let (fs, sink) = setup();
    let uuid = "3f2c5a1e-8b4d-4c2a-9e1f-0a1b2c3d4e5f";

    fs.create_folder(&at(&fs, &format!("/.V/box@group@{uuid}"))).unwrap();
    let m = at(&fs, &format!("/.V/box@group@{uuid}"));
    assert!(m.is_found());
    assert!(m.is_folder());
    assert_eq!(sink.kinds(), vec![EventKind::CreateNode]);

    // Restricted to a label, a different label is refused
    let refused = fs.create_file(&at(&fs, "/.L/person/.V/x@doc@00000000-0000-4000-8000-000000000001"), b"");
    assert!(matches!(refused, Err(GraphError::DoesNotExist { .. })));
}

#[test]
fn test_stat() {
    let (fs, _) = setup();
    fs.create_folder(&at(&fs, "/d")).unwrap();
    fs.create_file(&at(&fs, "/d/f"), b"12345").unwrap();

    let file = fs.stat(&at(&fs, "/d/f")).unwrap();
    assert_eq!(file.kind, FsType::File);
    assert_eq!(file.size, 5);
    assert_eq!(file.mode, 0o644);

    let folder = fs.stat(&at(&fs, "/d")).unwrap();
    assert_eq!(folder.kind, FsType::Folder);
    assert_eq!(folder.size, 0);

    let root = fs.stat(&at(&fs, "/")).unwrap();
    assert_eq!(root.kind, FsType::Folder);
    assert!(matches!(fs.stat(&at(&fs, "/missing")), Err(GraphError::DoesNotExist { .. })));
}

#[test]
fn test_create_events() {
    let (fs, sink) = setup();
    fs.create_folder(&at(&fs, "/d")).unwrap();
    fs.create_file(&at(&fs, "/d/f"), b"x").unwrap();

    let events = sink.events();
    assert_eq!(sink.kinds(), vec![EventKind::CreateNode, EventKind::CreateNode]);
    let node = events[1].node.as_ref().unwrap();
    assert_eq!(node.name, "f");
    assert!(node.properties.get("data").is_some());
    assert_eq!(events[1].to_json()["event"], "create_node");
}

#[test]
fn test_read_link_outside_configured_root() {
    let store = Arc::new(GraphStore::in_memory().unwrap());
    let plain = GraphFs::new(FsContext::new(Config::default(), store.clone()));
    plain.create_folder(&at(&plain, "/home")).unwrap();
    plain.create_file(&at(&plain, "/home/doc"), b"").unwrap();
    plain.create_file(&at(&plain, "/outside"), b"").unwrap();
    let home = at(&plain, "/home").node.unwrap();
    let outside = at(&plain, "/outside").node.unwrap();

    let fs = GraphFs::new(FsContext::new(Config::default().with_root(home.to_id(false)), store));
    let vertex_path = format!("/.V/{}", outside.to_id(false));
    fs.create_link(&at(&fs, "/.V/doc/OUT/ref"), &at(&fs, &vertex_path)).unwrap();

    let target = fs.read_link(&at(&fs, "/.V/doc/OUT/ref")).unwrap();
    assert_eq!(target, vertex_path);
    let m = at(&fs, &target);
    assert!(m.is_found());
    assert_eq!(m.node.unwrap().id, outside.id);

    // Only the full identifier reaches past the root, and only at the top level
    assert!(!at(&fs, "/.V/outside").is_found());
    assert!(!at(&fs, &format!("/doc{vertex_path}")).is_found());
}

#[test]
fn test_delete_edge_backed_property_entry() {
    let (fs, sink) = setup();
    fs.create_file(&at(&fs, "/doc"), b"").unwrap();
    fs.create_file(&at(&fs, "/ana"), b"").unwrap();
    let doc = at(&fs, "/doc").node.unwrap().to_id(false);
    let entry = format!("/.V/{doc}/reviewer");
    fs.create_link(&at(&fs, &entry), &at(&fs, "/ana")).unwrap();
    sink.drain();

    let listing = fs.read_folder(&at(&fs, &format!("/.V/{doc}"))).unwrap();
    assert!(listing.contains(&"reviewer".to_string()));

    fs.delete_file(&at(&fs, &entry)).unwrap();
    assert!(!at(&fs, &entry).is_found());
    let listing = fs.read_folder(&at(&fs, &format!("/.V/{doc}"))).unwrap();
    assert!(!listing.contains(&"reviewer".to_string()));
    assert_eq!(sink.kinds(), vec![EventKind::DeleteLink]);
}

#[test]
fn test_delete_link_needs_an_edge() {
    let (fs, sink) = setup();
    fs.create_file(&at(&fs, "/v"), b"").unwrap();
    fs.set_property(&at(&fs, "/v"), "color", "red").unwrap();
    let id = at(&fs, "/v").node.unwrap().to_id(false);
    sink.drain();

    let prop = at(&fs, &format!("/.V/{id}/color"));
    assert!(prop.is_found());
    assert!(matches!(fs.delete_link(&prop), Err(GraphError::DoesNotExist { .. })));
    assert_eq!(fs.get_property(&at(&fs, "/v"), "color").unwrap().as_deref(), Some("red"));

    // Core fields stay put
    let name = at(&fs, &format!("/.V/{id}/name"));
    assert!(matches!(fs.delete_file(&name), Err(GraphError::NotPermitted { .. })));
    assert!(sink.events().is_empty());
}

#[test]
fn test_identity_fields_not_writable() {
    let (fs, sink) = setup();
    fs.create_file(&at(&fs, "/v"), b"").unwrap();
    let node = at(&fs, "/v").node.unwrap();
    let id = node.to_id(false);
    sink.drain();

    let other = "00000000-0000-4000-8000-000000000001";
    assert!(matches!(
        fs.set_property(&at(&fs, "/v"), "uuid", other),
        Err(GraphError::NotPermitted { .. })
    ));
    assert!(matches!(
        fs.write_file(&at(&fs, &format!("/.V/{id}/uuid")), other.as_bytes(), 0),
        Err(GraphError::NotPermitted { .. })
    ));
    assert!(matches!(
        fs.clear_file(&at(&fs, &format!("/.V/{id}/id"))),
        Err(GraphError::NotPermitted { .. })
    ));
    assert_eq!(at(&fs, "/v").node.unwrap().uuid, node.uuid);
    assert!(sink.events().is_empty());

    fs.set_property(&at(&fs, "/v"), "mode", "0o600").unwrap();
    assert_eq!(at(&fs, "/v").node.unwrap().mode, 0o600);
}

#[test]
fn test_folder_ignores_file_label() {
    let config = Config::default().with_rule(LabelRule::new("json", FsType::File, Some(r"\.json$")).unwrap());
    let (fs, _) = setup_with(config);
    let uuid = "3f2c5a1e-8b4d-4c2a-9e1f-0a1b2c3d4e5f";

    let folder = fs.create_folder(&at(&fs, &format!("/x@json@{uuid}"))).unwrap();
    assert_eq!(folder.label, "group");
    assert_eq!(folder.name, "x");
    let m = at(&fs, "/x");
    assert!(m.is_found());
    assert!(m.is_folder());
    assert_eq!(fs.read_folder(&m).unwrap(), vec![".V"]);

    // Restricted to a file label, a folder cannot be made
    let refused = fs.create_folder(&at(&fs, "/.L/json/.V/y@json@00000000-0000-4000-8000-000000000002"));
    assert!(matches!(refused, Err(GraphError::DoesNotExist { .. })));
}
