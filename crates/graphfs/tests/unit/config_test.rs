//! Unit tests for configuration files
//!
//! Tests cover:
//! - Loading a TOML file from disk
//! - Defaults for keys the file leaves out
//! - Read and parse failures reported as configuration errors

use graphfs::{Config, FsType, GraphError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("graphfs.toml");
    fs::write(
        &config_path,
        r#"
fs_root = "home@group@3f2c5a1e-8b4d-4c2a-9e1f-0a1b2c3d4e5f"
mount_point = "/mnt/graph"
render_depth = 4

[[labels]]
label = "json"
type = "file"
pattern = '\.json$'
template = "{{name}}"

[[labels]]
label = "project"
type = "folder"
pattern = "^proj-"
"#,
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.fs_root.as_deref(), Some("home@group@3f2c5a1e-8b4d-4c2a-9e1f-0a1b2c3d4e5f"));
    assert_eq!(config.mount_point, "/mnt/graph");
    assert_eq!(config.render_depth, 4);

    // Untouched keys keep their defaults
    assert_eq!(config.fs_ns, "gfs1");
    assert_eq!(config.vertex_folder, ".V");
    assert_eq!(config.default_mode, 0o644);

    let json = config.label_rule("json").unwrap();
    assert_eq!(json.fs_type, FsType::File);
    assert_eq!(json.template.as_deref(), Some("{{name}}"));
    assert!(json.matches("data.json"));
    assert!(config.is_folder_label("project"));
    assert!(config.is_file_label("json"));
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = Config::load(temp_dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, GraphError::InvalidConfig { .. }));
}

#[test]
fn test_load_rejects_bad_documents() {
    let temp_dir = TempDir::new().unwrap();

    let syntax = temp_dir.path().join("syntax.toml");
    fs::write(&syntax, "render_depth = [").unwrap();
    assert!(matches!(Config::load(&syntax), Err(GraphError::InvalidConfig { .. })));

    let pattern = temp_dir.path().join("pattern.toml");
    fs::write(&pattern, "[[labels]]\nlabel = \"x\"\npattern = \"(\"\n").unwrap();
    assert!(matches!(Config::load(&pattern), Err(GraphError::InvalidConfig { .. })));
}
