//! Composite identifiers used as filesystem entry names.
//!
//! A vertex is addressed as `name[.ext][@label]@uuid`. Decoding tries a fixed
//! cascade of patterns and never fails: a string no pattern accepts is a bare
//! name.

use crate::config::{Config, FsType};
use crate::graph::DEFAULT_LABEL;
use regex::Regex;
use std::sync::LazyLock;

const UUID: &str = r"[0-9a-fA-F]{8}-(?:[0-9a-fA-F]{4}-){3}[0-9a-fA-F]{12}";

static RE_NAME_EXT_LABEL_UUID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^(.+)\.(.+)@(.+)@({UUID})$")).unwrap());
static RE_NAME_LABEL_UUID: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!(r"^(.+)@(.+)@({UUID})$")).unwrap());
static RE_NAME_EXT_UUID: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!(r"^(.+)\.(.+)@({UUID})$")).unwrap());
static RE_NAME_UUID: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!(r"^(.+)@({UUID})$")).unwrap());
static RE_NAME_EXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)\.(.+)$").unwrap());
static RE_UUID: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!(r"^({UUID})$")).unwrap());
static RE_EDGE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)@(.+)$").unwrap());

/// Fields recovered from a composite identifier.
///
/// `name` keeps its extension; `ext` repeats it separately for label
/// inference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedId {
    /// Entry name, including any extension
    pub name: Option<String>,
    /// Extension after the last dot of the name part
    pub ext: Option<String>,
    /// Explicit label segment
    pub label: Option<String>,
    /// Canonical UUID
    pub uuid: Option<String>,
}

/// A single field of [`ParsedId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdField {
    /// [`ParsedId::name`]
    Name,
    /// [`ParsedId::ext`]
    Ext,
    /// [`ParsedId::label`]
    Label,
    /// [`ParsedId::uuid`]
    Uuid,
}

impl ParsedId {
    /// Project one field.
    pub fn field(&self, field: IdField) -> Option<&str> {
        match field {
            IdField::Name => self.name.as_deref(),
            IdField::Ext => self.ext.as_deref(),
            IdField::Label => self.label.as_deref(),
            IdField::Uuid => self.uuid.as_deref(),
        }
    }
}

fn group(caps: &regex::Captures<'_>, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

/// Decode a composite vertex identifier. The first pattern that matches wins.
pub fn parse(id: &str) -> ParsedId {
    if id.is_empty() {
        return ParsedId::default();
    }

    if let Some(caps) = RE_NAME_EXT_LABEL_UUID.captures(id) {
        return ParsedId {
            name: Some(format!("{}.{}", &caps[1], &caps[2])),
            ext: group(&caps, 2),
            label: group(&caps, 3),
            uuid: group(&caps, 4),
        };
    }
    if let Some(caps) = RE_NAME_LABEL_UUID.captures(id) {
        return ParsedId {
            name: group(&caps, 1),
            ext: None,
            label: group(&caps, 2),
            uuid: group(&caps, 3),
        };
    }
    if let Some(caps) = RE_NAME_EXT_UUID.captures(id) {
        return ParsedId {
            name: Some(format!("{}.{}", &caps[1], &caps[2])),
            ext: group(&caps, 2),
            label: None,
            uuid: group(&caps, 3),
        };
    }
    if let Some(caps) = RE_NAME_UUID.captures(id) {
        return ParsedId {
            name: group(&caps, 1),
            uuid: group(&caps, 2),
            ..ParsedId::default()
        };
    }
    if let Some(caps) = RE_NAME_EXT.captures(id) {
        return ParsedId {
            name: Some(format!("{}.{}", &caps[1], &caps[2])),
            ext: group(&caps, 2),
            ..ParsedId::default()
        };
    }
    if let Some(caps) = RE_UUID.captures(id) {
        return ParsedId {
            uuid: group(&caps, 1),
            ..ParsedId::default()
        };
    }

    ParsedId {
        name: Some(id.to_string()),
        ..ParsedId::default()
    }
}

/// Decode `id` and project one field, or `default` when it is absent.
pub fn infer(field: IdField, id: &str, default: Option<&str>) -> Option<String> {
    parse(id)
        .field(field)
        .or(default)
        .map(str::to_string)
}

/// Choose the label for a new entry named `name`.
///
/// The first rule of type `fs_type` whose pattern is found in `name` wins;
/// otherwise `candidate`, provided its label classifies as `fs_type`. Without
/// a name or a fitting candidate the default applies.
pub fn label(config: &Config, name: Option<&str>, candidate: Option<&str>, fs_type: FsType, default: &str) -> String {
    let (Some(name), Some(candidate)) = (name, candidate) else {
        return default.to_string();
    };
    if let Some(rule) = config.rules_for(fs_type).find(|rule| rule.matches(name)) {
        return rule.label.clone();
    }
    let fits = match fs_type {
        FsType::Folder => config.is_folder_label(candidate),
        FsType::File => config.is_file_label(candidate),
        FsType::Link => true,
    };
    if fits { candidate } else { default }.to_string()
}

/// Encode an identifier.
///
/// The long form is `name@uuid` for the default label and
/// `name@label@uuid` otherwise. The short form, and any identifier with
/// missing parts, is the bare name, falling back to the uuid.
pub fn encode(name: Option<&str>, label: Option<&str>, uuid: Option<&str>, short: bool) -> String {
    let name = name
        .map(|n| n.trim().replace('\t', ""))
        .filter(|n| !n.is_empty());
    let uuid = uuid.filter(|u| !u.is_empty());

    match (name, label, uuid) {
        (Some(name), Some(label), Some(uuid)) if !short => {
            if label == DEFAULT_LABEL {
                format!("{name}@{uuid}")
            } else {
                format!("{name}@{label}@{uuid}")
            }
        }
        (Some(name), _, _) => name,
        (None, _, Some(uuid)) => uuid.to_string(),
        (None, _, None) => String::new(),
    }
}

/// Decode an edge entry name: `name@label`, or a bare label.
pub fn parse_edge(id: &str) -> (Option<String>, String) {
    match RE_EDGE_ID.captures(id) {
        Some(caps) => (group(&caps, 1), caps[2].to_string()),
        None => (None, id.to_string()),
    }
}
