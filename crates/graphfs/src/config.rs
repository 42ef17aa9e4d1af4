//! Engine configuration and label rules.
//!
//! Loaded once at startup from TOML (or built in code), then shared
//! read-only through [`FsContext`](crate::FsContext). Label rules are an
//! ordered table; the first rule that applies wins.

use crate::error::{GraphError, Result};
use crate::graph::Vertex;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Filesystem role of a vertex label or a path kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsType {
    /// Regular file
    File,
    /// Directory
    Folder,
    /// Symbolic link
    Link,
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsType::File => write!(f, "file"),
            FsType::Folder => write!(f, "folder"),
            FsType::Link => write!(f, "link"),
        }
    }
}

/// Produces file content for a vertex when no template text is configured.
///
/// Receives the vertex, its render context and the raw stored content.
pub type ReadHook = Arc<dyn Fn(&Vertex, &serde_json::Value, &[u8]) -> Result<Vec<u8>> + Send + Sync>;

/// Observes whole-file writes. Receives the vertex and the bytes written.
pub type WriteHook = Arc<dyn Fn(&Vertex, &[u8]) -> Result<()> + Send + Sync>;

/// One entry of the label table.
#[derive(Clone, Serialize, Deserialize)]
pub struct LabelRule {
    /// Label assigned to matching names
    pub label: String,
    /// Role of vertices carrying this label
    #[serde(rename = "type", default = "default_rule_type")]
    pub fs_type: FsType,
    /// Regex searched in new entry names
    #[serde(default)]
    pub pattern: Option<String>,
    /// Default render template
    #[serde(default)]
    pub template: Option<String>,
    #[serde(skip)]
    compiled: Option<Regex>,
    #[serde(skip)]
    read_hook: Option<ReadHook>,
    #[serde(skip)]
    write_hook: Option<WriteHook>,
}

fn default_rule_type() -> FsType {
    FsType::File
}

impl fmt::Debug for LabelRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelRule")
            .field("label", &self.label)
            .field("fs_type", &self.fs_type)
            .field("pattern", &self.pattern)
            .field("template", &self.template)
            .field("read_hook", &self.read_hook.is_some())
            .field("write_hook", &self.write_hook.is_some())
            .finish()
    }
}

impl LabelRule {
    /// Create a rule, compiling `pattern` if given.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidConfig`] if the pattern is not a valid regex.
    pub fn new(label: impl Into<String>, fs_type: FsType, pattern: Option<&str>) -> Result<Self> {
        let mut rule = Self {
            label: label.into(),
            fs_type,
            pattern: pattern.map(str::to_string),
            template: None,
            compiled: None,
            read_hook: None,
            write_hook: None,
        };
        rule.compile()?;
        Ok(rule)
    }

    /// Builder: attach a default template.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    fn compile(&mut self) -> Result<()> {
        self.compiled = match &self.pattern {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                GraphError::config(format!("bad pattern {pattern:?} for label {}", self.label), Some(e))
            })?),
            None => None,
        };
        Ok(())
    }

    /// True if the pattern is found anywhere in `name`. Rules without a
    /// pattern never match.
    pub fn matches(&self, name: &str) -> bool {
        self.compiled.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// The read hook, if one was injected.
    pub fn read_hook(&self) -> Option<&ReadHook> {
        self.read_hook.as_ref()
    }

    /// The write hook, if one was injected.
    pub fn write_hook(&self) -> Option<&WriteHook> {
        self.write_hook.as_ref()
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier of the vertex that is the filesystem root; the root set when unset
    pub fs_root: Option<String>,
    /// Namespace recorded on created vertices
    pub fs_ns: String,
    /// Prefix of absolute paths returned by `read_link`
    pub mount_point: String,
    /// Label of folders created without a matching rule
    pub folder_label: String,
    /// Label of hierarchy edges
    pub in_label: String,
    /// Name of hierarchy edges
    pub in_name: String,
    /// Label of folder self-loops
    pub self_label: String,
    /// Name of folder self-loops
    pub self_name: String,
    /// Label of edges pointing at a render template
    pub template_label: String,
    /// Reserved segment switching to direct addressing
    pub vertex_folder: String,
    /// Reserved segment listing labels
    pub label_folder: String,
    /// Reserved segment listing inbound edges
    pub in_edge_folder: String,
    /// Reserved segment listing outbound edges
    pub out_edge_folder: String,
    /// Property holding file content
    pub data_property: String,
    /// Property holding an inline render template
    pub template_property: String,
    /// Permission bits of new vertices
    pub default_mode: u32,
    /// Owner of new vertices
    pub default_uid: u32,
    /// Group of new vertices
    pub default_gid: u32,
    /// Maximum hops of the render context walk
    pub render_depth: usize,
    /// Ordered label rules
    pub labels: Vec<LabelRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fs_root: None,
            fs_ns: "gfs1".to_string(),
            mount_point: String::new(),
            folder_label: "group".to_string(),
            in_label: "in".to_string(),
            in_name: "in0".to_string(),
            self_label: "self".to_string(),
            self_name: "self0".to_string(),
            template_label: "template".to_string(),
            vertex_folder: ".V".to_string(),
            label_folder: ".L".to_string(),
            in_edge_folder: "IN".to_string(),
            out_edge_folder: "OUT".to_string(),
            data_property: "data".to_string(),
            template_property: "template".to_string(),
            default_mode: 0o644,
            default_uid: 0,
            default_gid: 0,
            render_depth: 10,
            labels: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidConfig`] if the document does not parse or
    /// a label pattern does not compile.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(text).map_err(|e| GraphError::config("Failed to parse configuration", Some(e)))?;
        for rule in &mut config.labels {
            rule.compile()?;
        }
        debug!("Loaded configuration with {} label rules", config.labels.len());
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GraphError::config(format!("Failed to read configuration from {:?}", path.as_ref()), Some(e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Builder: append a label rule.
    pub fn with_rule(mut self, rule: LabelRule) -> Self {
        self.labels.push(rule);
        self
    }

    /// Builder: set the filesystem root identifier.
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.fs_root = Some(root.into());
        self
    }

    /// Builder: inject a read hook for `label`.
    ///
    /// Attaches to the first rule for the label, adding a pattern-less file
    /// rule when there is none.
    pub fn with_read_hook<F>(mut self, label: &str, hook: F) -> Self
    where
        F: Fn(&Vertex, &serde_json::Value, &[u8]) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.rule_entry(label).read_hook = Some(Arc::new(hook));
        self
    }

    /// Builder: inject a write hook for `label`.
    pub fn with_write_hook<F>(mut self, label: &str, hook: F) -> Self
    where
        F: Fn(&Vertex, &[u8]) -> Result<()> + Send + Sync + 'static,
    {
        self.rule_entry(label).write_hook = Some(Arc::new(hook));
        self
    }

    fn rule_entry(&mut self, label: &str) -> &mut LabelRule {
        let index = match self.labels.iter().position(|r| r.label == label) {
            Some(index) => index,
            None => {
                self.labels.push(LabelRule {
                    label: label.to_string(),
                    fs_type: FsType::File,
                    pattern: None,
                    template: None,
                    compiled: None,
                    read_hook: None,
                    write_hook: None,
                });
                self.labels.len() - 1
            }
        };
        &mut self.labels[index]
    }

    /// First rule configured for `label`.
    pub fn label_rule(&self, label: &str) -> Option<&LabelRule> {
        self.labels.iter().find(|r| r.label == label)
    }

    /// Rules whose type is `fs_type`, in configuration order.
    pub fn rules_for(&self, fs_type: FsType) -> impl Iterator<Item = &LabelRule> {
        self.labels.iter().filter(move |r| r.fs_type == fs_type)
    }

    /// True if vertices carrying `label` are folders.
    pub fn is_folder_label(&self, label: &str) -> bool {
        label == self.folder_label
            || self
                .labels
                .iter()
                .any(|r| r.label == label && r.fs_type == FsType::Folder)
    }

    /// True if vertices carrying `label` are files.
    pub fn is_file_label(&self, label: &str) -> bool {
        !self.is_folder_label(label)
    }
}
