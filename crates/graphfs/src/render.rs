//! File content rendering.
//!
//! A vertex's content is its stored `data` property, optionally passed
//! through a template or a read hook together with a context built from the
//! vertices that point at it.

use crate::config::ReadHook;
use crate::context::FsContext;
use crate::error::Result;
use crate::graph::{Direction, PathStep, Vertex};
use crate::node::{decode_data, Nodes};
use crate::template::Template;
use log::{error, trace};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Where a vertex's template comes from.
#[derive(Clone)]
pub enum TemplateSource {
    /// Template text
    Text(String),
    /// Read hook of the vertex's label rule
    Hook(ReadHook),
    /// Content is served unchanged
    None,
}

impl std::fmt::Debug for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::Text(text) => f.debug_tuple("Text").field(text).finish(),
            TemplateSource::Hook(_) => f.write_str("Hook"),
            TemplateSource::None => f.write_str("None"),
        }
    }
}

fn object(map: BTreeMap<String, String>) -> Value {
    Value::Object(map.into_iter().map(|(k, v)| (k, Value::String(v))).collect::<Map<_, _>>())
}

fn descend_edge<'v>(cursor: &'v mut Value, label: &str) -> Option<&'v mut Value> {
    let Value::Object(map) = cursor else {
        return None;
    };
    let slot = map
        .entry(label.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    // a property of the same name shadows the edge
    slot.is_array().then_some(slot)
}

fn descend_vertex<'v>(cursor: &'v mut Value, vertex: &Vertex) -> Option<&'v mut Value> {
    let Value::Array(items) = cursor else {
        return None;
    };
    let id = vertex.id.to_string();
    let index = match items
        .iter()
        .position(|item| item.get("id").and_then(Value::as_str) == Some(id.as_str()))
    {
        Some(index) => index,
        None => {
            items.push(object(vertex.all()));
            items.len() - 1
        }
    };
    items.get_mut(index)
}

/// Content renderer bound to one context.
pub struct Renderer<'a> {
    ctx: &'a FsContext,
    nodes: Nodes<'a>,
}

impl<'a> Renderer<'a> {
    /// Bind to a context.
    pub fn new(ctx: &'a FsContext) -> Self {
        Self {
            ctx,
            nodes: Nodes::new(ctx),
        }
    }

    /// Raw stored content, decoded.
    pub fn data(&self, vertex: &Vertex) -> Vec<u8> {
        self.nodes
            .read_property(vertex, &self.ctx.config.data_property)
            .unwrap_or_default()
    }

    /// Pick the template: the target of an outbound template edge, then the
    /// template property, then the label rule's template, then its read hook.
    pub fn template_source(&self, vertex: &Vertex) -> Result<TemplateSource> {
        let config = &self.ctx.config;

        if let Some(target) = self
            .nodes
            .edge_node(vertex, &config.template_label, Direction::Outbound)?
        {
            if let Some(text) = self.nodes.read_property(&target, &config.data_property) {
                return Ok(TemplateSource::Text(String::from_utf8_lossy(&text).into_owned()));
            }
        }

        if let Some(value) = vertex.properties.get(&config.template_property) {
            return Ok(TemplateSource::Text(
                String::from_utf8_lossy(&decode_data(value)).into_owned(),
            ));
        }

        if let Some(rule) = config.label_rule(&vertex.label) {
            if let Some(template) = &rule.template {
                return Ok(TemplateSource::Text(template.clone()));
            }
            if let Some(hook) = rule.read_hook() {
                return Ok(TemplateSource::Hook(hook.clone()));
            }
        }

        Ok(TemplateSource::None)
    }

    /// Build the render context.
    ///
    /// The root is the vertex's own property map. Each inbound path is folded
    /// in: an edge opens (or reuses) a list keyed by its label at the current
    /// level; the vertex after it is appended to that list, or merged with an
    /// entry of the same id, and becomes the current level.
    pub fn context(&self, vertex: &Vertex) -> Result<Value> {
        let paths = self
            .ctx
            .backend
            .inbound_paths(vertex.id, self.ctx.config.render_depth)?;
        trace!("Folding {} inbound paths for vertex {}", paths.len(), vertex.id);

        let mut root = object(vertex.all());
        for path in &paths {
            let mut cursor = &mut root;
            let mut has_label = false;
            for step in path {
                let next = match step {
                    PathStep::Edge(edge) => {
                        has_label = true;
                        descend_edge(cursor, &edge.label)
                    }
                    PathStep::Vertex(v) if has_label => descend_vertex(cursor, v),
                    PathStep::Vertex(_) => continue,
                };
                match next {
                    Some(next) => cursor = next,
                    None => break,
                }
            }
        }
        Ok(root)
    }

    /// Produce the file content of `vertex`.
    ///
    /// Template and hook failures are logged; the raw content is returned
    /// in their place.
    pub fn render(&self, vertex: &Vertex) -> Result<Vec<u8>> {
        let data = self.data(vertex);

        let source = match self.template_source(vertex) {
            Ok(source) => source,
            Err(e) => {
                error!("Failed to select template for {}: {e}", vertex.to_id(false));
                TemplateSource::None
            }
        };
        if let TemplateSource::None = source {
            return Ok(data);
        }

        let context = match self.context(vertex) {
            Ok(context) => context,
            Err(e) => {
                error!("Failed to build render context for {}: {e}", vertex.to_id(false));
                return Ok(data);
            }
        };

        match source {
            TemplateSource::Text(text) => match Template::compile(&text) {
                Ok(template) => Ok(template.render(&context).into_bytes()),
                Err(e) => {
                    error!("Failed to render {}: {e}", vertex.to_id(false));
                    Ok(data)
                }
            },
            TemplateSource::Hook(hook) => match hook(vertex, &context, &data) {
                Ok(rendered) => Ok(rendered),
                Err(e) => {
                    error!("Read hook failed for {}: {e}", vertex.to_id(false));
                    Ok(data)
                }
            },
            TemplateSource::None => Ok(data),
        }
    }
}
