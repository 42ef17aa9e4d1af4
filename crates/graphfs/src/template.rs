//! Logic-less template substitution (a Mustache subset).
//!
//! Supported tags: `{{name}}` (HTML escaped), `{{{name}}}` and `{{& name}}`
//! (raw), dotted names, `{{.}}`, sections `{{#name}}..{{/name}}`, inverted
//! sections `{{^name}}..{{/name}}` and comments `{{! ..}}`. Partials render
//! as nothing. Section and comment tags alone on a line remove the line.

use crate::error::{GraphError, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Var { name: String, escape: bool },
    Section { name: String, inverted: bool, children: Vec<Node> },
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

#[derive(Debug)]
enum Tag<'a> {
    Var(&'a str, bool),
    Open(&'a str, bool),
    Close(&'a str),
    Comment,
    Partial,
}

impl Tag<'_> {
    fn standalone_capable(&self) -> bool {
        matches!(self, Tag::Open(..) | Tag::Close(_) | Tag::Comment | Tag::Partial)
    }
}

fn template_error(message: String) -> GraphError {
    GraphError::Template { message }
}

/// Parse the tag starting at `src[start..]` (just after `{{`).
/// Returns the tag and the offset just past its closing braces.
fn read_tag(src: &str, start: usize) -> Result<(Tag<'_>, usize)> {
    let rest = &src[start..];
    if let Some(body) = rest.strip_prefix('{') {
        let end = body
            .find("}}}")
            .ok_or_else(|| template_error(format!("unclosed tag at byte {start}")))?;
        return Ok((Tag::Var(body[..end].trim(), false), start + 1 + end + 3));
    }

    let end = rest
        .find("}}")
        .ok_or_else(|| template_error(format!("unclosed tag at byte {start}")))?;
    let inner = &rest[..end];
    let next = start + end + 2;
    let (sigil, body) = match inner.chars().next() {
        Some(c @ ('#' | '^' | '/' | '!' | '&' | '>' | '=')) => (Some(c), inner[1..].trim()),
        _ => (None, inner.trim()),
    };

    let tag = match sigil {
        Some('#') => Tag::Open(body, false),
        Some('^') => Tag::Open(body, true),
        Some('/') => Tag::Close(body),
        Some('!') => Tag::Comment,
        Some('&') => Tag::Var(body, false),
        Some('>') => Tag::Partial,
        Some('=') => {
            return Err(template_error(format!(
                "delimiter changes are not supported (byte {start})"
            )))
        }
        _ => Tag::Var(body, true),
    };
    if let Tag::Var(name, _) | Tag::Open(name, _) | Tag::Close(name) = &tag {
        if name.is_empty() {
            return Err(template_error(format!("empty tag at byte {start}")));
        }
    }
    Ok((tag, next))
}

impl Template {
    /// Compile template text.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Template`] for unclosed tags or sections,
    /// mismatched closing tags and delimiter changes.
    pub fn compile(src: &str) -> Result<Self> {
        // (name, inverted, nodes collected so far) for every open section
        let mut stack: Vec<(String, bool, Vec<Node>)> = Vec::new();
        let mut current: Vec<Node> = Vec::new();
        let mut text = String::new();
        let mut pos = 0;

        while let Some(found) = src[pos..].find("{{") {
            let tag_start = pos + found;
            text.push_str(&src[pos..tag_start]);
            let (tag, mut next) = read_tag(src, tag_start + 2)?;

            if tag.standalone_capable() {
                let line_start = src[..tag_start].rfind('\n').map_or(0, |i| i + 1);
                let after = &src[next..];
                let line_end = after.find('\n');
                let before_blank = src[line_start..tag_start].chars().all(|c| c == ' ' || c == '\t');
                let after_blank = after[..line_end.unwrap_or(after.len())]
                    .chars()
                    .all(|c| c == ' ' || c == '\t' || c == '\r');
                // pos > line_start means an earlier tag shares the line
                if pos <= line_start && before_blank && after_blank {
                    text.truncate(line_start - pos);
                    next += line_end.map_or(after.len(), |i| i + 1);
                }
            }

            if !text.is_empty() {
                current.push(Node::Text(std::mem::take(&mut text)));
            }

            match tag {
                Tag::Var(name, escape) => current.push(Node::Var {
                    name: name.to_string(),
                    escape,
                }),
                Tag::Open(name, inverted) => {
                    stack.push((name.to_string(), inverted, std::mem::take(&mut current)));
                }
                Tag::Close(name) => {
                    let (open, inverted, parent) = stack.pop().ok_or_else(|| {
                        template_error(format!("closing tag {name:?} without an open section"))
                    })?;
                    if open != name {
                        return Err(template_error(format!(
                            "section {open:?} closed by {name:?}"
                        )));
                    }
                    let children = std::mem::replace(&mut current, parent);
                    current.push(Node::Section {
                        name: open,
                        inverted,
                        children,
                    });
                }
                Tag::Comment | Tag::Partial => {}
            }
            pos = next;
        }

        text.push_str(&src[pos..]);
        if !text.is_empty() {
            current.push(Node::Text(text));
        }
        if let Some((name, _, _)) = stack.pop() {
            return Err(template_error(format!("unclosed section {name:?}")));
        }
        Ok(Self { nodes: current })
    }

    /// Substitute `context` into the template.
    pub fn render(&self, context: &Value) -> String {
        let mut out = String::new();
        let mut stack = vec![context];
        render_nodes(&self.nodes, &mut stack, &mut out);
        out
    }
}

/// Compile and render in one step.
pub fn render(src: &str, context: &Value) -> Result<String> {
    Ok(Template::compile(src)?.render(context))
}

fn render_nodes<'a>(nodes: &[Node], stack: &mut Vec<&'a Value>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var { name, escape } => {
                if let Some(value) = lookup(stack, name) {
                    let text = stringify(value);
                    if *escape {
                        out.push_str(&escape_html(&text));
                    } else {
                        out.push_str(&text);
                    }
                }
            }
            Node::Section { name, inverted, children } => {
                let value = lookup(stack, name);
                let truthy = value.is_some_and(is_truthy);
                if *inverted {
                    if !truthy {
                        render_nodes(children, stack, out);
                    }
                    continue;
                }
                let Some(value) = value.filter(|_| truthy) else {
                    continue;
                };
                match value {
                    Value::Array(items) => {
                        for item in items {
                            stack.push(item);
                            render_nodes(children, stack, out);
                            stack.pop();
                        }
                    }
                    other => {
                        stack.push(other);
                        render_nodes(children, stack, out);
                        stack.pop();
                    }
                }
            }
        }
    }
}

/// Resolve a possibly dotted name against the context stack, innermost
/// frame first. A key containing dots is tried whole before it is split.
fn lookup<'a>(stack: &[&'a Value], name: &str) -> Option<&'a Value> {
    if name == "." {
        return stack.last().copied();
    }

    for frame in stack.iter().rev() {
        if let Some(value) = frame.get(name) {
            return Some(value);
        }
        let mut parts = name.split('.');
        let head = parts.next()?;
        if let Some(mut value) = frame.get(head) {
            if !name.contains('.') {
                return Some(value);
            }
            for part in parts {
                value = value.get(part)?;
            }
            return Some(value);
        }
    }
    None
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
