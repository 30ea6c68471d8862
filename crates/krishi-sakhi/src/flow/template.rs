//! Prompt templates with placeholder substitution and repeated blocks.
//!
//! Syntax:
//!
//! - `{{field}}`, `{{a.b}}`: substitute a value from the context. Strings are
//!   inserted verbatim; numbers and booleans in JSON form; missing or `null`
//!   values render as nothing.
//! - `{{#each list}} ... {{/each}}`: render the body once per array element,
//!   in order. Inside the body the element is the innermost scope, `{{this}}`
//!   is the element itself and `{{@index}}` its zero-based position. Lookups
//!   that miss the element fall back to the enclosing scopes.
//! - A block tag alone on its line removes that whole line from the output.
//!
//! Rendering is a pure function of the template and the context.
//!
//! ```
//! use krishi_sakhi::flow::template::PromptTemplate;
//!
//! let template = PromptTemplate::parse(
//!     "Location: {{location}}\n{{#each crops}}\n- {{this}}\n{{/each}}\n",
//! )
//! .unwrap();
//! let prompt = template
//!     .render(&serde_json::json!({"location": "Thrissur", "crops": ["Paddy", "Banana"]}))
//!     .unwrap();
//! assert_eq!(prompt, "Location: Thrissur\n- Paddy\n- Banana\n");
//! ```

use serde_json::Value;
use thiserror::Error;

/// A template that failed to parse or render.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("tag opened at byte {0} is never closed")]
    UnclosedTag(usize),
    #[error("empty expression at byte {0}")]
    EmptyExpression(usize),
    #[error("unknown block helper '{helper}' at byte {offset}")]
    UnknownHelper { helper: String, offset: usize },
    #[error("block '{{{{#each {field}}}}}' opened at byte {offset} is never closed")]
    UnclosedBlock { field: String, offset: usize },
    #[error("'{{{{/{helper}}}}}' at byte {offset} has no matching opening block")]
    UnmatchedClose { helper: String, offset: usize },
    #[error("'{field}' is not an array and cannot be iterated")]
    NotAnArray { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Path {
    This,
    Index,
    Field(Vec<String>),
}

impl Path {
    fn parse(expr: &str) -> Self {
        match expr {
            "this" | "." => Path::This,
            "@index" => Path::Index,
            _ => {
                let expr = expr.strip_prefix("this.").unwrap_or(expr);
                Path::Field(expr.split('.').map(str::to_string).collect())
            }
        }
    }

    fn label(&self) -> String {
        match self {
            Path::This => "this".into(),
            Path::Index => "@index".into(),
            Path::Field(segments) => segments.join("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Var(Path),
    Each { path: Path, body: Vec<Node> },
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    nodes: Vec<Node>,
}

struct OpenBlock {
    path: Path,
    offset: usize,
    nodes: Vec<Node>,
}

impl PromptTemplate {
    /// Parse template source.
    // Byte offsets all come from `find` on ASCII delimiters, so every slice
    // lands on a char boundary.
    #[allow(clippy::string_slice)]
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut root: Vec<Node> = Vec::new();
        let mut open: Vec<OpenBlock> = Vec::new();
        let mut pos = 0;

        while let Some(rel) = source[pos..].find("{{") {
            let start = pos + rel;
            let inner = start + 2;
            let close = source[inner..]
                .find("}}")
                .map(|i| inner + i)
                .ok_or(TemplateError::UnclosedTag(start))?;
            let end = close + 2;
            let expr = source[inner..close].trim();
            if expr.is_empty() {
                return Err(TemplateError::EmptyExpression(start));
            }

            let is_block = expr.starts_with('#') || expr.starts_with('/');
            let (text_end, next_pos) = if is_block {
                standalone_bounds(source, pos, start, end).unwrap_or((start, end))
            } else {
                (start, end)
            };

            let current = open.last_mut().map_or(&mut root, |b| &mut b.nodes);
            push_text(current, &source[pos..text_end]);
            pos = next_pos;

            if let Some(block) = expr.strip_prefix('#') {
                let (helper, arg) = split_helper(block);
                if helper != "each" || arg.is_empty() {
                    return Err(TemplateError::UnknownHelper {
                        helper: block.to_string(),
                        offset: start,
                    });
                }
                open.push(OpenBlock {
                    path: Path::parse(arg),
                    offset: start,
                    nodes: Vec::new(),
                });
            } else if let Some(helper) = expr.strip_prefix('/') {
                let helper = helper.trim();
                let block = match open.pop() {
                    Some(block) if helper == "each" => block,
                    _ => {
                        return Err(TemplateError::UnmatchedClose {
                            helper: helper.to_string(),
                            offset: start,
                        });
                    }
                };
                let parent = open.last_mut().map_or(&mut root, |b| &mut b.nodes);
                parent.push(Node::Each {
                    path: block.path,
                    body: block.nodes,
                });
            } else {
                current_nodes(&mut root, &mut open).push(Node::Var(Path::parse(expr)));
            }
        }

        if let Some(block) = open.pop() {
            return Err(TemplateError::UnclosedBlock {
                field: block.path.label(),
                offset: block.offset,
            });
        }
        push_text(&mut root, &source[pos..]);
        Ok(Self { nodes: root })
    }

    /// Render against a JSON context.
    pub fn render(&self, context: &Value) -> Result<String, TemplateError> {
        let mut out = String::new();
        let mut scopes = vec![Scope {
            value: context,
            index: None,
        }];
        render_nodes(&self.nodes, &mut scopes, &mut out)?;
        Ok(out)
    }

    /// Top-level field names referenced by the template, in first-use order.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        collect_fields(&self.nodes, 0, &mut fields);
        fields
    }
}

fn current_nodes<'a>(root: &'a mut Vec<Node>, open: &'a mut [OpenBlock]) -> &'a mut Vec<Node> {
    open.last_mut().map_or(root, |b| &mut b.nodes)
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(prev)) = nodes.last_mut() {
        prev.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

fn split_helper(block: &str) -> (&str, &str) {
    let block = block.trim();
    match block.split_once(char::is_whitespace) {
        Some((helper, arg)) => (helper, arg.trim()),
        None => (block, ""),
    }
}

/// If the tag spanning `start..end` is alone on its line, return the end of
/// the preceding text (dropping the line's indentation) and the position
/// just past the line's newline.
#[allow(clippy::string_slice)]
fn standalone_bounds(source: &str, pos: usize, start: usize, end: usize) -> Option<(usize, usize)> {
    let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
    if line_start < pos || !source[line_start..start].trim().is_empty() {
        return None;
    }
    let line_end = source[end..].find('\n').map_or(source.len(), |i| end + i + 1);
    if !source[end..line_end].trim().is_empty() {
        return None;
    }
    Some((line_start, line_end))
}

struct Scope<'v> {
    value: &'v Value,
    index: Option<usize>,
}

fn render_nodes<'v>(
    nodes: &[Node],
    scopes: &mut Vec<Scope<'v>>,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(Path::Index) => {
                if let Some(index) = scopes.last().and_then(|s| s.index) {
                    out.push_str(&index.to_string());
                }
            }
            Node::Var(path) => {
                if let Some(value) = lookup(scopes, path) {
                    write_value(value, out);
                }
            }
            Node::Each { path, body } => match lookup(scopes, path) {
                None | Some(Value::Null) => {}
                Some(Value::Array(items)) => {
                    for (index, item) in items.iter().enumerate() {
                        scopes.push(Scope {
                            value: item,
                            index: Some(index),
                        });
                        let result = render_nodes(body, scopes, out);
                        scopes.pop();
                        result?;
                    }
                }
                Some(_) => {
                    return Err(TemplateError::NotAnArray {
                        field: path.label(),
                    });
                }
            },
        }
    }
    Ok(())
}

fn lookup<'v>(scopes: &[Scope<'v>], path: &Path) -> Option<&'v Value> {
    match path {
        Path::This => scopes.last().map(|s| s.value),
        Path::Index => None,
        Path::Field(segments) => scopes.iter().rev().find_map(|scope| {
            segments
                .iter()
                .try_fold(scope.value, |value, key| value.get(key.as_str()))
        }),
    }
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

fn collect_fields(nodes: &[Node], depth: usize, fields: &mut Vec<String>) {
    for node in nodes {
        let (path, body) = match node {
            Node::Text(_) => continue,
            Node::Var(path) => (path, None),
            Node::Each { path, body } => (path, Some(body)),
        };
        if depth == 0
            && let Path::Field(segments) = path
            && let Some(first) = segments.first()
            && !fields.contains(first)
        {
            fields.push(first.clone());
        }
        if let Some(body) = body {
            collect_fields(body, depth + 1, fields);
        }
    }
}
