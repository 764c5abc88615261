//! Namespace-scoped path queries over a [`Document`].
//!
//! Supports the location-path subset the catalog documents need:
//! `/a/b`, `a/b`, `//b`, `p:name`, `*`, and the predicates `[@k='v']`,
//! `[@k]` and `[n]`. As in XPath, `[n]` counts among the siblings that
//! share a parent, so `//a[1]` yields the first `a` of every parent.

use super::document::{Document, NodeId};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Prefix to namespace URI bindings used when resolving query name tests.
#[derive(Debug, Clone, Default)]
pub struct Namespaces {
    bindings: HashMap<String, String>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `uri`.
    pub fn with(mut self, prefix: &str, uri: &str) -> Self {
        self.bindings.insert(prefix.to_string(), uri.to_string());
        self
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Name {
        namespace: Option<String>,
        local: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    AttrEquals { name: String, value: String },
    AttrExists(String),
    Position(usize),
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NameTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone)]
struct Path {
    absolute: bool,
    steps: Vec<Step>,
}

fn parse_path(expr: &str, namespaces: &Namespaces) -> Result<Path> {
    let src = expr.trim();
    if src.is_empty() {
        return Err(Error::query(expr, "empty expression"));
    }

    let bytes = src.as_bytes();
    let absolute = src.starts_with('/');
    let mut steps = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let axis = if src[pos..].starts_with("//") {
            pos += 2;
            Axis::Descendant
        } else if bytes[pos] == b'/' {
            pos += 1;
            Axis::Child
        } else if steps.is_empty() {
            Axis::Child
        } else {
            return Err(Error::query(expr, format!("unexpected character at {}", pos)));
        };

        let name_end = src[pos..]
            .find(['/', '['])
            .map(|i| pos + i)
            .unwrap_or(src.len());
        let name = src[pos..name_end].trim();
        if name.is_empty() {
            return Err(Error::query(expr, format!("expected a name test at {}", pos)));
        }
        let test = parse_name_test(expr, name, namespaces)?;
        pos = name_end;

        let mut predicates = Vec::new();
        while pos < bytes.len() && bytes[pos] == b'[' {
            let close = find_closing_bracket(src, pos)
                .ok_or_else(|| Error::query(expr, "unterminated predicate"))?;
            predicates.push(parse_predicate(expr, &src[pos + 1..close])?);
            pos = close + 1;
        }

        steps.push(Step {
            axis,
            test,
            predicates,
        });
    }

    Ok(Path { absolute, steps })
}

fn parse_name_test(expr: &str, name: &str, namespaces: &Namespaces) -> Result<NameTest> {
    if name == "*" {
        return Ok(NameTest::Any);
    }
    match name.split_once(':') {
        Some((prefix, local)) => {
            let uri = namespaces
                .resolve(prefix)
                .ok_or_else(|| Error::query(expr, format!("unknown prefix '{}'", prefix)))?;
            Ok(NameTest::Name {
                namespace: Some(uri.to_string()),
                local: local.to_string(),
            })
        }
        None => Ok(NameTest::Name {
            namespace: None,
            local: name.to_string(),
        }),
    }
}

fn find_closing_bracket(src: &str, open: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in src[open + 1..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, ']') => return Some(open + 1 + i),
            _ => {}
        }
    }
    None
}

fn parse_predicate(expr: &str, body: &str) -> Result<Predicate> {
    let body = body.trim();
    if let Some(attr) = body.strip_prefix('@') {
        return match attr.split_once('=') {
            Some((name, value)) => {
                let value = value.trim();
                let unquoted = value
                    .strip_prefix('\'')
                    .and_then(|v| v.strip_suffix('\''))
                    .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                    .ok_or_else(|| {
                        Error::query(expr, format!("predicate value {} is not quoted", value))
                    })?;
                Ok(Predicate::AttrEquals {
                    name: name.trim().to_string(),
                    value: unquoted.to_string(),
                })
            }
            None => Ok(Predicate::AttrExists(attr.trim().to_string())),
        };
    }
    match body.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(Predicate::Position(n)),
        _ => Err(Error::query(expr, format!("unsupported predicate [{}]", body))),
    }
}

impl Document {
    /// Evaluate a path expression. `context` of `None` means the document
    /// itself; absolute paths always start from the document.
    pub fn select(
        &self,
        expr: &str,
        context: Option<NodeId>,
        namespaces: &Namespaces,
    ) -> Result<Vec<NodeId>> {
        let path = parse_path(expr, namespaces)?;
        let start = if path.absolute { None } else { context };
        let mut contexts: Vec<Option<NodeId>> = vec![start];
        let mut positions: Option<HashMap<NodeId, usize>> = None;

        for step in &path.steps {
            let mut matched = Vec::new();
            for ctx in &contexts {
                matched.extend(self.apply_step(step, *ctx));
            }

            if contexts.len() > 1 || step.axis == Axis::Descendant {
                let mut seen = HashSet::new();
                matched.retain(|id| seen.insert(*id));
                let order = positions.get_or_insert_with(|| self.document_positions());
                matched.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
            }

            contexts = matched.into_iter().map(Some).collect();
            if contexts.is_empty() {
                break;
            }
        }

        Ok(contexts.into_iter().flatten().collect())
    }

    /// First match of [`Document::select`], if any.
    pub fn select_first(
        &self,
        expr: &str,
        context: Option<NodeId>,
        namespaces: &Namespaces,
    ) -> Result<Option<NodeId>> {
        Ok(self.select(expr, context, namespaces)?.into_iter().next())
    }

    fn apply_step(&self, step: &Step, ctx: Option<NodeId>) -> Vec<NodeId> {
        // Candidates grouped by parent; positions count within a group.
        let groups: Vec<Vec<NodeId>> = match (step.axis, ctx) {
            (Axis::Child, None) => vec![vec![self.root()]],
            (Axis::Child, Some(id)) => vec![self.children(id).collect()],
            (Axis::Descendant, None) => std::iter::once(vec![self.root()])
                .chain(self.child_groups(self.root()))
                .collect(),
            (Axis::Descendant, Some(id)) => self.child_groups(id),
        };

        groups
            .into_iter()
            .flat_map(|group| self.filter_step(step, group))
            .collect()
    }

    /// Children of `id` and of each of its descendants, one group per parent.
    fn child_groups(&self, id: NodeId) -> Vec<Vec<NodeId>> {
        std::iter::once(id)
            .chain(self.descendants(id))
            .map(|parent| self.children(parent).collect())
            .collect()
    }

    fn filter_step(&self, step: &Step, candidates: Vec<NodeId>) -> Vec<NodeId> {
        let mut selected: Vec<NodeId> = candidates
            .into_iter()
            .filter(|id| self.matches_name(*id, &step.test))
            .collect();

        for predicate in &step.predicates {
            selected = match predicate {
                Predicate::AttrEquals { name, value } => selected
                    .into_iter()
                    .filter(|id| self.attribute(*id, name) == Some(value.as_str()))
                    .collect(),
                Predicate::AttrExists(name) => selected
                    .into_iter()
                    .filter(|id| self.attribute(*id, name).is_some())
                    .collect(),
                Predicate::Position(n) => selected.get(n - 1).copied().into_iter().collect(),
            };
        }
        selected
    }

    fn matches_name(&self, id: NodeId, test: &NameTest) -> bool {
        match test {
            NameTest::Any => true,
            NameTest::Name { namespace, local } => {
                self.local_name(id) == local.as_str() && self.namespace(id) == namespace.as_deref()
            }
        }
    }
}
