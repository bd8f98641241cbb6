//! Declared scope hierarchies
//!
//! A [`ScopeTree`] records which scope paths are legal for an application and
//! hands out [`Node`] values that can only walk those paths. Nodes convert
//! into [`Scope`]s, so endpoints and aliases can be declared without typing
//! scope strings by hand.
//!
//! # Examples
//!
//! ```
//! use gatehouse_authz::scope::ScopeTree;
//!
//! let tree = ScopeTree::build("bootic", |bootic| {
//!     bootic.path("api.products.own.read");
//!     bootic.path("api.products.all.read");
//!     bootic.path("api.shops").any_matching("shop_id", r"\d+").child("read");
//! })
//! .unwrap();
//!
//! let node = tree.path("bootic.api.products.*.read").unwrap();
//! assert_eq!(node.to_string(), "bootic.api.products.*.read");
//!
//! let shop = tree.path("bootic.api.shops").unwrap().value("shop_id", "12").unwrap();
//! assert_eq!(shop.to_string(), "bootic.api.shops.12");
//! assert!(tree.path("bootic.api.orders").is_err());
//! ```

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::segment::{Segment, WILDCARD};
use super::types::{IntoScope, Scope, ScopeError, ScopeResult, SEPARATOR};

/// Value constraint for an "any" position
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Accepts every value
    Anything,
    /// Accepts values fully matching the expression
    Regex(Regex),
    /// Accepts values from a fixed list
    OneOf(Vec<String>),
}

impl Matcher {
    /// Compiles an anchored regex matcher
    pub fn regex(pattern: &str) -> ScopeResult<Self> {
        Regex::new(&format!("^(?:{})$", pattern))
            .map(Matcher::Regex)
            .map_err(|e| {
                ScopeError::InvalidArgument(format!("invalid pattern '{}': {}", pattern, e))
            })
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Matcher::OneOf(values.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Anything => true,
            Matcher::Regex(regex) => regex.is_match(value),
            Matcher::OneOf(values) => values.iter().any(|v| v == value),
        }
    }
}

#[derive(Debug, Clone)]
enum Constraint {
    Anything,
    Pattern(String),
    OneOf(Vec<String>),
}

impl Constraint {
    fn compile(&self) -> ScopeResult<Matcher> {
        match self {
            Constraint::Anything => Ok(Matcher::Anything),
            Constraint::Pattern(pattern) => Matcher::regex(pattern),
            Constraint::OneOf(values) => Ok(Matcher::OneOf(values.clone())),
        }
    }
}

/// Mutable declaration handed to [`ScopeTree::build`]
///
/// Registering the same name twice under one parent reuses the existing
/// child, so paths can be declared in any order.
#[derive(Debug, Clone)]
pub struct ScopeRecorder {
    segment: String,
    constraint: Option<Constraint>,
    children: Vec<ScopeRecorder>,
}

impl ScopeRecorder {
    fn new(segment: String, constraint: Option<Constraint>) -> Self {
        Self {
            segment,
            constraint,
            children: Vec::new(),
        }
    }

    fn register(&mut self, name: String, constraint: Option<Constraint>) -> &mut ScopeRecorder {
        let index = match self.children.iter().position(|c| c.segment == name) {
            Some(index) => {
                if constraint.is_some() {
                    self.children[index].constraint = constraint;
                }
                index
            }
            None => {
                self.children.push(ScopeRecorder::new(name, constraint));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Declares (or reopens) a literal child
    pub fn child(&mut self, name: impl Into<String>) -> &mut ScopeRecorder {
        self.register(name.into(), None)
    }

    /// Declares a literal child and configures it in a block, returning self
    /// so siblings can be chained
    pub fn with<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: FnOnce(&mut ScopeRecorder),
    {
        f(self.child(name));
        self
    }

    /// Declares a dotted chain of literal children and returns the deepest
    pub fn path(&mut self, dotted: &str) -> &mut ScopeRecorder {
        let mut node = self;
        for part in dotted.split(SEPARATOR) {
            node = node.child(part);
        }
        node
    }

    /// Declares a position that accepts any value
    pub fn any(&mut self, name: impl Into<String>) -> &mut ScopeRecorder {
        self.register(name.into(), Some(Constraint::Anything))
    }

    /// Declares a position whose values must match `pattern`
    ///
    /// The pattern is compiled when the tree is built.
    pub fn any_matching(&mut self, name: impl Into<String>, pattern: &str) -> &mut ScopeRecorder {
        self.register(name.into(), Some(Constraint::Pattern(pattern.to_string())))
    }

    /// Declares a position whose values must be one of `values`
    pub fn any_of<I, S>(&mut self, name: impl Into<String>, values: I) -> &mut ScopeRecorder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.register(name.into(), Some(Constraint::OneOf(values)))
    }

    fn freeze(&self) -> ScopeResult<Arc<NodeDef>> {
        validate_name(&self.segment)?;

        let matchers = match &self.constraint {
            Some(constraint) => Some(vec![Arc::new(constraint.compile()?)]),
            None => None,
        };
        let children = self
            .children
            .iter()
            .map(ScopeRecorder::freeze)
            .collect::<ScopeResult<Vec<_>>>()?;

        Ok(Arc::new(NodeDef {
            segment: self.segment.clone(),
            matchers,
            children,
        }))
    }
}

fn validate_name(name: &str) -> ScopeResult<()> {
    let segment = Segment::parse(name)?;
    if name.contains(SEPARATOR)
        || !matches!(segment, Segment::Literal(_))
        || segment.template_key().is_some()
    {
        return Err(ScopeError::InvalidArgument(format!(
            "tree segment '{}' must be a plain name",
            name
        )));
    }
    Ok(())
}

/// Frozen declaration shared by every node handed out for it
#[derive(Debug)]
struct NodeDef {
    segment: String,
    /// `None` for literal positions, matchers for "any" positions
    matchers: Option<Vec<Arc<Matcher>>>,
    children: Vec<Arc<NodeDef>>,
}

impl NodeDef {
    fn child(&self, name: &str) -> Option<&Arc<NodeDef>> {
        self.children.iter().find(|c| c.segment == name)
    }
}

/// Children reachable through every one of `parents`, merged by name
fn intersect(parents: &[&Arc<NodeDef>]) -> Vec<Arc<NodeDef>> {
    let Some((first, rest)) = parents.split_first() else {
        return Vec::new();
    };

    first
        .children
        .iter()
        .filter_map(|candidate| {
            let mut same: Vec<&Arc<NodeDef>> = vec![candidate];
            for parent in rest {
                same.push(parent.child(&candidate.segment)?);
            }

            // A literal declaration anywhere wins over "any" positions
            let matchers = if same.iter().any(|d| d.matchers.is_none()) {
                None
            } else {
                Some(
                    same.iter()
                        .flat_map(|d| d.matchers.iter().flatten().cloned())
                        .collect(),
                )
            };

            Some(Arc::new(NodeDef {
                segment: candidate.segment.clone(),
                matchers,
                children: intersect(&same),
            }))
        })
        .collect()
}

/// A position in a [`ScopeTree`]
#[derive(Debug, Clone)]
pub struct Node {
    segments: Vec<Segment>,
    def: Arc<NodeDef>,
}

impl Node {
    fn step(&self, segment: Segment, def: Arc<NodeDef>) -> Node {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Node { segments, def }
    }

    fn undeclared(&self, name: &str) -> ScopeError {
        ScopeError::InvalidScopeHierarchy(format!("'{}' is not declared under '{}'", name, self))
    }

    /// Follows a declared child
    ///
    /// For an "any" position this yields the template segment `<name>`.
    pub fn at(&self, name: &str) -> ScopeResult<Node> {
        let child = self.def.child(name).ok_or_else(|| self.undeclared(name))?;
        let segment = match child.matchers {
            None => Segment::Literal(name.to_string()),
            Some(_) => Segment::Literal(format!("<{}>", name)),
        };
        Ok(self.step(segment, Arc::clone(child)))
    }

    /// Fills the "any" position `name` with a concrete value
    pub fn value(&self, name: &str, value: &str) -> ScopeResult<Node> {
        let child = self.def.child(name).ok_or_else(|| self.undeclared(name))?;
        let matchers = child.matchers.as_ref().ok_or_else(|| {
            ScopeError::InvalidScopeHierarchy(format!(
                "'{}' under '{}' only accepts its own name",
                name, self
            ))
        })?;

        if !matchers.iter().all(|m| m.matches(value)) {
            return Err(ScopeError::InvalidScopeHierarchy(format!(
                "value '{}' is not accepted for '{}' under '{}'",
                value, name, self
            )));
        }

        match Segment::parse(value)? {
            segment @ Segment::Literal(_) => Ok(self.step(segment, Arc::clone(child))),
            _ => Err(ScopeError::InvalidArgument(format!(
                "'{}' is not a single value",
                value
            ))),
        }
    }

    /// Wildcard over every child, restricted to the grandchildren they share
    pub fn wildcard(&self) -> Node {
        let children: Vec<&Arc<NodeDef>> = self.def.children.iter().collect();
        let def = Arc::new(NodeDef {
            segment: WILDCARD.to_string(),
            matchers: None,
            children: intersect(&children),
        });
        self.step(Segment::Wildcard, def)
    }

    /// Walks a dotted relative path; `*` steps through [`Node::wildcard`]
    pub fn path(&self, dotted: &str) -> ScopeResult<Node> {
        let mut node = self.clone();
        for part in dotted.split(SEPARATOR) {
            node = if part == WILDCARD {
                node.wildcard()
            } else {
                node.at(part)?
            };
        }
        Ok(node)
    }

    pub fn to_scope(&self) -> Scope {
        Scope::from_segments(self.segments.clone())
    }

    pub fn segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Names declared directly below this node
    pub fn children(&self) -> Vec<&str> {
        self.def.children.iter().map(|c| c.segment.as_str()).collect()
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.def.child(name).is_some()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_scope())
    }
}

impl IntoScope for Node {
    fn into_scope(self) -> ScopeResult<Scope> {
        Ok(Scope::from_segments(self.segments))
    }
}

impl IntoScope for &Node {
    fn into_scope(self) -> ScopeResult<Scope> {
        Ok(self.to_scope())
    }
}

/// Validated hierarchy of legal scopes
#[derive(Debug, Clone)]
pub struct ScopeTree {
    root: Node,
}

impl ScopeTree {
    /// Records the hierarchy under `root` and freezes it
    pub fn build<F>(root: &str, f: F) -> ScopeResult<Self>
    where
        F: FnOnce(&mut ScopeRecorder),
    {
        let mut recorder = ScopeRecorder::new(root.to_string(), None);
        f(&mut recorder);
        let def = recorder.freeze()?;

        Ok(Self {
            root: Node {
                segments: vec![Segment::Literal(root.to_string())],
                def,
            },
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Walks a dotted path starting with the root segment
    pub fn path(&self, dotted: &str) -> ScopeResult<Node> {
        let (first, rest) = match dotted.split_once(SEPARATOR) {
            Some((first, rest)) => (first, Some(rest)),
            None => (dotted, None),
        };

        if first != self.root.def.segment {
            return Err(ScopeError::InvalidScopeHierarchy(format!(
                "'{}' does not start at root '{}'",
                dotted, self.root.def.segment
            )));
        }

        match rest {
            Some(rest) => self.root.path(rest),
            None => Ok(self.root.clone()),
        }
    }
}
