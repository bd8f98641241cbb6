/// Scope type definitions and validation
///
/// Provides the core Scope type with hierarchical representation
/// and prefix/wildcard covering.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::segment::Segment;
use gatehouse_core::JsonMap;

/// Result type for scope operations
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors that can occur during scope operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// Input could not be turned into a scope
    #[error("Invalid scope argument: {0}")]
    InvalidArgument(String),

    /// `expand` was called without a value for a template marker
    #[error("Missing value for scope template <{0}>")]
    MissingTemplateValue(String),

    /// Navigation to a segment that was never declared in a scope tree
    #[error("Invalid scope hierarchy: {0}")]
    InvalidScopeHierarchy(String),
}

/// Separator between scope segments
pub const SEPARATOR: char = '.';

/// A hierarchical permission path such as `api.accounts:12.users.create`
///
/// A scope *covers* another when it is no longer than it and every one of its
/// segments covers the segment at the same position. Shorter scopes are more
/// general: `api.accounts` covers `api.accounts.users.create`.
///
/// # Examples
///
/// ```
/// use gatehouse_authz::scope::Scope;
///
/// let granted = Scope::wrap("api.*.read").unwrap();
/// assert!(granted.can(&Scope::wrap("api.products.read").unwrap()));
/// assert!(!granted.can(&Scope::wrap("api.products.write").unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    segments: Vec<Segment>,
}

/// Anything that can be turned into a [`Scope`]
pub trait IntoScope {
    fn into_scope(self) -> ScopeResult<Scope>;
}

impl Scope {
    /// Wraps a dotted string, a list of segments, an existing scope or any
    /// other [`IntoScope`] value
    pub fn wrap(value: impl IntoScope) -> ScopeResult<Self> {
        value.into_scope()
    }

    /// Parses a dotted scope string
    pub fn parse(raw: &str) -> ScopeResult<Self> {
        if raw.is_empty() {
            return Err(ScopeError::InvalidArgument(
                "scope cannot be empty".to_string(),
            ));
        }

        Self::from_parts(raw.split(SEPARATOR))
    }

    /// Builds a scope from individual segment strings
    pub fn from_parts<I, S>(parts: I) -> ScopeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments = parts
            .into_iter()
            .map(|part| Segment::parse(part.as_ref()))
            .collect::<ScopeResult<Vec<_>>>()?;

        if segments.is_empty() {
            return Err(ScopeError::InvalidArgument(
                "scope needs at least one segment".to_string(),
            ));
        }

        Ok(Self { segments })
    }

    /// Builds a scope from already parsed segments
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments that accept any value
    pub fn wildcard_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_wildcard()).count()
    }

    pub fn has_wildcards(&self) -> bool {
        self.wildcard_count() > 0
    }

    /// Whether any segment still carries a `<key>` marker for [`Scope::expand`]
    pub fn is_template(&self) -> bool {
        self.segments.iter().any(|s| s.template_key().is_some())
    }

    /// Segment strings, as in `["api", "shops:1,2"]`
    pub fn to_parts(&self) -> Vec<String> {
        self.segments.iter().map(ToString::to_string).collect()
    }

    /// Scope without its first segment
    pub fn tail(&self) -> Scope {
        Self {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    /// Returns the parent scope if it exists
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }

        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Returns a new scope with one more segment
    pub fn join(&self, segment: Segment) -> Scope {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Substitutes template markers (`<key>` or `name:<key>`) with values from `attrs`
    ///
    /// Lists expand to value sets, so `shops:<ids>` with `[1, 2]` becomes
    /// `shops:1,2`. Segments without a marker are kept as they are.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatehouse_authz::scope::Scope;
    /// use serde_json::json;
    ///
    /// let template = Scope::wrap("api.accounts:<account_id>.users").unwrap();
    /// let attrs = json!({"account_id": 42});
    /// let scope = template.expand(attrs.as_object().unwrap()).unwrap();
    /// assert_eq!(scope.to_string(), "api.accounts:42.users");
    /// ```
    pub fn expand(&self, attrs: &JsonMap) -> ScopeResult<Scope> {
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment.template_key() {
                Some(key) => {
                    let value = attrs
                        .get(key)
                        .ok_or_else(|| ScopeError::MissingTemplateValue(key.to_string()))?;
                    segment.fill(value)
                }
                None => Ok(segment.clone()),
            })
            .collect::<ScopeResult<Vec<_>>>()?;

        Ok(Self { segments })
    }

    /// Positional comparison
    ///
    /// - `Greater`: self is shorter than `other` and covers it (more general)
    /// - `Equal`: same length and every segment covers
    /// - `Less`: self is longer, or some segment does not cover
    pub fn compare(&self, other: &Scope) -> Ordering {
        if self.segments.len() > other.segments.len() {
            return Ordering::Less;
        }

        let all_match = self
            .segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| a.covers(b));

        if !all_match {
            Ordering::Less
        } else if self.segments.len() < other.segments.len() {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// Whether a principal holding this scope may access `other`
    pub fn can(&self, other: &Scope) -> bool {
        self.compare(other) != Ordering::Less
    }
}

impl IntoScope for Scope {
    fn into_scope(self) -> ScopeResult<Scope> {
        Ok(self)
    }
}

impl IntoScope for &Scope {
    fn into_scope(self) -> ScopeResult<Scope> {
        Ok(self.clone())
    }
}

impl IntoScope for &str {
    fn into_scope(self) -> ScopeResult<Scope> {
        Scope::parse(self)
    }
}

impl IntoScope for String {
    fn into_scope(self) -> ScopeResult<Scope> {
        Scope::parse(&self)
    }
}

impl IntoScope for &String {
    fn into_scope(self) -> ScopeResult<Scope> {
        Scope::parse(self)
    }
}

impl<S: AsRef<str>> IntoScope for Vec<S> {
    fn into_scope(self) -> ScopeResult<Scope> {
        Scope::from_parts(self)
    }
}

impl<S: AsRef<str>> IntoScope for &[S] {
    fn into_scope(self) -> ScopeResult<Scope> {
        Scope::from_parts(self)
    }
}

impl<S: AsRef<str>, const N: usize> IntoScope for [S; N] {
    fn into_scope(self) -> ScopeResult<Scope> {
        Scope::from_parts(self)
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}
