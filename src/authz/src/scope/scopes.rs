/// Sorted collections of granted scopes

use std::cmp::Reverse;
use std::fmt;

use super::types::{IntoScope, Scope, ScopeResult};

/// A set of scopes, ordered most specific first
///
/// Specificity is a strict weak ordering: more segments first, then fewer
/// wildcard segments first. Scopes that tie on both keys (for example two
/// incomparable siblings) keep the order in which they were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    pub fn new<I>(scopes: I) -> Self
    where
        I: IntoIterator<Item = Scope>,
    {
        let mut scopes: Vec<Scope> = scopes.into_iter().collect();
        // sort_by_key is stable, ties keep insertion order
        scopes.sort_by_key(|scope| (Reverse(scope.depth()), scope.wildcard_count()));
        Self { scopes }
    }

    /// Parses every entry into a [`Scope`]
    pub fn parse<I, S>(scopes: I) -> ScopeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: IntoScope,
    {
        let scopes = scopes
            .into_iter()
            .map(IntoScope::into_scope)
            .collect::<ScopeResult<Vec<_>>>()?;
        Ok(Self::new(scopes))
    }

    /// First (most specific) member that covers `candidate`
    pub fn resolve(&self, candidate: &Scope) -> Option<&Scope> {
        self.scopes.iter().find(|scope| scope.can(candidate))
    }

    /// Whether some member covers some member of `other`
    pub fn can(&self, other: &Scopes) -> bool {
        self.scopes
            .iter()
            .any(|granted| other.scopes.iter().any(|required| granted.can(required)))
    }

    /// Whether some member covers `scope`
    pub fn can_scope(&self, scope: &Scope) -> bool {
        self.resolve(scope).is_some()
    }

    /// Whether a single member covers every member of `other`
    pub fn covers(&self, other: &Scopes) -> bool {
        self.scopes
            .iter()
            .any(|granted| other.scopes.iter().all(|required| granted.can(required)))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scope> {
        self.scopes.iter()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn contains(&self, scope: &Scope) -> bool {
        self.scopes.contains(scope)
    }

    /// Members rendered as strings, in order
    pub fn to_strings(&self) -> Vec<String> {
        self.scopes.iter().map(ToString::to_string).collect()
    }
}

impl From<Scope> for Scopes {
    fn from(scope: Scope) -> Self {
        Self {
            scopes: vec![scope],
        }
    }
}

impl FromIterator<Scope> for Scopes {
    fn from_iter<T: IntoIterator<Item = Scope>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a Scopes {
    type Item = &'a Scope;
    type IntoIter = std::slice::Iter<'a, Scope>;

    fn into_iter(self) -> Self::IntoIter {
        self.scopes.iter()
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}
