/// Alias mapping from short scope names to canonical scopes

use std::collections::{HashMap, HashSet};

use super::scopes::Scopes;
use super::types::{Scope, ScopeResult};

/// Maps short alias tokens to one or more canonical scope strings
///
/// Configured once at startup and shared by every request.
///
/// # Examples
///
/// ```
/// use gatehouse_authz::scope::Aliases;
///
/// let aliases = Aliases::new().with_alias("admin", ["btc.me", "btc.account"]);
/// let scopes = aliases.map(["admin", "btc.foo"]).unwrap();
/// assert_eq!(scopes.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Aliases {
    mapping: HashMap<String, Vec<String>>,
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds aliases from a plain mapping
    pub fn from_mapping(mapping: HashMap<String, Vec<String>>) -> Self {
        Self { mapping }
    }

    /// Registers an alias; keys and targets may be strings, scopes or tree nodes
    pub fn with_alias<K, I, V>(mut self, alias: K, targets: I) -> Self
    where
        K: ToString,
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        self.mapping.insert(
            alias.to_string(),
            targets.into_iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn is_alias(&self, token: &str) -> bool {
        self.mapping.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Replaces aliases with their canonical scopes
    ///
    /// Unknown tokens pass through unchanged; the result is deduplicated.
    pub fn map<I, S>(&self, scopes: I) -> ScopeResult<Scopes>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        for token in scopes {
            let token = token.as_ref();
            match self.mapping.get(token) {
                Some(targets) => {
                    for target in targets {
                        push_unique(&mut seen, &mut resolved, target)?;
                    }
                }
                None => push_unique(&mut seen, &mut resolved, token)?,
            }
        }

        Ok(Scopes::new(resolved))
    }

    /// Keeps registered aliases alongside their canonical scopes
    ///
    /// Tokens that are not aliases are dropped.
    pub fn expand<I, S>(&self, scopes: I) -> ScopeResult<Scopes>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registered: Vec<String> = scopes
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .filter(|s| self.mapping.contains_key(s))
            .collect();

        let mut seen = HashSet::new();
        let mut resolved = Vec::new();
        for alias in &registered {
            push_unique(&mut seen, &mut resolved, alias)?;
        }
        for alias in &registered {
            for target in &self.mapping[alias] {
                push_unique(&mut seen, &mut resolved, target)?;
            }
        }

        Ok(Scopes::new(resolved))
    }
}

fn push_unique(seen: &mut HashSet<String>, out: &mut Vec<Scope>, raw: &str) -> ScopeResult<()> {
    if seen.insert(raw.to_string()) {
        out.push(Scope::parse(raw)?);
    }
    Ok(())
}
