//! Per-segment authorization checks
//!
//! An [`AuthorizerTree`] is a trie keyed by scope segment. Each node carries
//! predicate checks that run when a granted scope walks through it, so
//! ownership rules can hang off the scopes they protect.
//!
//! # Examples
//!
//! ```
//! use gatehouse_authz::authorizers::AuthorizerTree;
//! use gatehouse_authz::scope::Scope;
//!
//! struct Owner { shop_ids: Vec<u32> }
//!
//! let tree: AuthorizerTree<Owner, u32> = AuthorizerTree::new()
//!     .at("btc.account.shops.mine", |_scope, owner: &Owner, shop_id: &u32| {
//!         owner.shop_ids.contains(shop_id)
//!     })
//!     .unwrap();
//!
//! let owner = Owner { shop_ids: vec![1, 2, 3] };
//! let scope = Scope::wrap("btc.account.shops.mine.show").unwrap();
//! assert!(tree.authorized(&scope, &owner, &2));
//! assert!(!tree.authorized(&scope, &owner, &10));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::scope::{IntoScope, Scope, ScopeResult};

/// A predicate over the remaining scope, the principal and request params
pub type Check<A, P> = Arc<dyn Fn(&Scope, &A, &P) -> bool + Send + Sync>;

/// Hierarchy of authorization checks keyed by scope segment
pub struct AuthorizerTree<A, P> {
    branches: HashMap<String, AuthorizerTree<A, P>>,
    checks: Vec<Check<A, P>>,
}

impl<A, P> Default for AuthorizerTree<A, P> {
    fn default() -> Self {
        Self {
            branches: HashMap::new(),
            checks: Vec::new(),
        }
    }
}

impl<A, P> Clone for AuthorizerTree<A, P> {
    fn clone(&self) -> Self {
        Self {
            branches: self.branches.clone(),
            checks: self.checks.clone(),
        }
    }
}

impl<A, P> AuthorizerTree<A, P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a child branch and configures it
    pub fn branch<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(AuthorizerTree<A, P>) -> AuthorizerTree<A, P>,
    {
        let name = name.into();
        let existing = self.branches.remove(&name).unwrap_or_default();
        self.branches.insert(name, f(existing));
        self
    }

    /// Adds a check to this node
    pub fn check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Scope, &A, &P) -> bool + Send + Sync + 'static,
    {
        self.checks.push(Arc::new(check));
        self
    }

    /// Adds a check at the node for `scope`, creating branches as needed
    pub fn at<S, F>(mut self, scope: S, check: F) -> ScopeResult<Self>
    where
        S: IntoScope,
        F: Fn(&Scope, &A, &P) -> bool + Send + Sync + 'static,
    {
        let scope = scope.into_scope()?;

        let mut node = &mut self;
        for segment in scope.segments() {
            node = node.branches.entry(segment.to_string()).or_default();
        }
        node.checks.push(Arc::new(check));

        Ok(self)
    }

    /// Runs the checks along the path of `scope`
    ///
    /// Every check on a visited node must pass. Walking stops with success at
    /// the first segment that has no branch.
    pub fn authorized(&self, scope: &Scope, auth: &A, params: &P) -> bool {
        if !self.checks.iter().all(|check| check(scope, auth, params)) {
            return false;
        }

        let Some(first) = scope.segments().first() else {
            return true;
        };

        match self.branches.get(&first.to_string()) {
            Some(branch) => branch.authorized(&scope.tail(), auth, params),
            None => true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty() && self.checks.is_empty()
    }
}

impl<A, P> fmt::Debug for AuthorizerTree<A, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizerTree")
            .field("branches", &self.branches)
            .field("checks", &self.checks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Owner {
        shop_ids: Vec<i64>,
    }

    fn scope(raw: &str) -> Scope {
        Scope::wrap(raw).unwrap()
    }

    fn tree() -> AuthorizerTree<Owner, i64> {
        AuthorizerTree::new().branch("btc", |btc| {
            btc.branch("account", |account| {
                account.branch("shops", |shops| {
                    shops.branch("mine", |mine| {
                        mine.check(|_, owner: &Owner, shop_id: &i64| owner.shop_ids.contains(shop_id))
                            .branch("public", |public| public.check(|_, _, _| false))
                    })
                })
            })
        })
    }

    #[test]
    fn test_checks_along_the_path() {
        let tree = tree();
        let owner = Owner {
            shop_ids: vec![1, 2, 3],
        };

        assert!(tree.authorized(&scope("btc"), &owner, &2));
        assert!(tree.authorized(&scope("btc.account"), &owner, &2));
        assert!(tree.authorized(&scope("btc.account.shops"), &owner, &2));
        assert!(tree.authorized(&scope("btc.account.shops.mine"), &owner, &2));
        assert!(tree.authorized(&scope("btc.account.shops.mine.show"), &owner, &2));
        assert!(!tree.authorized(&scope("btc.account.shops.mine"), &owner, &10));
        assert!(!tree.authorized(&scope("btc.account.shops.mine.show"), &owner, &10));
        assert!(!tree.authorized(&scope("btc.account.shops.mine.public"), &owner, &2));
    }

    #[test]
    fn test_at_creates_branches() {
        let tree: AuthorizerTree<Owner, i64> =
            AuthorizerTree::new().at("btc.account", |_, _, _| false).unwrap();
        let owner = Owner { shop_ids: vec![] };

        assert!(tree.authorized(&scope("btc"), &owner, &0));
        assert!(tree.authorized(&scope("btc.foo"), &owner, &0));
        assert!(!tree.authorized(&scope("btc.account"), &owner, &0));
        assert!(!tree.authorized(&scope("btc.account.shops"), &owner, &0));
    }

    #[test]
    fn test_checks_receive_remaining_scope() {
        let tree: AuthorizerTree<(), ()> = AuthorizerTree::new()
            .at("api", |rest: &Scope, _: &(), _: &()| rest.to_string() == "orders.read")
            .unwrap();

        assert!(tree.authorized(&scope("api.orders.read"), &(), &()));
        assert!(!tree.authorized(&scope("api.orders.write"), &(), &()));
    }

    #[test]
    fn test_at_rejects_invalid_scope() {
        let result: ScopeResult<AuthorizerTree<(), ()>> =
            AuthorizerTree::new().at("a..b", |_, _, _| true);
        assert!(result.is_err());
    }
}
