//! Hierarchical scope model
//!
//! Scopes are dotted permission paths with wildcards, value sets and
//! template markers. A granted scope covers every scope beneath it.
//!
//! # Examples
//!
//! ```
//! use gatehouse_authz::scope::{Scope, Scopes};
//!
//! let granted = Scopes::parse(["btc.me", "btc.account", "btc.account.shops.mine"]).unwrap();
//! let required = Scope::wrap("btc.account.update").unwrap();
//!
//! assert_eq!(granted.resolve(&required).unwrap().to_string(), "btc.account");
//! ```

mod aliases;
mod scopes;
mod segment;
mod tree;
mod types;

#[cfg(test)]
mod tests;

pub use aliases::Aliases;
pub use scopes::Scopes;
pub use segment::Segment;
pub use tree::{Matcher, Node, ScopeRecorder, ScopeTree};
pub use types::{IntoScope, Scope, ScopeError, ScopeResult, SEPARATOR};
