/// Test suite for the scope module
///
/// Tests cover:
/// - Covering rules between single scopes
/// - Wildcards and value sets
/// - Template expansion
/// - Scopes ordering and resolution
/// - Aliases over scope trees
/// - Scope tree navigation
/// - Ordering laws (proptest)

use super::*;
use proptest::prelude::*;
use serde_json::json;
use std::cmp::Ordering;
use std::sync::Arc;
use std::thread;

fn scope(raw: &str) -> Scope {
    Scope::wrap(raw).unwrap()
}

fn can(granted: &str, required: &str) -> bool {
    scope(granted).can(&scope(required))
}

fn scopes(list: &[&str]) -> Scopes {
    Scopes::parse(list.iter().copied()).unwrap()
}

// ============================================================================
// Covering Tests
// ============================================================================

#[test]
fn test_prefix_covers_descendants() {
    let more_specific = "btc.account.shops.mine.update";
    let less_specific = "btc.account.shops.mine";
    let different = "btc.foo.shops.mine";

    assert!(!can(more_specific, less_specific));
    assert!(can(less_specific, more_specific));
    assert!(can(less_specific, less_specific));

    assert!(!can(more_specific, different));
    assert!(!can(less_specific, different));
    assert!(!can(different, less_specific));
    assert!(!can(different, more_specific));
    assert!(!can("all.root", "all.mobiles.root"));
}

#[test]
fn test_wildcards() {
    assert!(can("a.*.c", "a.b.c"));
    assert!(!can("a.*.c", "a.b.z"));
    assert!(can("a.*.c", "a.z.c.e"));
    assert!(can("a.*.c", "a.z.*"));
    assert!(can("a.*.c", "a.z.*.x"));
    assert!(!can("a.*.c.*", "a.z.c"));
    assert!(can("a.*.c.*", "a.b.c.d"));
    assert!(can("a.*.c.*", "a.b.c.*"));
    assert!(can("a.*.c.*", "a.*.c.*"));
}

#[test]
fn test_value_sets() {
    assert!(can("accounts:1,2,3", "accounts:2"));
    assert!(can("accounts:2", "accounts:1,2,3"));
    assert!(!can("accounts:1,2,3", "accounts:4"));
    assert!(!can("accounts:1,2,3", "accounts"));
    assert!(can("api.(1,2).read", "api.2.read"));
    assert!(!can("api.(1,2).read", "api.3.read"));
}

#[test]
fn test_compare_ordering() {
    let token = scope("api.accounts:111.shops:222");
    let product = scope("api.accounts:111.shops:222.products:333");

    assert_eq!(token.compare(&product), Ordering::Greater);
    assert_eq!(token.compare(&token), Ordering::Equal);
    assert_eq!(product.compare(&token), Ordering::Less);
}

// ============================================================================
// Expansion Tests
// ============================================================================

#[test]
fn test_expand_then_compare() {
    let endpoint = scope("api.accounts:<account_id>.shops:<shop_id>.contacts:*.read");
    let token = scope("api.accounts:<own_account>.shops:<own_shops>.contacts");

    let endpoint = endpoint
        .expand(json!({"account_id": 111, "shop_id": 222}).as_object().unwrap())
        .unwrap();
    let token = token
        .expand(json!({"own_account": 111, "own_shops": [222, 333]}).as_object().unwrap())
        .unwrap();

    assert_eq!(endpoint.to_string(), "api.accounts:111.shops:222.contacts:*.read");
    assert_eq!(token.to_string(), "api.accounts:111.shops:222,333.contacts");
    assert!(token.can(&endpoint));
    assert_ne!(token, endpoint);
    assert_eq!(token.compare(&endpoint), Ordering::Greater);
}

#[test]
fn test_expand_does_not_touch_receiver() {
    let template = scope("a.<id>");
    let _ = template.expand(json!({"id": 1}).as_object().unwrap()).unwrap();
    assert_eq!(template.to_string(), "a.<id>");
}

// ============================================================================
// Scopes Collection Tests
// ============================================================================

#[test]
fn test_resolve_most_specific() {
    let granted = scopes(&["btc.me", "btc.account.shops.mine", "btc.account", "btc.shops.list"]);

    assert!(granted.resolve(&scope("btc")).is_none());
    assert_eq!(granted.resolve(&scope("btc.me")).unwrap().to_string(), "btc.me");
    assert_eq!(granted.resolve(&scope("btc.account")).unwrap().to_string(), "btc.account");
    assert_eq!(
        granted.resolve(&scope("btc.account.update")).unwrap().to_string(),
        "btc.account"
    );
    assert_eq!(
        granted.resolve(&scope("btc.account.shops.mine")).unwrap().to_string(),
        "btc.account.shops.mine"
    );
    assert_eq!(
        granted.resolve(&scope("btc.account.shops.mine.list.foo")).unwrap().to_string(),
        "btc.account.shops.mine"
    );
    assert!(granted.resolve(&scope("btc.shops.update")).is_none());
    assert_eq!(
        granted.resolve(&scope("btc.shops.list.show.foo")).unwrap().to_string(),
        "btc.shops.list"
    );
}

#[test]
fn test_resolve_tie_break_is_declaration_order() {
    // Both members cover the candidate and are equally specific
    let first = scopes(&["api.(1,2)", "api.(2,3)"]);
    let second = scopes(&["api.(2,3)", "api.(1,2)"]);
    let candidate = scope("api.2.read");

    assert_eq!(first.resolve(&candidate).unwrap().to_string(), "api.(1,2)");
    assert_eq!(second.resolve(&candidate).unwrap().to_string(), "api.(2,3)");
}

#[test]
fn test_scopes_can() {
    let user = scopes(&["btc.account", "btc.account.assets.mine.update"]);
    let required = scopes(&["btc.account.shops", "btc.account.users"]);

    assert!(user.can(&required));
    assert!(!required.can(&user));
    assert!(user.can_scope(&scope("btc.account.assets.mine.create")));

    assert!(scopes(&["admin"]).can(&scopes(&["btc.me", "admin"])));
}

#[test]
fn test_scopes_covers() {
    assert!(scopes(&["api"]).covers(&scopes(&["api.me"])));
    assert!(scopes(&["foo", "api"]).covers(&scopes(&["api.me"])));
    assert!(!scopes(&["api.users"]).covers(&scopes(&["api", "api.me", "api.users.create"])));
}

#[test]
fn test_scopes_shared_across_threads() {
    let granted = Arc::new(scopes(&["api.products", "api.orders.read"]));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let granted = Arc::clone(&granted);
            thread::spawn(move || {
                let required = scope(&format!("api.products.{}", i));
                granted.can_scope(&required)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

// ============================================================================
// Aliases Tests
// ============================================================================

#[test]
fn test_aliases_with_tree_nodes() {
    let tree = ScopeTree::build("api", |api| {
        api.child("admin");
        api.child("me");
        api.with("products", |products| {
            products.child("read");
            products.child("write");
        });
    })
    .unwrap();

    let admin = tree.path("api.admin").unwrap();
    let me = tree.path("api.me").unwrap();
    let products = tree.path("api.products").unwrap();

    let aliases = Aliases::new()
        .with_alias(&admin, [&me, &products])
        .with_alias("guest", [&me]);

    let mut mapped = aliases.map(["api.admin"]).unwrap().to_strings();
    mapped.sort();
    assert_eq!(mapped, vec!["api.me", "api.products"]);
    assert_eq!(aliases.map(["guest"]).unwrap().to_strings(), vec!["api.me"]);
    assert_eq!(aliases.map(["api.me"]).unwrap().to_strings(), vec!["api.me"]);
}

#[test]
fn test_aliases_map_matches_set() {
    let aliases = Aliases::new().with_alias("admin", ["x", "y"]);
    let mut mapped = aliases.map(["admin", "z"]).unwrap().to_strings();
    mapped.sort();
    assert_eq!(mapped, vec!["x", "y", "z"]);
}

// ============================================================================
// Scope Tree Tests
// ============================================================================

fn bootic() -> ScopeTree {
    ScopeTree::build("bootic", |bootic| {
        bootic.path("api.products.own.read");
        bootic.path("api.products.all.read");
        bootic.path("api.orders.own.read");
    })
    .unwrap()
}

#[test]
fn test_tree_navigation() {
    let tree = bootic();
    let root = tree.root();

    assert_eq!(
        root.path("api.products.own.read").unwrap().to_string(),
        "bootic.api.products.own.read"
    );
    assert_eq!(root.at("api").unwrap().at("products").unwrap().to_string(), "bootic.api.products");
    assert_eq!(
        tree.path("bootic.api.products.*.read").unwrap().to_string(),
        "bootic.api.products.*.read"
    );

    let scope = tree.path("bootic.api.products.*.read").unwrap().to_scope();
    assert_eq!(scope.to_string(), "bootic.api.products.*.read");
    assert!(scope.can(&Scope::wrap("bootic.api.products.own.read").unwrap()));
}

#[test]
fn test_tree_rejects_undeclared_segments() {
    let tree = bootic();

    assert!(matches!(
        tree.path("bootic.foo.products"),
        Err(ScopeError::InvalidScopeHierarchy(_))
    ));
    assert!(matches!(
        tree.path("bootic.api.products.*.api"),
        Err(ScopeError::InvalidScopeHierarchy(_))
    ));
    assert!(matches!(
        tree.path("other.api"),
        Err(ScopeError::InvalidScopeHierarchy(_))
    ));
}

#[test]
fn test_tree_wildcard_is_intersection() {
    let tree = ScopeTree::build("api", |api| {
        api.with("products", |p| {
            p.child("read");
            p.child("write");
        });
        api.with("orders", |o| {
            o.child("read");
        });
    })
    .unwrap();

    let any = tree.root().wildcard();
    assert_eq!(any.children(), vec!["read"]);
    assert!(any.at("read").is_ok());
    assert!(matches!(any.at("write"), Err(ScopeError::InvalidScopeHierarchy(_))));
}

#[test]
fn test_tree_wildcard_intersects_recursively() {
    let tree = ScopeTree::build("api", |api| {
        api.path("products.own.read");
        api.path("products.own.write");
        api.path("orders.own.read");
    })
    .unwrap();

    let node = tree.path("api.*.own").unwrap();
    assert!(node.has_child("read"));
    assert!(!node.has_child("write"));
}

#[test]
fn test_tree_any_positions() {
    let tree = ScopeTree::build("api", |api| {
        api.child("shops").any_matching("shop_id", r"\d+").with("products", |p| {
            p.child("read");
        });
        api.child("regions").any_of("region", ["eu", "us"]);
        api.child("tags").any("tag");
    })
    .unwrap();

    let shops = tree.path("api.shops").unwrap();

    let template = shops.at("shop_id").unwrap();
    assert_eq!(template.to_string(), "api.shops.<shop_id>");
    let expanded = template
        .at("products")
        .unwrap()
        .to_scope()
        .expand(json!({"shop_id": 12}).as_object().unwrap())
        .unwrap();
    assert_eq!(expanded.to_string(), "api.shops.12.products");

    let concrete = shops.value("shop_id", "12").unwrap();
    assert_eq!(concrete.at("products").unwrap().to_string(), "api.shops.12.products");

    assert!(matches!(
        shops.value("shop_id", "abc"),
        Err(ScopeError::InvalidScopeHierarchy(_))
    ));
    assert!(matches!(
        tree.path("api.regions").unwrap().value("region", "asia"),
        Err(ScopeError::InvalidScopeHierarchy(_))
    ));
    assert!(tree.path("api.regions").unwrap().value("region", "eu").is_ok());
    assert!(tree.path("api.tags").unwrap().value("tag", "anything").is_ok());
    assert!(matches!(
        tree.path("api").unwrap().value("shops", "12"),
        Err(ScopeError::InvalidScopeHierarchy(_))
    ));
}

#[test]
fn test_tree_wildcard_merges_matchers() {
    let tree = ScopeTree::build("api", |api| {
        api.child("a").any_matching("id", r"\d+");
        api.child("b").any_of("id", ["1", "2", "x"]);
    })
    .unwrap();

    let any = tree.root().wildcard();
    assert!(any.value("id", "2").is_ok());
    assert!(any.value("id", "x").is_err());
    assert!(any.value("id", "3").is_err());
}

#[test]
fn test_tree_build_validation() {
    assert!(matches!(
        ScopeTree::build("api", |api| {
            api.child("a.b");
        }),
        Err(ScopeError::InvalidArgument(_))
    ));
    assert!(matches!(
        ScopeTree::build("api", |api| {
            api.child("*");
        }),
        Err(ScopeError::InvalidArgument(_))
    ));
    assert!(matches!(
        ScopeTree::build("api", |api| {
            api.any_matching("id", "(");
        }),
        Err(ScopeError::InvalidArgument(_))
    ));
}

#[test]
fn test_tree_node_into_scope() {
    let tree = bootic();
    let node = tree.path("bootic.api.orders").unwrap();

    assert_eq!(Scope::wrap(&node).unwrap(), scope("bootic.api.orders"));
    assert_eq!(Scope::wrap(node).unwrap(), scope("bootic.api.orders"));
}

// ============================================================================
// Property-Based Tests (proptest)
// ============================================================================

fn segment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-d]{1,2}",
        1 => Just("*".to_string()),
        1 => prop::collection::vec("[a-d]", 1..3).prop_map(|v| format!("({})", v.join(","))),
    ]
}

fn scope_strategy() -> impl Strategy<Value = Scope> {
    prop::collection::vec(segment_strategy(), 1..5)
        .prop_map(|parts| Scope::from_parts(parts).unwrap())
}

proptest! {
    #[test]
    fn test_scope_covers_itself(a in scope_strategy()) {
        prop_assert!(a.can(&a));
        prop_assert_eq!(a.compare(&a), Ordering::Equal);
    }

    #[test]
    fn test_longer_never_covers_shorter(a in scope_strategy(), b in scope_strategy()) {
        if a.depth() > b.depth() {
            prop_assert!(!a.can(&b));
        }
    }

    #[test]
    fn test_parent_covers_child(a in scope_strategy(), extra in "[a-d]{1,2}") {
        let child = a.join(Segment::parse(&extra).unwrap());
        prop_assert!(a.can(&child));
        prop_assert_eq!(a.compare(&child), Ordering::Greater);
    }

    #[test]
    fn test_display_round_trips(a in scope_strategy()) {
        prop_assert_eq!(Scope::wrap(a.to_string()).unwrap(), a);
    }

    #[test]
    fn test_scopes_sorted_by_specificity(list in prop::collection::vec(scope_strategy(), 0..8)) {
        let sorted = Scopes::new(list.clone());
        prop_assert_eq!(sorted.len(), list.len());

        let members: Vec<&Scope> = sorted.iter().collect();
        for pair in members.windows(2) {
            let key = |s: &Scope| (std::cmp::Reverse(s.depth()), s.wildcard_count());
            prop_assert!(key(pair[0]) <= key(pair[1]));
        }
    }

    #[test]
    fn test_resolve_returns_covering_member(
        list in prop::collection::vec(scope_strategy(), 1..6),
        candidate in scope_strategy()
    ) {
        let granted = Scopes::new(list);
        match granted.resolve(&candidate) {
            Some(found) => {
                prop_assert!(found.can(&candidate));
                // nothing before it covers the candidate
                for member in granted.iter().take_while(|m| *m != found) {
                    prop_assert!(!member.can(&candidate));
                }
            }
            None => {
                prop_assert!(granted.iter().all(|m| !m.can(&candidate)));
            }
        }
    }
}
