//! # Gatehouse Demo
//!
//! Declares a scope tree, an HS256 token store and a shop products
//! endpoint, then runs a handful of requests through it and prints the
//! responses.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG` - Log level (default: info)
//! - `GATEHOUSE_*` - Authentication settings, see `AuthSettings::from_env`

use std::sync::Arc;

use anyhow::Context;
use gatehouse_authz::{AuthConfig, AuthSettings, JwtSettings, ScopeTree};
use gatehouse_core::Request;
use gatehouse_pipeline::schema::{Field, Schema};
use gatehouse_pipeline::{Endpoint, Outcome, TracingInstrumenter};
use http::Method;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn settings() -> anyhow::Result<AuthSettings> {
    let mut settings = AuthSettings::from_env().context("reading GATEHOUSE_* settings")?;
    if settings.jwt.is_none() {
        settings.jwt = Some(JwtSettings {
            algorithm: Some("HS256".to_string()),
            secret: Some("gatehouse-demo-secret".to_string()),
            expiry_window_secs: 300,
            ..Default::default()
        });
    }
    Ok(settings)
}

fn list_products(outcome: Outcome) -> Outcome {
    let shop_id = outcome.query.get("shop_id").cloned().unwrap_or_default();
    let page = outcome.query.get("page").cloned().unwrap_or_default();
    outcome.proceed_with(|o| {
        o.object = Some(json!({
            "shop_id": shop_id,
            "page": page,
            "products": [{"sku": "tea-01", "name": "Green tea"}],
        }));
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Gatehouse demo v{}", gatehouse_pipeline::VERSION);

    let tree = ScopeTree::build("shop", |shop| {
        shop.child("admin");
        shop.any_matching("shop_id", r"\d+").with("products", |products| {
            products.child("read");
            products.child("write");
        });
    })?;

    let config = Arc::new(AuthConfig::from_settings(&settings()?)?);
    let required = tree.path("shop.shop_id.products.read")?.to_scope();

    let endpoint = Endpoint::builder("shop_products")
        .title("List shop products")
        .verb(Method::GET)
        .path("/shops/:shop_id/products")
        .scope(&required)
        .auth(Arc::clone(&config))
        .instrumenter(Arc::new(TracingInstrumenter))
        .action_pipeline(|p| {
            p.query_schema(
                Schema::new()
                    .field(Field::integer("shop_id").present())
                    .field(Field::integer("page").default(1)),
            )
            .step(list_products)
        })
        .build()?;

    info!(endpoint = ?endpoint, "declared endpoint");

    let reader = config
        .token_store()
        .set(json!({"scopes": ["shop.1.products"]}).as_object().cloned().unwrap_or_default())?;
    let writer_only = config
        .token_store()
        .set(json!({"scopes": "shop.1.products.write"}).as_object().cloned().unwrap_or_default())?;

    let requests = [
        ("anonymous", None, "/shops/1/products"),
        ("reader", Some(&reader), "/shops/1/products?page=2"),
        ("reader, bad page", Some(&reader), "/shops/1/products?page=two"),
        ("reader, other shop", Some(&reader), "/shops/2/products"),
        ("writer only", Some(&writer_only), "/shops/1/products"),
    ];

    for (label, token, uri) in requests {
        let shop_id = uri.split('/').nth(2).unwrap_or_default();
        let mut request = Request::get(uri)?.with_path_param("shop_id", shop_id);
        if let Some(token) = token {
            request = request.with_header("authorization", &format!("Bearer {}", token))?;
        }

        let response = endpoint.handle(request);
        let body = String::from_utf8_lossy(response.body());
        println!("{:<18} {} {}", label, response.status(), body);
    }

    Ok(())
}
