//! Example consumer: declares a small shop model and serves it over HTTP.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Set `ENGINE_DECLARATIONS=example_consumer/entities.json` to load the JSON variant instead,
//! and `DATABASE_URL` to persist in Postgres rather than memory.

use entity_engine::config::EnumDisplay;
use entity_engine::settings::init_tracing;
use entity_engine::{
    app, resolve, AppError, AppState, EntityDeclaration, Operation, Policy, PropertyDeclaration, PropertyType,
    Settings,
};
use serde_json::Value;
use tokio::net::TcpListener;

fn shop_declarations() -> Vec<EntityDeclaration> {
    vec![
        EntityDeclaration::new("Customer")
            .seed_count(20)
            .property(PropertyDeclaration::text("name").required())
            .property(PropertyDeclaration::new("email", PropertyType::Email))
            .property(PropertyDeclaration::new("password", PropertyType::Password).hidden_in_list())
            .property(PropertyDeclaration::enumeration("tier", ["standard", "gold"]).display(EnumDisplay::Badge))
            .policy(Operation::Delete, Policy::Role("admin".into())),
        EntityDeclaration::new("Product")
            .seed_count(30)
            .property(PropertyDeclaration::text("name").required())
            .property(PropertyDeclaration::new("price", PropertyType::Currency).required())
            .property(PropertyDeclaration::new("description", PropertyType::TextArea).hidden_in_list())
            .property(PropertyDeclaration::new("image", PropertyType::Image)),
        EntityDeclaration::new("Order")
            .prop_identifier("reference")
            .property(
                PropertyDeclaration::text("reference").generator(|i, _| Ok(Value::String(format!("ORD-{:05}", i + 1)))),
            )
            .property(PropertyDeclaration::relation("customer", "Customer").eager(true).required())
            .property(PropertyDeclaration::relation("product", "Product").required())
            .property(PropertyDeclaration::new("quantity", PropertyType::Number).generator(|i, _| Ok(Value::from(i % 5 + 1))))
            .property(PropertyDeclaration::new("total", PropertyType::Currency))
            .property(PropertyDeclaration::enumeration("status", ["pending", "shipped", "delivered"]))
            .policy(Operation::Create, Policy::Authenticated)
            // total = price x quantity, from the related product
            .pre_insert(|row, related| {
                let price = related
                    .get("product")
                    .and_then(|p| p.get("price"))
                    .and_then(|v| v.as_str().and_then(|s| s.parse::<f64>().ok()).or_else(|| v.as_f64()));
                let quantity = row.get("quantity").and_then(Value::as_f64).unwrap_or(1.0);
                match price {
                    Some(price) => {
                        row.insert("total".into(), Value::String(format!("{:.2}", price * quantity)));
                        Ok(())
                    }
                    None if row.get("product_id").map(Value::is_null).unwrap_or(true) => Ok(()),
                    None => Err(AppError::Validation("product has no price".into())),
                }
            }),
        EntityDeclaration::new("PendingInvitation")
            .seed_count(5)
            .property(PropertyDeclaration::new("email", PropertyType::Email).required())
            .property(PropertyDeclaration::enumeration("role", ["admin", "staff"]))
            .policy(Operation::Read, Policy::Authenticated)
            .policy(Operation::Create, Policy::Role("admin".into()))
            .policy(Operation::Update, Policy::Role("admin".into()))
            .policy(
                Operation::Delete,
                Policy::custom(|p| p.map(|p| p.role.as_deref() == Some("admin") || p.id == "owner").unwrap_or(false)),
            ),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_tracing("entity_engine=info,example_consumer=info");
    let declarations = settings.load_declarations()?.unwrap_or_else(shop_declarations);
    let model = resolve(&declarations)?;
    tracing::info!(entities = model.len(), "model resolved");

    let store = settings.open_store(&model).await?;
    let state = AppState::new(model, store);
    if settings.seed_on_start {
        let report = state.seeder().seed_all().await?;
        for seeded in &report.entities {
            tracing::info!(entity = %seeded.slug, rows = seeded.rows, "seeded");
        }
    }

    let listener = TcpListener::bind(&settings.bind).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
