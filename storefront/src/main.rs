//! Storefront demo binary
//!
//! Runs a scripted shopping session against the engine with live promotion
//! timers and prints the resulting order summary as JSON.

use anyhow::Context;
use std::time::Duration;
use storefront::catalog::ids;
use storefront::{
    ProductId, StorefrontAction, StorefrontConfig, StorefrontEnvironment, StorefrontReducer,
    StorefrontState, StorefrontStore,
};
use storefront_core::environment::Clock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=debug,storefront_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StorefrontConfig::from_env();
    tracing::info!(?config.promotions, "Loaded configuration");

    let env = StorefrontEnvironment::production();
    let state = StorefrontState::new(config).as_of(env.clock.now());
    let store: StorefrontStore = StorefrontStore::new(state, StorefrontReducer::new(), env);

    println!("=== Storefront Cart Engine ===\n");

    let session = [
        StorefrontAction::StartPromotions,
        StorefrontAction::SelectProduct {
            product_id: ProductId::new(ids::KEYBOARD),
        },
        StorefrontAction::AddItem {
            product_id: ProductId::new(ids::KEYBOARD),
            quantity: 10,
        },
        StorefrontAction::AddItem {
            product_id: ProductId::new(ids::MOUSE),
            quantity: 1,
        },
        StorefrontAction::AddItem {
            product_id: ProductId::new(ids::MONITOR_ARM),
            quantity: 1,
        },
        StorefrontAction::AddItem {
            product_id: ProductId::new(ids::SPEAKER),
            quantity: 12,
        },
        StorefrontAction::ChangeQuantity {
            product_id: ProductId::new(ids::SPEAKER),
            delta: -4,
        },
    ];

    for action in session {
        println!(">>> {action:?}");
        store.send(action).await.context("sending action")?;
    }

    let (summary, notices) = store
        .state(|s| (s.order_summary().clone(), s.notices().to_vec()))
        .await;

    for notice in &notices {
        println!("! {notice}");
    }
    println!("\n{}", summary.points.display());
    println!(
        "{}\n",
        serde_json::to_string_pretty(&summary).context("serializing order summary")?
    );

    store.send(StorefrontAction::StopPromotions).await?;
    store
        .shutdown(Duration::from_secs(5))
        .await
        .context("shutting down store")?;

    println!("=== Session complete ===");
    Ok(())
}
