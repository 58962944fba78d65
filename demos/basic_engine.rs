//! Basic engine example
//!
//! Feeds a handful of messages through the engine with a gateway that
//! prints each merged payload instead of sending it.
//!
//! Run with: `cargo run --example basic_engine`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use smsmerge::{DeliveryAck, DeliveryError, DeliveryGateway, Engine, EngineConfig, Message};

struct PrintGateway;

#[async_trait]
impl DeliveryGateway for PrintGateway {
    async fn send(
        &self,
        originator: &str,
        recipients: &[String],
        body: &str,
    ) -> Result<DeliveryAck, DeliveryError> {
        println!("\n--- {} -> {:?} ({} bytes) ---", originator, recipients, body.len());
        println!("{}", body);
        Ok(DeliveryAck::with_id("local", recipients.len()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== smsmerge Basic Example ===\n");

    let config = EngineConfig::with_drain_period(Duration::from_millis(200)).requeue_remainder(true);
    let engine = Engine::start(config, Arc::new(PrintGateway))?;
    let handle = engine.handle();

    // Short messages to one recipient merge into a single payload
    for body in ["Your code is 4821", "It expires in 5 minutes", "Do not share it"] {
        handle
            .enqueue(Message::new("acme", "31600000001", body)?)
            .await?;
    }

    // Two long messages cannot share a payload
    let long = "L".repeat(120);
    for _ in 0..2 {
        handle
            .enqueue(Message::new("acme", "31600000002", long.as_str())?)
            .await?;
    }

    // Same recipient, different originator: a separate group
    handle
        .enqueue(Message::new("globex", "31600000001", "Package shipped")?)
        .await?;

    println!(
        "Pending: {} messages in {} groups",
        handle.pending_messages(),
        handle.pending_groups()
    );

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let snapshot = engine.shutdown().await?;
    println!("\n{}", snapshot.report());

    Ok(())
}
