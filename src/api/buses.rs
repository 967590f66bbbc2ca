//! Fleet API

use anyhow::{Context, Result};

use super::client::AdminClient;
use crate::models::{Bus, NewBus};

pub async fn list_buses(client: &AdminClient) -> Result<()> {
    let buses: Vec<Bus> = client.get("/buses").await.context("Failed to list buses")?;

    println!("\nBuses:");
    println!("{:-<60}", "");
    if buses.is_empty() {
        println!("  (no buses registered)");
    }
    for bus in &buses {
        let seats = bus
            .seat_count
            .map(|n| format!("{} seats", n))
            .unwrap_or_else(|| "? seats".to_string());
        println!(
            "  {:<12} {:<10} {:<16} [{}]",
            bus.license_plate,
            seats,
            bus.kind.as_deref().unwrap_or("-"),
            bus.id
        );
    }
    Ok(())
}

pub async fn create_bus(client: &AdminClient, bus: &NewBus) -> Result<()> {
    anyhow::ensure!(bus.seat_count > 0, "A bus needs at least one seat");
    let created: Bus = client
        .post("/buses", bus)
        .await
        .context("Failed to register bus")?;
    println!("Bus registered: {} ({})", created.license_plate, created.id);
    Ok(())
}

pub async fn delete_bus(client: &AdminClient, id: &str) -> Result<()> {
    client
        .delete(&format!("/buses/{}", id))
        .await
        .with_context(|| format!("Failed to delete bus {}", id))?;
    println!("Bus deleted: {}", id);
    Ok(())
}
