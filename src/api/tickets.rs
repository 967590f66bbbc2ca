//! Ticket API

use anyhow::{Context, Result};

use super::client::AdminClient;
use super::{cell, query_string};
use crate::models::{format_price, format_timestamp, Ticket};

pub async fn list_tickets_data(client: &AdminClient, status: Option<&str>) -> Result<Vec<Ticket>> {
    let path = format!(
        "/tickets{}",
        query_string(&[("status", status.map(String::from))])
    );
    let tickets: Vec<Ticket> = client.get(&path).await.context("Failed to list tickets")?;
    // Not every backend build honours the filter; apply it here as well.
    Ok(match status {
        Some(s) => tickets
            .into_iter()
            .filter(|t| t.status.eq_ignore_ascii_case(s))
            .collect(),
        None => tickets,
    })
}

pub async fn list_tickets(client: &AdminClient, status: Option<&str>, limit: usize) -> Result<()> {
    let tickets = list_tickets_data(client, status).await?;

    println!("\nTickets:");
    println!("{:-<86}", "");
    if tickets.is_empty() {
        println!("  (no tickets found)");
        return Ok(());
    }

    println!(
        "{:<26} {:<26} {:<6} {:>14} {:<10}",
        "ID", "TRIP", "SEAT", "PRICE", "STATUS"
    );
    for t in tickets.iter().take(limit) {
        println!(
            "{:<26} {:<26} {:<6} {:>14} {:<10}",
            cell(&t.id, 26),
            cell(t.trip_id.as_deref().unwrap_or("-"), 26),
            t.seat_number.as_deref().unwrap_or("-"),
            t.price.map(format_price).unwrap_or_else(|| "-".into()),
            t.status
        );
    }
    if tickets.len() > limit {
        println!("  ... {} more (use --limit)", tickets.len() - limit);
    }
    Ok(())
}

pub async fn show_ticket(client: &AdminClient, id: &str) -> Result<()> {
    let t: Ticket = client
        .get(&format!("/tickets/{}", id))
        .await
        .with_context(|| format!("Failed to fetch ticket {}", id))?;

    println!("\nTicket {}", t.id);
    println!("  Trip:    {}", t.trip_id.as_deref().unwrap_or("-"));
    println!("  User:    {}", t.user_id.as_deref().unwrap_or("-"));
    println!("  Seat:    {}", t.seat_number.as_deref().unwrap_or("-"));
    println!(
        "  Price:   {}",
        t.price.map(format_price).unwrap_or_else(|| "-".into())
    );
    println!("  Status:  {}", t.status);
    if let Some(ref created) = t.created_at {
        println!("  Booked:  {}", format_timestamp(created));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_status_filter_applied_client_side() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tickets").query_param("status", "paid");
                then.status(200).json_body(json!([
                    { "_id": "t1", "status": "paid", "busScheduleId": "s1" },
                    { "_id": "t2", "status": "booked" }
                ]));
            })
            .await;

        let client = AdminClient::new(&server.base_url(), Some("tok".into()));
        let tickets = list_tickets_data(&client, Some("paid")).await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].trip_id.as_deref(), Some("s1"));
    }
}
