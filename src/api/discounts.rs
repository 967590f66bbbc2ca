//! Discount code API

use anyhow::{Context, Result};
use chrono::Local;

use super::client::AdminClient;
use crate::models::{Discount, NewDiscount};

pub async fn list_discounts(client: &AdminClient) -> Result<()> {
    let discounts: Vec<Discount> = client
        .get("/discounts")
        .await
        .context("Failed to list discounts")?;
    let today = Local::now().date_naive();

    println!("\nDiscount codes:");
    println!("{:-<60}", "");
    if discounts.is_empty() {
        println!("  (no discount codes)");
        return Ok(());
    }

    for d in &discounts {
        let window = match (d.valid_from, d.valid_until) {
            (Some(from), Some(until)) => format!("{} .. {}", from, until),
            (Some(from), None) => format!("from {}", from),
            (None, Some(until)) => format!("until {}", until),
            (None, None) => "always".to_string(),
        };
        let state = if d.is_valid_on(today) {
            "active"
        } else {
            "inactive"
        };
        println!(
            "  {:<14} {:>5.1}%  {:<26} {:<8} [{}]",
            d.code, d.percent, window, state, d.id
        );
    }
    Ok(())
}

pub async fn create_discount(client: &AdminClient, discount: &NewDiscount) -> Result<()> {
    anyhow::ensure!(
        discount.percent > 0.0 && discount.percent <= 100.0,
        "Discount percent must be in (0, 100], got {}",
        discount.percent
    );
    if let (Some(from), Some(until)) = (discount.valid_from, discount.valid_until) {
        anyhow::ensure!(from <= until, "Validity window ends before it starts");
    }

    let created: Discount = client
        .post("/discounts", discount)
        .await
        .context("Failed to create discount")?;
    println!("Discount created: {} ({})", created.code, created.id);
    Ok(())
}

pub async fn delete_discount(client: &AdminClient, id: &str) -> Result<()> {
    client
        .delete(&format!("/discounts/{}", id))
        .await
        .with_context(|| format!("Failed to delete discount {}", id))?;
    println!("Discount deleted: {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_discount_rejects_bad_input_locally() {
        // Unroutable base URL: validation must fail before any request.
        let client = AdminClient::new("http://127.0.0.1:9", Some("tok".into()));

        let too_big = NewDiscount {
            code: "X".into(),
            percent: 150.0,
            valid_from: None,
            valid_until: None,
        };
        let err = create_discount(&client, &too_big).await.unwrap_err();
        assert!(err.to_string().contains("percent"));

        let inverted = NewDiscount {
            code: "X".into(),
            percent: 10.0,
            valid_from: "2026-12-01".parse().ok(),
            valid_until: "2026-11-01".parse().ok(),
        };
        let err = create_discount(&client, &inverted).await.unwrap_err();
        assert!(err.to_string().contains("window"));
    }
}
