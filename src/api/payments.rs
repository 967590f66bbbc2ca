//! Payment API, including the binary PDF receipt endpoint

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::client::AdminClient;
use crate::models::{format_price, format_timestamp, Payment};

pub async fn list_payments(client: &AdminClient, limit: usize) -> Result<()> {
    let payments: Vec<Payment> = client
        .get("/payments")
        .await
        .context("Failed to list payments")?;

    println!("\nPayments:");
    println!("{:-<80}", "");
    if payments.is_empty() {
        println!("  (no payments found)");
        return Ok(());
    }

    let mut total = 0.0;
    for p in payments.iter().take(limit) {
        total += p.amount;
        println!(
            "  {:<26} {:>14} {:<10} {:<10} {}",
            p.id,
            format_price(p.amount),
            p.method.as_deref().unwrap_or("-"),
            p.status,
            p.paid_at.as_deref().map(format_timestamp).unwrap_or_default()
        );
    }
    println!("{:-<80}", "");
    println!(
        "  Shown: {} of {}, total {}",
        payments.len().min(limit),
        payments.len(),
        format_price(total)
    );
    Ok(())
}

/// Default file name for a downloaded receipt.
pub fn receipt_path(payment_id: &str, output: Option<&Path>) -> PathBuf {
    match output {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(format!("receipt-{}.pdf", payment_id)),
    }
}

/// Download a payment receipt PDF and write it to disk.
pub async fn download_receipt(
    client: &AdminClient,
    payment_id: &str,
    output: Option<&Path>,
) -> Result<PathBuf> {
    let bytes = client
        .get_bytes(&format!("/payments/{}/receipt", payment_id))
        .await
        .with_context(|| format!("Failed to download receipt for payment {}", payment_id))?;

    if !bytes.starts_with(b"%PDF") {
        tracing::warn!("Receipt for {} does not look like a PDF", payment_id);
    }

    let path = receipt_path(payment_id, output);
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Receipt saved to {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_download_receipt_writes_file() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/payments/p9/receipt");
                then.status(200)
                    .header("content-type", "application/pdf")
                    .body(b"%PDF-1.4 fake".to_vec());
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("r.pdf");
        let client = AdminClient::new(&server.base_url(), Some("tok".into()));
        let path = download_receipt(&client, "p9", Some(&out)).await.unwrap();

        assert_eq!(path, out);
        assert_eq!(std::fs::read(&out).unwrap(), b"%PDF-1.4 fake");
    }

    #[test]
    fn test_receipt_default_path() {
        assert_eq!(receipt_path("p1", None), PathBuf::from("receipt-p1.pdf"));
    }
}
