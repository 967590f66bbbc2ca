//! User management API

use anyhow::{Context, Result};

use super::cell;
use super::client::AdminClient;
use crate::models::{NewUser, User};

pub async fn list_users_data(client: &AdminClient) -> Result<Vec<User>> {
    client
        .get::<Vec<User>>("/users")
        .await
        .context("Failed to list users")
}

/// List users (prints to stdout).
pub async fn list_users(client: &AdminClient, limit: usize) -> Result<()> {
    let users = list_users_data(client).await?;

    println!("\nUsers:");
    println!("{:-<78}", "");

    if users.is_empty() {
        println!("  (no users found)");
        return Ok(());
    }

    println!(
        "{:<26} {:<16} {:<24} {:<10}",
        "ID", "USERNAME", "FULL NAME", "ROLE"
    );
    for user in users.iter().take(limit) {
        println!(
            "{:<26} {:<16} {:<24} {:<10}",
            cell(&user.id, 26),
            cell(&user.username, 16),
            cell(user.full_name.as_deref().unwrap_or("-"), 24),
            user.role.as_deref().unwrap_or("-"),
        );
    }
    if users.len() > limit {
        println!("  ... {} more (use --limit)", users.len() - limit);
    }

    Ok(())
}

pub async fn show_user(client: &AdminClient, id: &str) -> Result<()> {
    let user: User = client
        .get(&format!("/users/{}", id))
        .await
        .with_context(|| format!("Failed to fetch user {}", id))?;

    println!("\nUser {}", user.id);
    println!("  Username:  {}", user.username);
    println!("  Full name: {}", user.full_name.as_deref().unwrap_or("-"));
    println!("  Email:     {}", user.email.as_deref().unwrap_or("-"));
    println!("  Phone:     {}", user.phone.as_deref().unwrap_or("-"));
    println!("  Role:      {}", user.role.as_deref().unwrap_or("-"));
    Ok(())
}

pub async fn create_user(client: &AdminClient, new_user: &NewUser) -> Result<()> {
    let user: User = client
        .post("/users", new_user)
        .await
        .context("Failed to create user")?;
    tracing::info!("Created user {} ({})", user.username, user.id);
    println!("User created: {}", user.id);
    Ok(())
}

pub async fn delete_user(client: &AdminClient, id: &str) -> Result<()> {
    client
        .delete(&format!("/users/{}", id))
        .await
        .with_context(|| format!("Failed to delete user {}", id))?;
    println!("User deleted: {}", id);
    Ok(())
}

pub async fn set_user_role(client: &AdminClient, id: &str, role: &str) -> Result<()> {
    let body = serde_json::json!({ "role": role });
    let user: User = client
        .put(&format!("/users/{}", id), &body)
        .await
        .with_context(|| format!("Failed to update role of user {}", id))?;
    println!(
        "Role of {} set to: {}",
        user.username,
        user.role.as_deref().unwrap_or(role)
    );
    Ok(())
}
