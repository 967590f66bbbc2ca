//! Roles, permissions and role-permission mappings

use anyhow::{Context, Result};
use serde_json::json;

use super::client::AdminClient;
use super::query_string;
use crate::models::{Permission, Role, RolePermission};

pub async fn list_roles(client: &AdminClient) -> Result<()> {
    let roles: Vec<Role> = client.get("/roles").await.context("Failed to list roles")?;

    println!("\nRoles:");
    println!("{:-<60}", "");
    if roles.is_empty() {
        println!("  (no roles found)");
    }
    for role in &roles {
        println!("{}", role.name);
        println!("  ID: {}", role.id);
        if let Some(ref desc) = role.description {
            println!("  {}", desc);
        }
    }
    Ok(())
}

pub async fn create_role(client: &AdminClient, name: &str, description: Option<&str>) -> Result<()> {
    let body = json!({ "name": name, "description": description });
    let role: Role = client
        .post("/roles", &body)
        .await
        .context("Failed to create role")?;
    println!("Role created: {} ({})", role.name, role.id);
    Ok(())
}

pub async fn delete_role(client: &AdminClient, id: &str) -> Result<()> {
    client
        .delete(&format!("/roles/{}", id))
        .await
        .with_context(|| format!("Failed to delete role {}", id))?;
    println!("Role deleted: {}", id);
    Ok(())
}

pub async fn list_permissions(client: &AdminClient) -> Result<()> {
    let perms: Vec<Permission> = client
        .get("/permissions")
        .await
        .context("Failed to list permissions")?;

    println!("\nPermissions:");
    println!("{:-<60}", "");
    for perm in &perms {
        println!(
            "  {:<26} {:<24} {}",
            perm.id,
            perm.name,
            perm.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

/// Permission ids granted to a role.
pub async fn role_permission_ids(client: &AdminClient, role_id: &str) -> Result<Vec<String>> {
    let path = format!(
        "/role-permissions{}",
        query_string(&[("roleId", Some(role_id.to_string()))])
    );
    let rows: Vec<RolePermission> = client
        .get(&path)
        .await
        .with_context(|| format!("Failed to list permissions of role {}", role_id))?;
    Ok(rows
        .into_iter()
        .filter(|r| r.role_id == role_id)
        .map(|r| r.permission_id)
        .collect())
}

pub async fn list_role_permissions(client: &AdminClient, role_id: &str) -> Result<()> {
    let ids = role_permission_ids(client, role_id).await?;
    println!("\nPermissions granted to {}:", role_id);
    if ids.is_empty() {
        println!("  (none)");
    }
    for id in ids {
        println!("  {}", id);
    }
    Ok(())
}

pub async fn grant_permission(client: &AdminClient, role_id: &str, permission_id: &str) -> Result<()> {
    let body = RolePermission {
        role_id: role_id.to_string(),
        permission_id: permission_id.to_string(),
    };
    client
        .post::<_, serde_json::Value>("/role-permissions", &body)
        .await
        .context("Failed to grant permission")?;
    println!("Granted {} to {}", permission_id, role_id);
    Ok(())
}

pub async fn revoke_permission(client: &AdminClient, role_id: &str, permission_id: &str) -> Result<()> {
    client
        .delete(&format!("/role-permissions/{}/{}", role_id, permission_id))
        .await
        .context("Failed to revoke permission")?;
    println!("Revoked {} from {}", permission_id, role_id);
    Ok(())
}
