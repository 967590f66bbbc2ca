//! Username/password login against the admin backend, plus logout/status.

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use serde::{Deserialize, Serialize};

use super::claims;
use super::session::{Session, SessionStore};
use crate::api::AdminClient;
use crate::config::Config;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(alias = "token")]
    access_token: String,
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    #[serde(default, alias = "_id")]
    id: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

/// Build a session from the login response.
///
/// The role claim embedded in the token wins; the response's user record
/// only fills gaps. An opaque (non-JWT) token is accepted as-is.
fn session_from_response(resp: LoginResponse, username: &str) -> Session {
    let claims = match claims::decode(&resp.access_token) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!("Token claims unreadable: {:#}", e);
            claims::Claims::default()
        }
    };
    let user = resp.user;

    let role = claims
        .role
        .clone()
        .or_else(|| user.as_ref().and_then(|u| u.role.clone()));
    let user_id = claims
        .user_id()
        .or_else(|| user.as_ref().and_then(|u| u.id.clone()));
    let display_name = user
        .as_ref()
        .and_then(|u| u.full_name.clone().or_else(|| u.username.clone()))
        .or_else(|| claims.username.clone())
        .unwrap_or_else(|| username.to_string());

    Session {
        token: resp.access_token,
        role,
        display_name: Some(display_name),
        user_id,
        expires_at: claims.exp,
    }
}

/// Exchange credentials for a session and store it.
pub async fn login_with<S: SessionStore>(
    client: &AdminClient,
    store: &mut S,
    username: &str,
    password: &str,
) -> Result<Session> {
    let body = LoginRequest { username, password };
    let resp: LoginResponse = client
        .post("/auth/login", &body)
        .await
        .context("Login failed")?;

    let session = session_from_response(resp, username);
    store.replace(session.clone());
    Ok(session)
}

/// Interactive login: prompts for missing credentials on stdin.
pub async fn login(username: Option<String>, password: Option<String>) -> Result<()> {
    let mut config = Config::load()?;

    let username = match username {
        Some(u) => u,
        None => prompt("Username: ")?,
    };
    let password = match password {
        Some(p) => p,
        None => prompt_hidden("Password: ")?,
    };

    let client = AdminClient::new(&config.server.api_url, None);
    let session = login_with(&client, &mut config, &username, &password).await?;
    config.save()?;

    tracing::info!("Logged in as {}", username);
    println!(
        "Logged in as {} (role: {})",
        session.display_name.as_deref().unwrap_or(&username),
        session.role.as_deref().unwrap_or("none")
    );
    if session.role.is_none() {
        println!("Warning: the token carries no role claim; protected commands will refuse to run.");
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;

    print!("{}", label);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    let value = line.trim_end_matches(['\r', '\n']).to_string();
    anyhow::ensure!(!value.is_empty(), "{} must not be empty", label.trim_end_matches(": "));
    Ok(value)
}

/// Outcome of one key press while typing a hidden value.
#[derive(Debug, PartialEq, Eq)]
enum SecretStep {
    Continue,
    Done,
    Cancelled,
}

fn edit_secret(value: &mut String, key: KeyEvent) -> SecretStep {
    if key.kind != KeyEventKind::Press {
        return SecretStep::Continue;
    }
    match key.code {
        KeyCode::Enter => SecretStep::Done,
        KeyCode::Esc => SecretStep::Cancelled,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            SecretStep::Cancelled
        }
        KeyCode::Char(c) => {
            value.push(c);
            SecretStep::Continue
        }
        KeyCode::Backspace => {
            value.pop();
            SecretStep::Continue
        }
        _ => SecretStep::Continue,
    }
}

/// Prompt without echo. Piped stdin falls back to a plain line read.
fn prompt_hidden(label: &str) -> Result<String> {
    use std::io::{IsTerminal, Write};

    if !std::io::stdin().is_terminal() {
        return prompt(label);
    }
    print!("{}", label);
    std::io::stdout().flush().context("Failed to flush stdout")?;

    terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    let read = read_secret();
    let restored = terminal::disable_raw_mode().context("Failed to restore terminal mode");
    println!();

    let value = read?;
    restored?;
    anyhow::ensure!(!value.is_empty(), "{} must not be empty", label.trim_end_matches(": "));
    Ok(value)
}

fn read_secret() -> Result<String> {
    let mut value = String::new();
    loop {
        let Event::Key(key) = event::read().context("Failed to read from terminal")? else {
            continue;
        };
        match edit_secret(&mut value, key) {
            SecretStep::Continue => {}
            SecretStep::Done => return Ok(value),
            SecretStep::Cancelled => anyhow::bail!("Login cancelled"),
        }
    }
}

/// Clear the stored session.
pub async fn logout() -> Result<()> {
    let mut config = Config::load()?;
    config.invalidate();
    config.save()?;
    println!("Logged out.");
    Ok(())
}

/// Show the stored session.
pub async fn status() -> Result<()> {
    let config = Config::load()?;
    match config.session() {
        Some(session) => {
            println!("Logged in to {}", config.server.api_url);
            println!(
                "  Name: {}",
                session.display_name.as_deref().unwrap_or("(unknown)")
            );
            println!("  Role: {}", session.role.as_deref().unwrap_or("(none)"));
            if let Some(ref id) = session.user_id {
                println!("  User ID: {}", id);
            }
            match (session.expires_at, session.remaining_secs()) {
                (Some(_), Some(left)) => println!("  Token expires in {}m", left / 60),
                (Some(_), None) => println!("  Token has expired; run 'bus-admin login'"),
                (None, _) => {}
            }
        }
        None => println!("Not logged in. Run 'bus-admin login'."),
    }
    Ok(())
}

/// Fetch a user profile (`/auth/profile/:id`); defaults to the own id.
pub async fn profile(config: &Config, id: Option<&str>) -> Result<()> {
    let id = match id {
        Some(id) => id.to_string(),
        None => config
            .session()
            .and_then(|s| s.user_id.clone())
            .context("No user id stored for this session; pass one explicitly")?,
    };

    let client = AdminClient::from_config(config)?;
    let profile: serde_json::Value = client
        .get(&format!("/auth/profile/{}", id))
        .await
        .with_context(|| format!("Failed to fetch profile {}", id))?;

    println!("\nProfile {}", id);
    if let Some(obj) = profile.as_object() {
        for (key, value) in obj {
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            println!("  {}: {}", key, text);
        }
    } else {
        println!("  {}", profile);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use httpmock::prelude::*;
    use serde_json::json;

    fn jwt(payload: serde_json::Value) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.sig",
            URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }

    #[derive(Default)]
    struct MemoryStore {
        session: Option<Session>,
    }

    impl SessionStore for MemoryStore {
        fn session(&self) -> Option<&Session> {
            self.session.as_ref()
        }
        fn replace(&mut self, session: Session) {
            self.session = Some(session);
        }
        fn invalidate(&mut self) {
            self.session = None;
        }
    }

    #[tokio::test]
    async fn test_login_stores_role_from_token() {
        let token = jwt(json!({ "id": "u1", "role": "admin", "exp": 1_900_000_000u64 }));
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/auth/login")
                    .json_body(json!({ "username": "an", "password": "pw" }));
                then.status(200).json_body(json!({
                    "accessToken": token,
                    "user": { "_id": "u1", "username": "an", "fullName": "Trần An", "role": "staff" }
                }));
            })
            .await;

        let client = AdminClient::new(&server.base_url(), None);
        let mut store = MemoryStore::default();
        let session = login_with(&client, &mut store, "an", "pw").await.unwrap();

        assert_eq!(session.role.as_deref(), Some("admin"));
        assert_eq!(session.display_name.as_deref(), Some("Trần An"));
        assert_eq!(session.user_id.as_deref(), Some("u1"));
        assert_eq!(session.expires_at, Some(1_900_000_000));
        assert_eq!(store.session(), Some(&session));
    }

    #[test]
    fn test_opaque_token_falls_back_to_user_record() {
        let resp = LoginResponse {
            access_token: "opaque".into(),
            user: Some(LoginUser {
                id: Some("u2".into()),
                username: Some("binh".into()),
                full_name: None,
                role: Some("staff".into()),
            }),
        };
        let session = session_from_response(resp, "binh");
        assert_eq!(session.role.as_deref(), Some("staff"));
        assert_eq!(session.display_name.as_deref(), Some("binh"));
        assert_eq!(session.expires_at, None);
    }

    #[test]
    fn test_hidden_input_editing() {
        let press = |code| KeyEvent::new(code, KeyModifiers::NONE);
        let mut value = String::new();
        for c in "mậtk".chars() {
            assert_eq!(edit_secret(&mut value, press(KeyCode::Char(c))), SecretStep::Continue);
        }
        edit_secret(&mut value, press(KeyCode::Backspace));
        edit_secret(&mut value, press(KeyCode::Left));
        assert_eq!(value, "mật");
        assert_eq!(edit_secret(&mut value, press(KeyCode::Enter)), SecretStep::Done);

        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(edit_secret(&mut value, ctrl_c), SecretStep::Cancelled);
        assert_eq!(value, "mật");

        let mut release = press(KeyCode::Char('x'));
        release.kind = KeyEventKind::Release;
        assert_eq!(edit_secret(&mut value, release), SecretStep::Continue);
        assert_eq!(value, "mật");
    }

    #[tokio::test]
    async fn test_bad_credentials_leave_store_untouched() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/login");
                then.status(400)
                    .json_body(json!({ "message": "Sai tên đăng nhập hoặc mật khẩu" }));
            })
            .await;

        let client = AdminClient::new(&server.base_url(), None);
        let mut store = MemoryStore::default();
        let err = login_with(&client, &mut store, "an", "wrong")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Sai tên đăng nhập"));
        assert!(store.session().is_none());
    }
}
