//! Authenticated HTTP client for the admin REST API
//!
//! Wraps reqwest::Client with bearer token injection and response
//! classification. There is no token refresh: a rejected token surfaces as
//! `ApiError::SessionExpired` and the caller ends the session.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::{classify, ApiError};
use crate::auth::SessionStore;
use crate::config::Config;

/// Responses come either bare or wrapped as `{"data": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Payload<T> {
    fn into_inner(self) -> T {
        match self {
            Payload::Wrapped { data } => data,
            Payload::Bare(v) => v,
        }
    }
}

/// Client for the admin REST endpoints.
pub struct AdminClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl AdminClient {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Build a client from the stored session.
    pub fn from_config(config: &Config) -> Result<Self> {
        let session = config
            .session()
            .context("Not logged in. Run 'bus-admin login' first.")?;
        Ok(Self::new(&config.server.api_url, Some(session.token.clone())))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let resp = builder.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        check_response(resp, url).await
    }

    async fn decode<T: DeserializeOwned>(
        resp: reqwest::Response,
        url: &str,
    ) -> Result<T, ApiError> {
        resp.json::<Payload<T>>()
            .await
            .map(Payload::into_inner)
            .map_err(|source| ApiError::Decode {
                url: url.to_string(),
                source,
            })
    }

    /// GET and decode a JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);
        let resp = self.send(self.request(reqwest::Method::GET, &url), &url).await?;
        Self::decode(resp, &url).await
    }

    /// GET a binary body (e.g. a PDF receipt).
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let url = self.url(path);
        tracing::debug!("GET (binary) {}", url);
        let resp = self.send(self.request(reqwest::Method::GET, &url), &url).await?;
        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|source| ApiError::Decode { url, source })
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(reqwest::Method::POST, path, body).await
    }

    /// PUT a JSON body and decode the JSON response.
    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(reqwest::Method::PUT, path, body).await
    }

    /// PATCH a JSON body, ignoring whatever the backend answers with.
    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let url = self.url(path);
        tracing::debug!("PATCH {}", url);
        self.send(self.request(reqwest::Method::PATCH, &url).json(body), &url)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        tracing::debug!("DELETE {}", url);
        self.send(self.request(reqwest::Method::DELETE, &url), &url)
            .await?;
        Ok(())
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);
        let resp = self
            .send(self.request(method, &url).json(body), &url)
            .await?;
        Self::decode(resp, &url).await
    }
}

/// Check HTTP response status code and return a typed error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let err = classify(status.as_u16(), &body, url);
    tracing::debug!("{:#}", err);
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[tokio::test]
    async fn test_bearer_token_and_wrapped_payload() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/items")
                    .header("authorization", "Bearer tok");
                then.status(200).json_body(json!({ "data": [{ "id": "a" }] }));
            })
            .await;

        let client = AdminClient::new(&server.base_url(), Some("tok".into()));
        let items: Vec<Item> = client.get("/items").await.unwrap();
        assert_eq!(items, vec![Item { id: "a".into() }]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bare_payload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/items/a");
                then.status(200).json_body(json!({ "id": "a" }));
            })
            .await;

        let client = AdminClient::new(&format!("{}/", server.base_url()), None);
        let item: Item = client.get("/items/a").await.unwrap();
        assert_eq!(item.id, "a");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_session_expired() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/items/a");
                then.status(401).json_body(json!({ "message": "jwt expired" }));
            })
            .await;

        let client = AdminClient::new(&server.base_url(), Some("old".into()));
        let err = client.delete("/items/a").await.unwrap_err();
        assert!(matches!(err, ApiError::SessionExpired { .. }));
    }

    #[tokio::test]
    async fn test_patch_sends_json_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::PATCH)
                    .path("/things/1")
                    .json_body(json!({ "status": "on" }));
                then.status(204);
            })
            .await;

        let client = AdminClient::new(&server.base_url(), Some("tok".into()));
        client
            .patch("/things/1", &json!({ "status": "on" }))
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
