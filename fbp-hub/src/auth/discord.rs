// Discord OAuth2 / REST client: code exchange, token refresh and the
// current-user lookup.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{CredentialsConfig, DiscordConfig};

use super::session::DiscordUser;

#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("OAuth credentials not configured")]
    NotConfigured,

    #[error("Invalid state parameter")]
    InvalidState,

    #[error("Discord request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Discord returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid Discord URL: {message}")]
    InvalidUrl { message: String },
}

/// Token payload relayed to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
}

impl DiscordClient {
    pub fn new(
        api_base: impl Into<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Self {
        DiscordClient {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    pub fn from_config(discord: &DiscordConfig, credentials: &CredentialsConfig) -> Self {
        DiscordClient::new(
            discord.api_base.clone(),
            credentials.discord_client_id.clone(),
            credentials.discord_client_secret.clone(),
            credentials.redirect_uri.clone(),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn credentials(&self) -> Result<(&str, &str), DiscordError> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => Err(DiscordError::NotConfigured),
        }
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, DiscordError> {
        let url = format!("{}/oauth2/token", self.api_base);
        let resp = self.http.post(url).form(params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Discord token endpoint returned {}: {}", status, body);
            return Err(DiscordError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    /// Exchange an authorization code. `redirect_uri` overrides the
    /// configured one when the browser supplies it.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<TokenResponse, DiscordError> {
        let (client_id, client_secret) = self.credentials()?;
        let redirect = redirect_uri
            .or(self.redirect_uri.as_deref())
            .unwrap_or_default();
        debug!("Exchanging authorization code");
        self.token_request(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect),
        ])
        .await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, DiscordError> {
        let (client_id, client_secret) = self.credentials()?;
        debug!("Refreshing access token");
        self.token_request(&[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// `GET /users/@me` with the caller's bearer token.
    pub async fn current_user(&self, access_token: &str) -> Result<DiscordUser, DiscordError> {
        let url = format!("{}/users/@me", self.api_base);
        let resp = self.http.get(url).bearer_auth(access_token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DiscordError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = DiscordClient::new("https://discord.com/api/", None, None, None);
        assert_eq!(client.api_base(), "https://discord.com/api");
    }

    #[test]
    fn configured_requires_id_and_secret() {
        let base = "http://localhost";
        assert!(!DiscordClient::new(base, None, None, None).is_configured());
        assert!(!DiscordClient::new(base, Some("id".into()), Some(String::new()), None).is_configured());
        assert!(DiscordClient::new(base, Some("id".into()), Some("secret".into()), None).is_configured());
    }

    #[tokio::test]
    async fn exchange_without_credentials_fails_fast() {
        let client = DiscordClient::new("http://127.0.0.1:9", None, None, None);
        let err = client.exchange_code("abc", None).await.unwrap_err();
        assert!(matches!(err, DiscordError::NotConfigured));
        assert_eq!(err.to_string(), "OAuth credentials not configured");
    }
}
