// Signed-in session: the Discord user, tokens and expiry, plus the helpers
// for starting the OAuth flow.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{CredentialsConfig, DiscordConfig};
use crate::league::team::{Team, TeamDirectory};

use super::discord::{DiscordError, TokenResponse};

const CDN_BASE: &str = "https://cdn.discordapp.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default = "default_discriminator")]
    pub discriminator: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

fn default_discriminator() -> String {
    "0".to_string()
}

impl DiscordUser {
    /// Custom avatar when set, otherwise one of the five default avatars.
    pub fn avatar_url(&self, size: u32) -> String {
        match self.avatar.as_deref().filter(|a| !a.is_empty()) {
            Some(hash) => format!("{CDN_BASE}/avatars/{}/{}.png?size={}", self.id, hash, size),
            None => {
                let index = self.discriminator.parse::<u32>().unwrap_or(0) % 5;
                format!("{CDN_BASE}/embed/avatars/{index}.png")
            }
        }
    }

    /// `name` for migrated accounts (discriminator "0"), else `name#1234`.
    pub fn display_name(&self) -> String {
        if self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: DiscordUser,
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: DiscordUser, tokens: &TokenResponse, duration: Duration, now: DateTime<Utc>) -> Self {
        Session {
            user,
            token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: now + duration,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn team<'a>(&self, teams: &'a TeamDirectory) -> Option<&'a Team> {
        teams.team_for_discord(&self.user.id)
    }

    pub fn is_commissioner(&self, teams: &TeamDirectory) -> bool {
        teams.is_commissioner(&self.user.id)
    }
}

pub fn session_duration(discord: &DiscordConfig) -> Duration {
    Duration::days(discord.session_days)
}

/// 16 random bytes, hex encoded.
pub fn new_oauth_state() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn verify_state(expected: &str, received: &str) -> Result<(), DiscordError> {
    if expected.is_empty() || expected != received {
        return Err(DiscordError::InvalidState);
    }
    Ok(())
}

/// Browser redirect target that starts the authorization-code flow.
pub fn authorize_url(
    discord: &DiscordConfig,
    credentials: &CredentialsConfig,
    state: &str,
) -> Result<Url, DiscordError> {
    let client_id = credentials
        .discord_client_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or(DiscordError::NotConfigured)?;
    let redirect_uri = credentials
        .redirect_uri
        .as_deref()
        .ok_or(DiscordError::NotConfigured)?;

    let base = format!("{}/oauth2/authorize", discord.api_base.trim_end_matches('/'));
    let mut url = Url::parse(&base).map_err(|e| DiscordError::InvalidUrl {
        message: e.to_string(),
    })?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &discord.scopes.join(" "))
        .append_pair("state", state);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::team::tests::sample_directory;
    use chrono::TimeZone;

    fn user(avatar: Option<&str>, discriminator: &str) -> DiscordUser {
        DiscordUser {
            id: "161967242118955008".into(),
            username: "zach".into(),
            discriminator: discriminator.into(),
            avatar: avatar.map(String::from),
            email: None,
        }
    }

    fn discord_config() -> DiscordConfig {
        DiscordConfig {
            api_base: "https://discord.com/api".into(),
            scopes: vec!["identify".into(), "guilds".into()],
            session_days: 7,
        }
    }

    #[test]
    fn avatar_urls() {
        assert_eq!(
            user(Some("abc123"), "0").avatar_url(64),
            "https://cdn.discordapp.com/avatars/161967242118955008/abc123.png?size=64"
        );
        assert_eq!(
            user(None, "1237").avatar_url(128),
            "https://cdn.discordapp.com/embed/avatars/2.png"
        );
    }

    #[test]
    fn display_names() {
        assert_eq!(user(None, "0").display_name(), "zach");
        assert_eq!(user(None, "4321").display_name(), "zach#4321");
    }

    #[test]
    fn session_expiry_and_team_lookup() {
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let tokens = TokenResponse {
            access_token: "tok".into(),
            refresh_token: Some("ref".into()),
            expires_in: Some(604800),
            token_type: Some("Bearer".into()),
        };
        let session = Session::new(user(None, "0"), &tokens, session_duration(&discord_config()), now);

        assert!(!session.is_expired(now + Duration::days(7)));
        assert!(session.is_expired(now + Duration::days(7) + Duration::seconds(1)));

        let teams = sample_directory();
        assert_eq!(session.team(&teams).map(|t| t.abbr.as_str()), Some("WIZ"));
        assert!(session.is_commissioner(&teams));

        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn oauth_state_is_random_hex() {
        let a = new_oauth_state();
        let b = new_oauth_state();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);

        assert!(verify_state(&a, &a).is_ok());
        assert!(matches!(verify_state(&a, &b), Err(DiscordError::InvalidState)));
        assert!(verify_state("", "").is_err());
    }

    #[test]
    fn authorize_url_carries_all_parameters() {
        let creds = CredentialsConfig {
            discord_client_id: Some("123".into()),
            discord_client_secret: Some("s".into()),
            redirect_uri: Some("http://localhost:8000/callback.html".into()),
        };
        let url = authorize_url(&discord_config(), &creds, "deadbeef").unwrap();
        assert_eq!(url.path(), "/api/oauth2/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "123".into())));
        assert!(pairs.contains(&("scope".into(), "identify guilds".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("state".into(), "deadbeef".into())));

        let missing = authorize_url(&discord_config(), &CredentialsConfig::default(), "x");
        assert!(matches!(missing, Err(DiscordError::NotConfigured)));
    }
}
