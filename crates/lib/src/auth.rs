//! OAuth2 client-credentials exchange against the Microsoft identity platform.
//! Used for Graph lookups and for authenticating connector replies.

use serde::Deserialize;

/// Scope for Graph application permissions.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Scope for Bot Framework connector calls.
pub const BOT_CONNECTOR_SCOPE: &str = "https://api.botframework.com/.default";

/// Tenant used for multi-tenant bot registrations.
pub const BOT_FRAMEWORK_TENANT: &str = "botframework.com";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("client credentials not configured")]
    MissingCredentials,
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token endpoint rejected request: {0}")]
    Rejected(String),
}

/// App registration used for the exchange.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub authority_base: String,
    pub tenant: String,
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    fn is_complete(&self) -> bool {
        !self.tenant.trim().is_empty()
            && !self.client_id.trim().is_empty()
            && !self.client_secret.trim().is_empty()
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_base.trim_end_matches('/'),
            self.tenant.trim()
        )
    }
}

/// Token plus its lifetime in seconds (as reported by the endpoint).
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Exchange client credentials for a token with `scope`. Fails without a request when any
/// credential is blank.
pub async fn acquire_token(
    http: &reqwest::Client,
    creds: &ClientCredentials,
    scope: &str,
) -> Result<AccessToken, TokenError> {
    if !creds.is_complete() {
        return Err(TokenError::MissingCredentials);
    }
    let res = http
        .post(creds.token_url())
        .form(&[
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
        ])
        .send()
        .await?;
    let status = res.status();
    let body = res.text().await?;
    let payload: TokenResponse = serde_json::from_str(&body)
        .map_err(|_| TokenError::Rejected(format!("{} {}", status, body)))?;
    match payload.access_token {
        Some(token) if status.is_success() => Ok(AccessToken {
            token,
            expires_in: payload.expires_in.unwrap_or(3600),
        }),
        _ => Err(TokenError::Rejected(format!(
            "{} {} - {}",
            status,
            payload.error.unwrap_or_default(),
            payload.error_description.unwrap_or_default()
        ))),
    }
}
