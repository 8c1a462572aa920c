//! Bot Framework connector: posts reply activities to the conversation's service url.
//! In production mode each call carries a bearer token for the bot's app registration, so
//! the service url named by the inbound activity must pass [`ServiceUrlPolicy`] first.

use super::ActivitySender;
use crate::activity::Activity;
use crate::auth::{self, ClientCredentials, TokenError, BOT_CONNECTOR_SCOPE, BOT_FRAMEWORK_TENANT};
use crate::config::{ConnectorConfig, CredentialsConfig, IdentityConfig};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("activity has no serviceUrl")]
    MissingServiceUrl,
    #[error("activity has no conversation id")]
    MissingConversation,
    #[error("invalid serviceUrl {0}")]
    InvalidServiceUrl(String),
    #[error("connector token: {0}")]
    Token(#[from] TokenError),
    #[error("connector request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("connector api error: {0}")]
    Api(String),
}

/// Hosts (and schemes) replies may be posted to.
#[derive(Debug, Clone)]
pub struct ServiceUrlPolicy {
    hosts: Vec<String>,
    allow_http: bool,
}

impl ServiceUrlPolicy {
    pub fn new(config: &ConnectorConfig) -> Self {
        Self {
            hosts: config
                .allowed_service_hosts
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            allow_http: config.allow_http,
        }
    }

    /// Also accept `http` on localhost and 127.0.0.1 (emulator in dev mode).
    pub fn with_loopback(mut self) -> Self {
        self.hosts.push("localhost".to_string());
        self.hosts.push("127.0.0.1".to_string());
        self.allow_http = true;
        self
    }

    pub fn permits(&self, url: &Url) -> bool {
        let scheme_ok = match url.scheme() {
            "https" => true,
            "http" => self.allow_http,
            _ => false,
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        scheme_ok && self.hosts.iter().any(|p| host_matches(p, &host))
    }
}

/// `*.example.com` matches strict subdomains of example.com; anything else matches exactly.
fn host_matches(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(domain) => host
            .strip_suffix(domain)
            .map(|sub| sub.len() > 1 && sub.ends_with('.'))
            .unwrap_or(false),
        None => pattern == host,
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Posts activities to `{serviceUrl}/v3/conversations/{id}/activities[/{replyToId}]`.
pub struct BotConnector {
    client: reqwest::Client,
    policy: ServiceUrlPolicy,
    /// None in dev mode: replies go out unauthenticated (emulator).
    credentials: Option<ClientCredentials>,
    token_cache: RwLock<Option<CachedToken>>,
}

impl BotConnector {
    /// Unauthenticated connector for local development.
    pub fn unauthenticated(client: reqwest::Client, policy: ServiceUrlPolicy) -> Self {
        Self {
            client,
            policy,
            credentials: None,
            token_cache: RwLock::new(None),
        }
    }

    /// Connector authenticating as the app registration. Single-tenant bots use their own
    /// tenant; otherwise the Bot Framework tenant.
    pub fn authenticated(
        client: reqwest::Client,
        policy: ServiceUrlPolicy,
        identity: &IdentityConfig,
        credentials: &CredentialsConfig,
    ) -> Self {
        let tenant = if credentials.tenant_id.trim().is_empty() {
            BOT_FRAMEWORK_TENANT.to_string()
        } else {
            credentials.tenant_id.clone()
        };
        Self {
            client,
            policy,
            credentials: Some(ClientCredentials {
                authority_base: identity.authority_base.clone(),
                tenant,
                client_id: credentials.app_id.clone(),
                client_secret: credentials.app_password.clone(),
            }),
            token_cache: RwLock::new(None),
        }
    }

    async fn access_token(&self, creds: &ClientCredentials) -> Result<String, ConnectorError> {
        {
            let guard = self.token_cache.read().await;
            if let Some(token) = guard.as_ref() {
                if token.expires_at > Utc::now() + Duration::seconds(30) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let token = auth::acquire_token(&self.client, creds, BOT_CONNECTOR_SCOPE).await?;
        let ttl = token.expires_in.saturating_sub(60);
        let mut guard = self.token_cache.write().await;
        *guard = Some(CachedToken {
            access_token: token.token.clone(),
            expires_at: Utc::now() + Duration::seconds(ttl),
        });
        log::debug!("connector: refreshed bot token");
        Ok(token.token)
    }
}

/// Activities endpoint for `activity`; conversation and reply ids are percent-encoded as
/// path segments. Fails with `InvalidServiceUrl` when `policy` does not permit the service url.
pub fn activities_url(activity: &Activity, policy: &ServiceUrlPolicy) -> Result<Url, ConnectorError> {
    let service_url = activity
        .service_url
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ConnectorError::MissingServiceUrl)?;
    let conversation_id = activity
        .conversation
        .as_ref()
        .map(|c| c.id.as_str())
        .filter(|s| !s.is_empty())
        .ok_or(ConnectorError::MissingConversation)?;
    let mut url =
        Url::parse(service_url).map_err(|_| ConnectorError::InvalidServiceUrl(service_url.to_string()))?;
    if !policy.permits(&url) {
        log::warn!("connector: refusing reply to service url {}", service_url);
        return Err(ConnectorError::InvalidServiceUrl(service_url.to_string()));
    }
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| ConnectorError::InvalidServiceUrl(service_url.to_string()))?;
        segments
            .pop_if_empty()
            .extend(["v3", "conversations", conversation_id, "activities"]);
        if let Some(reply_to) = activity.reply_to_id.as_deref().filter(|s| !s.is_empty()) {
            segments.push(reply_to);
        }
    }
    Ok(url)
}

#[async_trait]
impl ActivitySender for BotConnector {
    async fn send_activity(&self, activity: &Activity) -> Result<(), ConnectorError> {
        let url = activities_url(activity, &self.policy)?;
        let mut req = self.client.post(url.clone()).json(activity);
        if let Some(ref creds) = self.credentials {
            let token = self.access_token(creds).await?;
            req = req.bearer_auth(token);
        }
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ConnectorError::Api(format!("{} {}", status, body)));
        }
        log::debug!("connector: sent {:?} to {}", activity.typ, url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ConversationAccount;
    use crate::test_support::spawn_router;
    use axum::{
        extract::{OriginalUri, State},
        http::HeaderMap,
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    async fn mock_connector() -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/login/:tenant/oauth2/v2.0/token",
                post(|| async { Json(json!({ "access_token": "bot-token", "expires_in": 3600 })) }),
            )
            .fallback(
                |State(seen): State<Seen>, OriginalUri(uri): OriginalUri, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    seen.lock().unwrap().push((uri.path().to_string(), auth, body));
                    Json(json!({ "id": "reply-1" }))
                },
            )
            .with_state(seen.clone());
        (spawn_router(router).await, seen)
    }

    fn policy(hosts: &[&str]) -> ServiceUrlPolicy {
        ServiceUrlPolicy::new(&ConnectorConfig {
            allowed_service_hosts: hosts.iter().map(|h| h.to_string()).collect(),
            allow_http: false,
        })
    }

    fn loopback() -> ServiceUrlPolicy {
        policy(&[]).with_loopback()
    }

    fn reply(service_url: &str, reply_to: Option<&str>) -> Activity {
        Activity {
            service_url: Some(format!("{}/amer/", service_url)),
            conversation: Some(ConversationAccount {
                id: "19:abc@thread.v2/x y".to_string(),
                ..ConversationAccount::default()
            }),
            reply_to_id: reply_to.map(str::to_string),
            ..Activity::message("Hi there")
        }
    }

    fn authenticated(base: &str, policy: ServiceUrlPolicy) -> BotConnector {
        let identity = IdentityConfig {
            authority_base: format!("{}/login", base),
            ..IdentityConfig::default()
        };
        let credentials = CredentialsConfig {
            app_id: "app".to_string(),
            app_password: "secret".to_string(),
            tenant_id: String::new(),
        };
        BotConnector::authenticated(reqwest::Client::new(), policy, &identity, &credentials)
    }

    #[test]
    fn url_encodes_conversation_id() {
        let p = policy(&["smba.example"]);
        let url = activities_url(&reply("https://smba.example", Some("42")), &p).unwrap();
        assert_eq!(
            url.as_str(),
            "https://smba.example/amer/v3/conversations/19:abc@thread.v2%2Fx%20y/activities/42"
        );
        let url = activities_url(&reply("https://smba.example", None), &p).unwrap();
        assert!(url.as_str().ends_with("/activities"));
    }

    #[test]
    fn missing_service_url_is_error() {
        let mut a = reply("https://smba.example", None);
        a.service_url = None;
        assert!(matches!(
            activities_url(&a, &policy(&["smba.example"])),
            Err(ConnectorError::MissingServiceUrl)
        ));
    }

    #[test]
    fn default_hosts_cover_teams_service_urls() {
        let p = ServiceUrlPolicy::new(&ConnectorConfig::default());
        for ok in [
            "https://smba.trafficmanager.net/amer/",
            "https://emea.botframework.com/",
            "https://canary.teams.microsoft.com/",
        ] {
            assert!(p.permits(&Url::parse(ok).unwrap()), "{}", ok);
        }
        for bad in [
            "http://smba.trafficmanager.net/amer/",
            "https://botframework.com.attacker.net/",
            "https://evilbotframework.com/",
            "https://botframework.com/",
            "https://127.0.0.1/",
        ] {
            assert!(!p.permits(&Url::parse(bad).unwrap()), "{}", bad);
        }
    }

    #[test]
    fn foreign_host_is_invalid_service_url() {
        let err = activities_url(&reply("https://attacker.example", None), &policy(&["smba.example"]))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidServiceUrl(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn unauthenticated_posts_without_token() {
        let (base, seen) = mock_connector().await;
        let connector = BotConnector::unauthenticated(reqwest::Client::new(), loopback());
        connector.send_activity(&reply(&base, Some("42"))).await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.ends_with("/activities/42"));
        assert_eq!(seen[0].1, None);
        assert_eq!(seen[0].2["text"], "Hi there");
    }

    #[tokio::test]
    async fn authenticated_attaches_bearer_token() {
        let (base, seen) = mock_connector().await;
        let connector = authenticated(&base, loopback());
        connector.send_activity(&reply(&base, None)).await.unwrap();
        connector.send_activity(&reply(&base, None)).await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].1.as_deref(), Some("Bearer bot-token"));
    }

    #[tokio::test]
    async fn token_never_sent_to_unlisted_host() {
        let (base, seen) = mock_connector().await;
        let connector = authenticated(&base, ServiceUrlPolicy::new(&ConnectorConfig::default()));
        let err = connector.send_activity(&reply(&base, None)).await.unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidServiceUrl(_)), "got {:?}", err);
        assert!(seen.lock().unwrap().is_empty());
    }
}
