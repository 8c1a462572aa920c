//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.relay/config.json`) and then overlaid with
//! environment variables (the same names the Bot Framework tooling uses, plus `LANGFLOW_*`).
//! Unset values are treated as empty/disabled; nothing here validates credentials.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// App registration used for both channel auth and Graph.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Langflow backend.
    #[serde(default)]
    pub flow: FlowConfig,

    /// Directory (Graph) lookup.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Turn behavior: welcome message, state, card pacing, asset catalog.
    #[serde(default)]
    pub bot: BotConfig,

    /// Outbound HTTP settings shared by every client.
    #[serde(default)]
    pub http: HttpConfig,

    /// Where replies may be posted.
    #[serde(default)]
    pub connector: ConnectorConfig,
}

/// Settings for all outbound HTTP clients (Langflow, identity provider, Graph, connector).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Verify TLS certificates. Overridden by VERIFY_SSL env.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,

    /// Bound on each identity provider, Graph and connector call, in seconds (default 30).
    /// Langflow runs use `flow.timeoutSecs`.
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            verify_ssl: true,
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Allowed reply targets. An inbound activity names its own `serviceUrl`, so replies only go
/// to hosts listed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorConfig {
    /// Host patterns; `*.example.com` matches any subdomain of example.com.
    #[serde(default = "default_service_hosts")]
    pub allowed_service_hosts: Vec<String>,

    /// Accept plain `http` service urls (local emulators and tests). Default: false.
    #[serde(default)]
    pub allow_http: bool,
}

fn default_service_hosts() -> Vec<String> {
    ["*.botframework.com", "smba.trafficmanager.net", "*.teams.microsoft.com"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            allowed_service_hosts: default_service_hosts(),
            allow_http: false,
        }
    }
}

/// Listener bind, port, and dev mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for `/api/messages` (default 3979). Overridden by PORT env.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Skip channel auth and return raw error text on 500s. Overridden by DEV_MODE env.
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_port() -> u16 {
    3979
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            dev_mode: false,
        }
    }
}

/// Azure app registration (MicrosoftAppId / MicrosoftAppPassword / MicrosoftAppTenantId).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_password: String,
    #[serde(default)]
    pub tenant_id: String,
}

impl CredentialsConfig {
    /// True when app id, password and tenant are all set.
    pub fn is_complete(&self) -> bool {
        !self.app_id.trim().is_empty()
            && !self.app_password.trim().is_empty()
            && !self.tenant_id.trim().is_empty()
    }
}

/// Langflow run endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowConfig {
    /// Langflow server root (default "http://localhost:7860").
    #[serde(default = "default_flow_base_url")]
    pub base_url: String,

    /// Flow id used when no endpoint name is set.
    #[serde(default)]
    pub flow_id: String,

    /// Endpoint name from the flow settings; takes precedence over flow_id.
    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_io_type")]
    pub input_type: String,

    #[serde(default = "default_io_type")]
    pub output_type: String,

    /// Per-component tweaks sent with every run.
    #[serde(default)]
    pub tweaks: Option<serde_json::Map<String, serde_json::Value>>,

    /// Sent as `x-api-key` when set. Overridden by LANGFLOW_API_KEY env.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout for one run call, in seconds (default 120).
    #[serde(default = "default_flow_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_flow_base_url() -> String {
    "http://localhost:7860".to_string()
}

fn default_io_type() -> String {
    "chat".to_string()
}

fn default_flow_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            base_url: default_flow_base_url(),
            flow_id: String::new(),
            endpoint: String::new(),
            input_type: default_io_type(),
            output_type: default_io_type(),
            tweaks: None,
            api_key: None,
            timeout_secs: default_flow_timeout_secs(),
        }
    }
}

impl FlowConfig {
    /// Endpoint name when set, otherwise the flow id.
    pub fn target(&self) -> &str {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            self.flow_id.trim()
        } else {
            endpoint
        }
    }
}

/// Identity provider and Graph endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfig {
    /// Token authority root (default "https://login.microsoftonline.com").
    #[serde(default = "default_authority_base")]
    pub authority_base: String,

    /// Graph API root (default "https://graph.microsoft.com/v1.0").
    #[serde(default = "default_graph_base")]
    pub graph_base: String,

    /// Look the sender up by `from.aadObjectId` when the channel provides it, instead of
    /// matching on display name.
    #[serde(default)]
    pub prefer_object_id: bool,
}

fn default_authority_base() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_graph_base() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            authority_base: default_authority_base(),
            graph_base: default_graph_base(),
            prefer_object_id: false,
        }
    }
}

/// Turn behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotConfig {
    /// Send the welcome text when a member is added to the conversation. Default: false.
    #[serde(default)]
    pub welcome_on_member_added: bool,

    /// Track conversation state and save it at the end of every turn. Default: true.
    #[serde(default = "default_true")]
    pub conversation_state: bool,

    /// Pause between the acknowledgement text and the dropdown card, in milliseconds.
    #[serde(default = "default_follow_up_delay_ms")]
    pub follow_up_delay_ms: u64,

    /// Prompt used for the asset dropdown when the flow gives none.
    #[serde(default = "default_asset_prompt")]
    pub asset_prompt: String,

    /// Asset catalog offered in the asset dropdown, in display order.
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,
}

fn default_follow_up_delay_ms() -> u64 {
    1000
}

fn default_asset_prompt() -> String {
    "Please select the assets you would like to request:".to_string()
}

/// Default asset catalog.
pub fn default_assets() -> Vec<String> {
    [
        "Active Directory",
        "Outlook Email",
        "Cerner EHR",
        "Salesforce CRM",
        "Jira",
        "VPN Access",
        "SharePoint",
        "Zoom Pro Account",
        "SAP Finance Module",
        "ServiceNow ITSM",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            welcome_on_member_added: false,
            conversation_state: true,
            follow_up_delay_ms: default_follow_up_delay_ms(),
            asset_prompt: default_asset_prompt(),
            assets: default_assets(),
        }
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".relay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path (or RELAY_CONFIG_PATH / default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Load `.env` (if present) and overlay process environment onto the config.
pub fn apply_process_env(config: &mut Config) {
    match dotenvy::dotenv() {
        Ok(path) => log::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("reading .env failed: {}", e),
    }
    apply_env(config, |name| std::env::var(name).ok());
}

/// Overlay environment values onto the config. `lookup` returns the raw variable value;
/// blank values are ignored.
pub fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| {
        lookup(name)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    if let Some(v) = get("MicrosoftAppId") {
        config.credentials.app_id = v;
    }
    if let Some(v) = get("MicrosoftAppPassword") {
        config.credentials.app_password = v;
    }
    if let Some(v) = get("MicrosoftAppTenantId") {
        config.credentials.tenant_id = v;
    }
    if let Some(v) = get("DEV_MODE") {
        config.server.dev_mode = v.eq_ignore_ascii_case("true");
    }
    if let Some(v) = get("VERIFY_SSL") {
        config.http.verify_ssl = v.eq_ignore_ascii_case("true");
    }
    if let Some(v) = get("PORT") {
        match v.parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(_) => log::warn!("ignoring invalid PORT value: {}", v),
        }
    }
    if let Some(v) = get("LANGFLOW_BASE_URL") {
        config.flow.base_url = v;
    }
    if let Some(v) = get("LANGFLOW_FLOW_ID") {
        config.flow.flow_id = v;
    }
    if let Some(v) = get("LANGFLOW_ENDPOINT") {
        config.flow.endpoint = v;
    }
    if let Some(v) = get("LANGFLOW_API_KEY") {
        config.flow.api_key = Some(v);
    }
}
