//! Directory identity for a channel sender.
//!
//! Teams only gives us the sender's display name (and, for tenant users, an object id), so the
//! bridge looks the user up in Graph on every request. Display names are not unique: the first
//! directory match wins and ambiguity is only logged.

mod graph;

pub use graph::GraphDirectory;

use crate::activity::Activity;
use crate::auth::TokenError;
use async_trait::async_trait;
use serde::Deserialize;

/// A directory user as returned by Graph (`$select=id,displayName,userPrincipalName,mail`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryIdentity {
    #[serde(default, rename = "id")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
}

/// Channel-side identity of a sender plus the directory entry, when one was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderAccount {
    pub channel_user_id: String,
    pub channel_display_name: Option<String>,
    pub tenant_id: Option<String>,
    pub identity: Option<DirectoryIdentity>,
}

impl SenderAccount {
    /// User principal name of the resolved directory entry.
    pub fn upn(&self) -> Option<&str> {
        self.identity
            .as_ref()
            .and_then(|i| i.user_principal_name.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory token: {0}")]
    Token(#[from] TokenError),
    #[error("directory request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("directory api error: {0}")]
    Api(String),
}

/// Looks users up in a directory. Implemented by [`GraphDirectory`].
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    /// First user whose display name equals `name` exactly.
    async fn find_by_display_name(&self, name: &str) -> Result<Option<DirectoryIdentity>, DirectoryError>;

    /// User with the given object id.
    async fn find_by_object_id(&self, object_id: &str) -> Result<Option<DirectoryIdentity>, DirectoryError>;
}

/// Resolve the sender of `activity`. Returns None when the activity has no sender; lookup
/// failures and misses yield an account without `identity`.
/// With `prefer_object_id`, a sender carrying `aadObjectId` is looked up by id instead of name.
pub async fn resolve_sender(
    lookup: &dyn DirectoryLookup,
    activity: &Activity,
    prefer_object_id: bool,
) -> Option<SenderAccount> {
    let Some(from) = activity.from.as_ref() else {
        log::warn!("directory: activity has no sender");
        return None;
    };
    let display_name = from.name.as_deref().filter(|s| !s.trim().is_empty());
    log::info!(
        "directory: looking up channel user id={} name={}",
        from.id,
        display_name.unwrap_or("<none>")
    );
    let mut account = SenderAccount {
        channel_user_id: from.id.clone(),
        channel_display_name: display_name.map(str::to_string),
        tenant_id: activity.tenant_id().map(str::to_string),
        identity: None,
    };

    let object_id = from
        .aad_object_id
        .as_deref()
        .filter(|s| prefer_object_id && !s.trim().is_empty());
    let result = match (object_id, display_name) {
        (Some(id), _) => lookup.find_by_object_id(id).await,
        (None, Some(name)) => lookup.find_by_display_name(name).await,
        (None, None) => {
            log::warn!("directory: no display name available for channel user {}", from.id);
            return Some(account);
        }
    };
    match result {
        Ok(Some(identity)) => {
            log::info!(
                "directory: resolved {} to {}",
                from.id,
                identity.user_principal_name.as_deref().unwrap_or("<no upn>")
            );
            account.identity = Some(identity);
        }
        Ok(None) => log::info!("directory: no directory user for channel user {}", from.id),
        Err(e) => log::warn!("directory: lookup failed: {}", e),
    }
    Some(account)
}
