//! Microsoft Graph user lookup (client-credentials token per call, no caching).

use super::{DirectoryError, DirectoryIdentity, DirectoryLookup};
use crate::auth::{self, ClientCredentials, GRAPH_SCOPE};
use crate::config::{CredentialsConfig, IdentityConfig};
use async_trait::async_trait;
use serde::Deserialize;

const USER_SELECT: &str = "id,displayName,userPrincipalName,mail";

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    value: Vec<DirectoryIdentity>,
}

/// Graph-backed [`DirectoryLookup`].
#[derive(Clone)]
pub struct GraphDirectory {
    graph_base: String,
    credentials: ClientCredentials,
    client: reqwest::Client,
}

impl GraphDirectory {
    pub fn new(identity: &IdentityConfig, credentials: &CredentialsConfig, client: reqwest::Client) -> Self {
        Self {
            graph_base: identity.graph_base.trim_end_matches('/').to_string(),
            credentials: ClientCredentials {
                authority_base: identity.authority_base.clone(),
                tenant: credentials.tenant_id.clone(),
                client_id: credentials.app_id.clone(),
                client_secret: credentials.app_password.clone(),
            },
            client,
        }
    }

    async fn token(&self) -> Result<String, DirectoryError> {
        let token = auth::acquire_token(&self.client, &self.credentials, GRAPH_SCOPE).await?;
        log::debug!("directory: acquired graph token");
        Ok(token.token)
    }
}

/// OData string literal: single quotes doubled.
fn odata_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[async_trait]
impl DirectoryLookup for GraphDirectory {
    async fn find_by_display_name(&self, name: &str) -> Result<Option<DirectoryIdentity>, DirectoryError> {
        let token = self.token().await?;
        let url = format!("{}/users", self.graph_base);
        let filter = format!("displayName eq {}", odata_literal(name));
        let res = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("$filter", filter.as_str()), ("$select", USER_SELECT)])
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DirectoryError::Api(format!("{} {}", status, body)));
        }
        let data: UsersResponse = res.json().await?;
        if data.value.len() > 1 {
            log::warn!(
                "directory: {} users share display name {:?}; using the first match",
                data.value.len(),
                name
            );
        }
        Ok(data.value.into_iter().next())
    }

    async fn find_by_object_id(&self, object_id: &str) -> Result<Option<DirectoryIdentity>, DirectoryError> {
        let token = self.token().await?;
        let url = format!("{}/users/{}", self.graph_base, object_id);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("$select", USER_SELECT)])
            .send()
            .await?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DirectoryError::Api(format!("{} {}", status, body)));
        }
        Ok(Some(res.json().await?))
    }
}
