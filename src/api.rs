//! Remote actions against the collaboration platform's REST API.
//!
//! Listing calls authenticate as the privileged system identity; posts,
//! replies and likes authenticate as the acting user. Every operation
//! returns a typed [`ApiError`] so callers decide skip-vs-abort explicitly.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::PopulatorConfig;
use crate::model::{Container, ContainerKind, MessageId};

// ========================================================================
// Wire types
// ========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sui: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberRecord {
    #[serde(default)]
    pub sui: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    #[serde(rename = "socialId")]
    pub social_id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
    #[serde(default)]
    pub admins: Vec<MemberRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelMemberRecord {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, rename = "externalId")]
    pub external_id: String,
    #[serde(default)]
    pub sui: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<ChannelMemberRecord>,
}

#[derive(Debug, Deserialize)]
struct PostedResponse {
    id: String,
}

// ========================================================================
// Errors
// ========================================================================

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success HTTP status, with the response body for diagnosis.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response (connect, DNS, timeout).
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// A success response whose body did not parse as expected.
    #[error("unexpected response from {endpoint}: {detail}")]
    Malformed { endpoint: String, detail: String },
}

// ========================================================================
// Remote actions seam
// ========================================================================

#[async_trait]
pub trait RemoteActions: Send + Sync {
    async fn list_actors(&self) -> Result<Vec<UserRecord>, ApiError>;
    async fn list_groups(&self) -> Result<Vec<GroupRecord>, ApiError>;
    async fn list_channels(&self) -> Result<Vec<ChannelRecord>, ApiError>;
    async fn create_actor(&self, display_name: &str) -> Result<(), ApiError>;

    /// Post a top-level message as `handle`; returns the remote-assigned id.
    async fn post_message(
        &self,
        container: &Container,
        handle: &str,
        content: &str,
    ) -> Result<MessageId, ApiError>;

    async fn post_reply(
        &self,
        message: &MessageId,
        handle: &str,
        content: &str,
    ) -> Result<(), ApiError>;

    async fn like_message(&self, message: &MessageId, handle: &str) -> Result<(), ApiError>;
}

// ========================================================================
// REST client
// ========================================================================

pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    system_username: String,
    system_password: String,
    actor_password: String,
}

impl RestClient {
    pub fn new(config: &PopulatorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            system_username: config.system_username.clone(),
            system_password: config.system_password.clone(),
            actor_password: config.actor_password.clone(),
        }
    }

    fn populator_url(&self, resource: &str) -> String {
        format!("{}/populator/{}", self.base_url, resource)
    }

    fn social_url(&self, object_id: &str, resource: &str) -> String {
        format!("{}/1/0/{}/{}", self.base_url, object_id, resource)
    }

    async fn get_as_system<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.system_username, Some(&self.system_password))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: url.clone(),
                source,
            })?;
        let response = check_status(&url, response).await?;
        response.json().await.map_err(|e| ApiError::Malformed {
            endpoint: url,
            detail: e.to_string(),
        })
    }

    async fn post_as_actor(
        &self,
        url: String,
        handle: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self
            .client
            .post(&url)
            .basic_auth(handle, Some(&self.actor_password));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|source| ApiError::Transport {
            endpoint: url.clone(),
            source,
        })?;
        check_status(&url, response).await
    }
}

async fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RemoteActions for RestClient {
    async fn list_actors(&self) -> Result<Vec<UserRecord>, ApiError> {
        self.get_as_system(self.populator_url("users")).await
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, ApiError> {
        self.get_as_system(self.populator_url("groups")).await
    }

    async fn list_channels(&self) -> Result<Vec<ChannelRecord>, ApiError> {
        self.get_as_system(self.populator_url("channels")).await
    }

    async fn create_actor(&self, display_name: &str) -> Result<(), ApiError> {
        let url = self.populator_url("user");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.system_username, Some(&self.system_password))
            .json(&serde_json::json!({ "name": display_name }))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: url.clone(),
                source,
            })?;
        check_status(&url, response).await?;
        Ok(())
    }

    async fn post_message(
        &self,
        container: &Container,
        handle: &str,
        content: &str,
    ) -> Result<MessageId, ApiError> {
        let resource = match container.kind {
            ContainerKind::Group => "timelineentries",
            ContainerKind::Channel => "channelmessages",
        };
        let url = self.social_url(&container.id, resource);
        let response = self
            .post_as_actor(url.clone(), handle, Some(serde_json::json!({ "message": content })))
            .await?;
        let posted: PostedResponse = response.json().await.map_err(|e| ApiError::Malformed {
            endpoint: url,
            detail: e.to_string(),
        })?;
        Ok(MessageId(posted.id))
    }

    async fn post_reply(
        &self,
        message: &MessageId,
        handle: &str,
        content: &str,
    ) -> Result<(), ApiError> {
        let url = self.social_url(&message.0, "messagereplies");
        self.post_as_actor(url, handle, Some(serde_json::json!({ "message": content })))
            .await?;
        Ok(())
    }

    async fn like_message(&self, message: &MessageId, handle: &str) -> Result<(), ApiError> {
        let url = self.social_url(&message.0, "likes");
        self.post_as_actor(url, handle, None).await?;
        Ok(())
    }
}

// ========================================================================
// Test double
// ========================================================================
