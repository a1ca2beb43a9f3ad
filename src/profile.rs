use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::{ApiClient, Envelope, Query, unwrap_envelope};
use crate::error::DatamartError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentView {
    pub dataset_id: String,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub organization: String,
    pub role: String,
}

/// Account-scoped operations under `/users/me`.
pub trait ProfileClient: Send + Sync {
    fn current(&self) -> Result<Profile, DatamartError>;
    fn favorites(&self) -> Result<Vec<String>, DatamartError>;
    fn add_favorite(&self, dataset_id: &str) -> Result<(), DatamartError>;
    fn remove_favorite(&self, dataset_id: &str) -> Result<(), DatamartError>;
    fn recently_viewed(&self) -> Result<Vec<RecentView>, DatamartError>;
    fn push_recently_viewed(&self, dataset_id: &str) -> Result<(), DatamartError>;
    fn interests(&self) -> Result<Vec<String>, DatamartError>;
    fn update_interests(&self, interests: &[String]) -> Result<Vec<String>, DatamartError>;
}

#[derive(Clone)]
pub struct HttpProfileClient {
    api: ApiClient,
}

impl HttpProfileClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl ProfileClient for HttpProfileClient {
    fn current(&self) -> Result<Profile, DatamartError> {
        let envelope: Envelope<Profile> = self.api.get("/users/me", &Query::new())?;
        unwrap_envelope(envelope)
    }

    fn favorites(&self) -> Result<Vec<String>, DatamartError> {
        let envelope: Envelope<Vec<String>> = self.api.get("/users/me/favorites", &Query::new())?;
        unwrap_envelope(envelope)
    }

    fn add_favorite(&self, dataset_id: &str) -> Result<(), DatamartError> {
        let _: serde_json::Value = self
            .api
            .post("/users/me/favorites", &json!({ "datasetId": dataset_id }))?;
        Ok(())
    }

    fn remove_favorite(&self, dataset_id: &str) -> Result<(), DatamartError> {
        self.api.delete(&format!("/users/me/favorites/{dataset_id}"))
    }

    fn recently_viewed(&self) -> Result<Vec<RecentView>, DatamartError> {
        let envelope: Envelope<Vec<RecentView>> = self.api.get("/users/me/recent", &Query::new())?;
        unwrap_envelope(envelope)
    }

    fn push_recently_viewed(&self, dataset_id: &str) -> Result<(), DatamartError> {
        let _: serde_json::Value = self
            .api
            .post("/users/me/recent", &json!({ "datasetId": dataset_id }))?;
        Ok(())
    }

    fn interests(&self) -> Result<Vec<String>, DatamartError> {
        let envelope: Envelope<Vec<String>> = self.api.get("/users/me/interests", &Query::new())?;
        unwrap_envelope(envelope)
    }

    fn update_interests(&self, interests: &[String]) -> Result<Vec<String>, DatamartError> {
        let envelope: Envelope<Vec<String>> = self
            .api
            .put("/users/me/interests", &json!({ "interests": interests }))?;
        unwrap_envelope(envelope)
    }
}
