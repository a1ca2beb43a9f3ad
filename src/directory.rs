use serde_json::Value;

use crate::api::{ApiClient, Envelope, Page, Pagination, Query, unwrap_envelope};
use crate::domain::{Dataset, Organization};
use crate::error::DatamartError;
use crate::transform::normalize_dataset;

/// Organization operations of the marketplace API.
pub trait OrganizationClient: Send + Sync {
    fn list(&self, page: u32, page_size: u32) -> Result<OrganizationPage, DatamartError>;
    fn get(&self, id: &str) -> Result<Organization, DatamartError>;
    fn search(&self, query: &str, limit: u32) -> Result<Vec<Organization>, DatamartError>;
    fn featured(&self, limit: u32) -> Result<Vec<Organization>, DatamartError>;
    fn datasets(&self, id: &str, page: u32, page_size: u32) -> Result<Vec<Dataset>, DatamartError>;
}

#[derive(Debug, Clone)]
pub struct OrganizationPage {
    pub organizations: Vec<Organization>,
    pub pagination: Pagination,
}

#[derive(Clone)]
pub struct HttpOrganizationClient {
    api: ApiClient,
}

impl HttpOrganizationClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

impl OrganizationClient for HttpOrganizationClient {
    fn list(&self, page: u32, page_size: u32) -> Result<OrganizationPage, DatamartError> {
        let response: Page<Organization> = self.api.get(
            "/organizations",
            &Query::new().add("page", page).add("pageSize", page_size),
        )?;
        Ok(OrganizationPage {
            organizations: response.data,
            pagination: response.pagination,
        })
    }

    fn get(&self, id: &str) -> Result<Organization, DatamartError> {
        let envelope: Envelope<Organization> =
            self.api.get(&format!("/organizations/{id}"), &Query::new())?;
        unwrap_envelope(envelope)
    }

    fn search(&self, query: &str, limit: u32) -> Result<Vec<Organization>, DatamartError> {
        let envelope: Envelope<Vec<Organization>> = self.api.get(
            "/organizations/search",
            &Query::new().add("q", query).add("limit", limit),
        )?;
        unwrap_envelope(envelope)
    }

    fn featured(&self, limit: u32) -> Result<Vec<Organization>, DatamartError> {
        let envelope: Envelope<Vec<Organization>> = self
            .api
            .get("/organizations/featured", &Query::new().add("limit", limit))?;
        unwrap_envelope(envelope)
    }

    fn datasets(&self, id: &str, page: u32, page_size: u32) -> Result<Vec<Dataset>, DatamartError> {
        let response: Page<Value> = self.api.get(
            &format!("/organizations/{id}/datasets"),
            &Query::new().add("page", page).add("pageSize", page_size),
        )?;
        Ok(response.data.iter().map(normalize_dataset).collect())
    }
}
