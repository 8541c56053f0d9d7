//! REST client for the portal backend.
//!
//! [`ScholarshipApi`] is the seam the session talks through;
//! [`RestClient`] is the reqwest implementation. Requests are single-shot:
//! a failed call is reported to the caller, never retried here.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{PortalError, Result};
use crate::models::{Application, BookmarkRequest, Profile, Scholarship};

pub trait ScholarshipApi: Send + Sync {
    /// `GET /scholarships/`. Anonymous callers get public fields only.
    fn list_scholarships(
        &self,
        token: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Scholarship>>> + Send;

    /// `POST /scholarships/{id}/bookmark/` with `{"saved": saved}`.
    fn set_bookmark(
        &self,
        id: i64,
        saved: bool,
        token: Option<&str>,
    ) -> impl Future<Output = Result<Scholarship>> + Send;

    /// `GET /accounts/me/`.
    fn current_profile(&self, token: &str) -> impl Future<Output = Result<Profile>> + Send;

    /// `GET /applications/applications/?applicant={id}`.
    fn applications_for(
        &self,
        applicant: i64,
        token: &str,
    ) -> impl Future<Output = Result<Vec<Application>>> + Send;
}

#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        RestClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(PortalError::Status {
            status,
            context: context.to_string(),
        });
    }
    Ok(response.json::<T>().await?)
}

/// Decode each catalogue entry on its own. A record that fails to decode
/// (for example a negative or non-numeric amount) is logged and skipped.
pub fn decode_scholarships(raw: Vec<Value>) -> Vec<Scholarship> {
    raw.into_iter()
        .filter_map(|entry| {
            let id = entry.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<Scholarship>(entry) {
                Ok(scholarship) => Some(scholarship),
                Err(e) => {
                    warn!("Skipping malformed scholarship record (id {id}): {e}");
                    None
                }
            }
        })
        .collect()
}

impl ScholarshipApi for RestClient {
    async fn list_scholarships(&self, token: Option<&str>) -> Result<Vec<Scholarship>> {
        let response = self
            .request(Method::GET, "scholarships/", token)
            .send()
            .await?;
        let raw: Vec<Value> = decode(response, "Failed to fetch scholarships").await?;
        let scholarships = decode_scholarships(raw);
        debug!("Fetched {} scholarships", scholarships.len());
        Ok(scholarships)
    }

    async fn set_bookmark(&self, id: i64, saved: bool, token: Option<&str>) -> Result<Scholarship> {
        let response = self
            .request(Method::POST, &format!("scholarships/{id}/bookmark/"), token)
            .json(&BookmarkRequest { saved })
            .send()
            .await?;
        decode(response, "Failed to update bookmark status").await
    }

    async fn current_profile(&self, token: &str) -> Result<Profile> {
        let response = self
            .request(Method::GET, "accounts/me/", Some(token))
            .send()
            .await?;
        decode(response, "Failed to fetch user info").await
    }

    async fn applications_for(&self, applicant: i64, token: &str) -> Result<Vec<Application>> {
        let response = self
            .request(Method::GET, "applications/applications/", Some(token))
            .query(&[("applicant", applicant)])
            .send()
            .await?;
        let applications: Vec<Application> =
            decode(response, "Failed to fetch applications").await?;
        debug!(
            "Fetched {} applications for applicant {applicant}",
            applications.len()
        );
        Ok(applications)
    }
}
