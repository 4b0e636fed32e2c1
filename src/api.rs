// API client module: a small blocking HTTP client that talks to the DICOM
// server's REST API. One call is one request-response exchange; there is
// no retry and no batching.

use crate::error::UploadError;
use anyhow::Context;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Client bound to one server for the lifetime of a run. Holds a reqwest
/// blocking client and the base URL without trailing slash.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

/// What the server answers after storing an instance. It returns more
/// fields than these; only the identifiers are kept.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstanceReceipt {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ParentStudy")]
    pub parent_study: String,
    #[serde(rename = "ParentPatient", default)]
    pub parent_patient: String,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

/// Main DICOM tags of an instance, keyed by "gggg,eeee".
pub type ShortTags = HashMap<String, serde_json::Value>;

pub const TAG_PATIENT_ID: &str = "0010,0020";
pub const TAG_STUDY_INSTANCE_UID: &str = "0020,000d";

impl ApiClient {
    /// Build a client for `base_url`. The URL is expected to be validated
    /// already (see `config`); a trailing slash is tolerated.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, UploadError> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Remove every study stored on the server: list `/studies`, then
    /// delete them one by one. Returns how many studies were removed.
    /// What else the server drops along with a study is up to the server.
    pub fn clear(&self) -> Result<usize, UploadError> {
        let studies = self.list_studies()?;
        tracing::info!(count = studies.len(), "removing studies");
        for study in &studies {
            self.delete_study(study)?;
        }
        Ok(studies.len())
    }

    pub fn list_studies(&self) -> Result<Vec<String>, UploadError> {
        let url = format!("{}/studies", &self.base_url);
        let res = send(&url, self.client.get(&url))?;
        let ids: Vec<String> = res
            .json()
            .with_context(|| format!("Parsing study list from {}", url))?;
        Ok(ids)
    }

    pub fn delete_study(&self, id: &str) -> Result<(), UploadError> {
        let url = format!("{}/studies/{}", &self.base_url, id);
        send(&url, self.client.delete(&url))?;
        tracing::debug!(study = id, "study deleted");
        Ok(())
    }

    /// Send one DICOM instance to the ingestion endpoint.
    ///
    /// Any success status means the server stored the data. The receipt is
    /// only returned when the body is a single instance object; a buffer
    /// holding several instances is answered with an array, which yields
    /// `None`.
    pub fn upload_instance(&self, dicom: Vec<u8>) -> Result<Option<InstanceReceipt>, UploadError> {
        let url = format!("{}/instances", &self.base_url);
        let req = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/dicom")
            .body(dicom);
        let res = send(&url, req)?;
        let receipt = match res.json::<serde_json::Value>() {
            Ok(body) => serde_json::from_value::<InstanceReceipt>(body).ok(),
            Err(e) => {
                tracing::debug!(error = %e, "upload response is not JSON");
                None
            }
        };
        Ok(receipt)
    }

    pub fn instance_tags(&self, id: &str) -> Result<ShortTags, UploadError> {
        let url = format!("{}/instances/{}/tags?short", &self.base_url, id);
        let res = send(&url, self.client.get(&url))?;
        let tags: ShortTags = res
            .json()
            .with_context(|| format!("Parsing tags from {}", url))?;
        Ok(tags)
    }
}

/// Send a request and turn transport failures and non-success statuses
/// into the matching `UploadError`.
fn send(url: &str, req: reqwest::blocking::RequestBuilder) -> Result<Response, UploadError> {
    let res = req.send().map_err(|source| UploadError::ServerUnreachable {
        url: url.to_string(),
        source,
    })?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().unwrap_or_else(|_| "".into());
        return Err(UploadError::Server {
            url: url.to_string(),
            status,
            body,
        });
    }
    Ok(res)
}
