//! Durable record store over a PostgREST-style HTTP API
//!
//! Each collection is a table at `{base}/rest/v1/{collection}`. Records are
//! upserted by primary key and deleted by `session_id` or `id` filter.

use enroll_core::config::StoreConfig;
use enroll_core::error::{EnrollError, Result};
use enroll_core::session::ParticipantRecord;
use enroll_core::store::{Collection, RecordStore};
use enroll_core::types::{ParticipantId, SessionId};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use tracing::debug;

/// Statuses worth another attempt: timeouts, throttling and gateway errors
const TRANSIENT_STATUSES: [StatusCode; 5] = [
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// HTTP record store client
pub struct RestRecordStore {
    base_url: String,
    api_key: Option<String>,
    http_client: Client,
}

impl RestRecordStore {
    /// Build a client from store settings
    ///
    /// Fails with `NotConfigured` when no URL is set.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let base_url = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| EnrollError::NotConfigured("store.url is not set".to_string()))?;

        let http_client = Client::builder()
            .connect_timeout(config.timeout())
            .timeout(config.timeout())
            .build()
            .map_err(|e| EnrollError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.name())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }

    fn send(&self, what: &str, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .map_err(|e| classify_transport(what, &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(classify_status(what, status, &body))
    }
}

/// Map a transport failure to an error class
fn classify_transport(what: &str, err: &reqwest::Error) -> EnrollError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        EnrollError::Network(format!("{}: {}", what, err))
    } else {
        EnrollError::Backend(format!("{}: {}", what, err))
    }
}

/// Map an unsuccessful HTTP status to an error class
fn classify_status(what: &str, status: StatusCode, body: &str) -> EnrollError {
    let message = if body.trim().is_empty() {
        format!("{}: HTTP {}", what, status)
    } else {
        format!("{}: HTTP {}: {}", what, status, body.trim())
    };
    if TRANSIENT_STATUSES.contains(&status) {
        EnrollError::Network(message)
    } else {
        EnrollError::Backend(message)
    }
}

impl RecordStore for RestRecordStore {
    fn fetch(&self, collection: Collection) -> Result<Vec<ParticipantRecord>> {
        let request = self
            .http_client
            .get(self.table_url(collection))
            .query(&[("select", "*"), ("order", "created_at.asc")]);
        let response = self.send(&format!("Fetch {}", collection), request)?;
        let records: Vec<ParticipantRecord> = response
            .json()
            .map_err(|e| EnrollError::Backend(format!("Invalid {} payload: {}", collection, e)))?;
        debug!("Fetched {} {} records", records.len(), collection);
        Ok(records)
    }

    fn upsert(&self, collection: Collection, records: &[ParticipantRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let request = self
            .http_client
            .post(self.table_url(collection))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(records);
        self.send(&format!("Upsert {}", collection), request)?;
        debug!("Upserted {} {} records", records.len(), collection);
        Ok(())
    }

    fn delete(&self, collection: Collection, session: Option<&SessionId>) -> Result<()> {
        let filter = match session {
            Some(id) => ("session_id", format!("eq.{}", id)),
            // PostgREST refuses unfiltered deletes.
            None => ("id", "not.is.null".to_string()),
        };
        let request = self
            .http_client
            .delete(self.table_url(collection))
            .query(&[filter]);
        self.send(&format!("Delete {}", collection), request)?;
        Ok(())
    }

    fn delete_record(&self, collection: Collection, id: &ParticipantId) -> Result<()> {
        let request = self
            .http_client
            .delete(self.table_url(collection))
            .query(&[("id", format!("eq.{}", id))]);
        self.send(&format!("Delete {} record", collection), request)?;
        debug!("Deleted {} from {}", id, collection);
        Ok(())
    }
}
