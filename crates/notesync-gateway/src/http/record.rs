//! Record service backend.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use notesync_core::{NewNoteRecord, NoteId, NoteRecord, RecordGateway, Result};

use super::{build_client, check_status, endpoint, parse_base_url};
use crate::config::GatewayConfig;

/// Body of `GET /notes`.
#[derive(Debug, Deserialize)]
struct ListResponse {
    items: Vec<NoteRecord>,
}

/// Note records over a JSON REST API.
///
/// | Operation | Request |
/// |-----------|---------|
/// | create | `POST {base}/notes` |
/// | list | `GET {base}/notes` → `{"items": [...]}` |
/// | delete | `DELETE {base}/notes/{id}` |
pub struct HttpRecordGateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpRecordGateway {
    /// Create a record gateway from the shared gateway configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = build_client(config.timeout_secs)?;
        let base_url = parse_base_url(&config.record_base_url)?;

        info!(url = %base_url, "Initializing HTTP record gateway");

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(&GatewayConfig::from_env())
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref api_key) => req.bearer_auth(api_key),
            None => req,
        }
    }
}

#[async_trait]
impl RecordGateway for HttpRecordGateway {
    #[instrument(skip(self, fields), fields(subsystem = "gateway", component = "http_record", op = "create"))]
    async fn create(&self, fields: NewNoteRecord) -> Result<NoteRecord> {
        let url = endpoint(&self.base_url, &["notes"])?;
        debug!(has_image = fields.image.is_some(), "Creating note record");

        let response = self
            .authorize(self.client.post(url))
            .json(&fields)
            .send()
            .await?;
        let response = check_status(response, "create").await?;

        let record: NoteRecord = response.json().await?;
        debug!(note_id = %record.id, "Note record created");
        Ok(record)
    }

    #[instrument(skip(self), fields(subsystem = "gateway", component = "http_record", op = "list"))]
    async fn list(&self) -> Result<Vec<NoteRecord>> {
        let url = endpoint(&self.base_url, &["notes"])?;

        let response = self.authorize(self.client.get(url)).send().await?;
        let response = check_status(response, "list").await?;

        let body: ListResponse = response.json().await?;
        debug!(result_count = body.items.len(), "Listed note records");
        Ok(body.items)
    }

    #[instrument(skip(self), fields(subsystem = "gateway", component = "http_record", op = "delete", note_id = %id))]
    async fn delete(&self, id: &NoteId) -> Result<NoteRecord> {
        let url = endpoint(&self.base_url, &["notes", id.as_str()])?;

        let response = self.authorize(self.client.delete(url)).send().await?;
        let response = check_status(response, "delete").await?;

        Ok(response.json().await?)
    }
}
