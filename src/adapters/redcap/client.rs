//! REDCap REST client
//!
//! Implements [`DataCaptureApi`] over the REDCap API: a single endpoint
//! accepting token-authenticated form POSTs, with `content`/`action`
//! parameters selecting the operation. Transient transport failures are
//! retried with exponential backoff; 4xx responses are surfaced
//! immediately (retrying a rejected import will not make it valid).

use crate::adapters::redcap::api::DataCaptureApi;
use crate::adapters::redcap::models::{
    ExportFieldName, FieldMetadata, ImportResponse, InstrumentEntry, ProjectInfo,
};
use crate::config::schema::{HttpConfig, ProjectConfig, RetryConfig};
use crate::config::SecretString;
use crate::domain::ids::{EventName, FormName, RecordId};
use crate::domain::record::Record;
use crate::domain::{RedcapError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::time::Duration;

/// Async client for one REDCap project
#[derive(Debug)]
pub struct RedcapClient {
    url: String,
    token: SecretString,
    client: Client,
    retry: RetryConfig,
    primary_key: String,
    project: ProjectInfo,
}

impl RedcapClient {
    /// Connect to a project: verifies the token by fetching the project
    /// attributes and resolves the primary key field.
    ///
    /// # Errors
    ///
    /// Returns a `RedcapError` if the endpoint is unreachable, the token
    /// is rejected, or the responses don't parse.
    pub async fn connect(project: &ProjectConfig, http: &HttpConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(http.timeout_seconds))
            .connect_timeout(Duration::from_secs(http.timeout_seconds))
            .build()
            .map_err(|e| RedcapError::ConnectionFailed(e.to_string()))?;

        let mut redcap = Self {
            url: project.api_url.clone(),
            token: project.api_token.clone(),
            client,
            retry: http.retry.clone(),
            primary_key: String::new(),
            project: ProjectInfo::default(),
        };

        let body = redcap.post_form(redcap.base_params("project")).await?;
        redcap.project = parse_json(&body)?;

        let body = redcap
            .post_form(redcap.base_params("exportFieldNames"))
            .await?;
        let fields: Vec<ExportFieldName> = parse_json(&body)?;
        redcap.primary_key = fields
            .first()
            .map(|f| f.export_field_name.clone())
            .ok_or_else(|| {
                RedcapError::InvalidResponse("project reports no exportable fields".to_string())
            })?;

        tracing::info!(
            project_id = redcap.project.project_id,
            title = %redcap.project.project_title,
            primary_key = %redcap.primary_key,
            longitudinal = redcap.project.is_longitudinal,
            "Connected to REDCap project"
        );

        Ok(redcap)
    }

    fn base_params(&self, content: &str) -> Vec<(String, String)> {
        vec![
            (
                "token".to_string(),
                self.token.expose_secret().as_ref().to_string(),
            ),
            ("content".to_string(), content.to_string()),
            ("format".to_string(), "json".to_string()),
            ("returnFormat".to_string(), "json".to_string()),
        ]
    }

    /// POST a form-encoded request, retrying transient failures with
    /// exponential backoff.
    async fn post_form(&self, params: Vec<(String, String)>) -> Result<String> {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;

        loop {
            match self.try_post(&params).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt + 1 < max_retries => {
                    attempt += 1;

                    let delay_ms = self.retry.initial_delay_ms
                        * (self.retry.backoff_multiplier.powf((attempt - 1) as f64) as u64).max(1);
                    let delay_ms = delay_ms.min(self.retry.max_delay_ms);

                    tracing::warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        delay_ms = delay_ms,
                        error = %e,
                        "Retrying REDCap request after transient error"
                    );

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn try_post(
        &self,
        params: &[(String, String)],
    ) -> std::result::Result<String, RedcapError> {
        let response = self
            .client
            .post(&self.url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RedcapError::Timeout(e.to_string())
                } else {
                    RedcapError::ConnectionFailed(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RedcapError::InvalidResponse(e.to_string()))?;

        if status.is_success() {
            Ok(body)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(RedcapError::AuthenticationFailed(truncate(&body)))
        } else if status.is_server_error() {
            Err(RedcapError::ServerError {
                status: status.as_u16(),
                message: truncate(&body),
            })
        } else {
            Err(RedcapError::ClientError {
                status: status.as_u16(),
                message: truncate(&body),
            })
        }
    }

    /// The project attributes fetched at connect time
    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }
}

#[async_trait]
impl DataCaptureApi for RedcapClient {
    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    async fn project_info(&self) -> Result<ProjectInfo> {
        Ok(self.project.clone())
    }

    async fn data_dictionary(&self, forms: &[FormName]) -> Result<Vec<FieldMetadata>> {
        let mut params = self.base_params("metadata");
        push_indexed(&mut params, "forms", forms.iter().map(FormName::as_str));

        let body = self.post_form(params).await?;
        parse_json(&body)
    }

    async fn instrument_list(&self) -> Result<Vec<FormName>> {
        let body = self.post_form(self.base_params("instrument")).await?;
        let entries: Vec<InstrumentEntry> = parse_json(&body)?;

        let mut forms = Vec::with_capacity(entries.len());
        for entry in entries {
            match FormName::from_str(&entry.instrument_name) {
                Ok(form) => forms.push(form),
                Err(e) => {
                    tracing::warn!(
                        instrument = %entry.instrument_name,
                        error = %e,
                        "Skipping invalid instrument name"
                    );
                }
            }
        }
        Ok(forms)
    }

    async fn export_record_ids(
        &self,
        forms: &[FormName],
        events: &[EventName],
    ) -> Result<Vec<RecordId>> {
        let mut params = self.base_params("record");
        params.push(("action".to_string(), "export".to_string()));
        params.push(("type".to_string(), "flat".to_string()));
        params.push(("fields[0]".to_string(), self.primary_key.clone()));
        push_indexed(&mut params, "forms", forms.iter().map(FormName::as_str));
        push_indexed(&mut params, "events", events.iter().map(EventName::as_str));

        let body = self.post_form(params).await?;
        let rows: Vec<Map<String, Value>> = parse_json(&body)?;

        // The primary key repeats across events and instances; keep the
        // first occurrence to preserve project order
        let mut seen = std::collections::HashSet::new();
        let mut ids = Vec::new();
        for row in &rows {
            let Some(value) = row.get(&self.primary_key) else {
                continue;
            };
            let raw = stringify(value);
            if raw.is_empty() || !seen.insert(raw.clone()) {
                continue;
            }
            match RecordId::new(raw) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(error = %e, "Skipping invalid record id"),
            }
        }

        tracing::info!(
            instances = rows.len(),
            records = ids.len(),
            "Exported record ids from project"
        );

        Ok(ids)
    }

    async fn export_records(
        &self,
        ids: &[RecordId],
        form: &FormName,
        events: &[EventName],
    ) -> Result<Vec<Record>> {
        let mut params = self.base_params("record");
        params.push(("action".to_string(), "export".to_string()));
        params.push(("type".to_string(), "flat".to_string()));
        // Exporting a subset of forms drops the primary key unless it is
        // requested explicitly
        params.push(("fields[0]".to_string(), self.primary_key.clone()));
        params.push(("forms[0]".to_string(), form.as_str().to_string()));
        push_indexed(&mut params, "records", ids.iter().map(RecordId::as_str));
        push_indexed(&mut params, "events", events.iter().map(EventName::as_str));

        let body = self.post_form(params).await?;
        let rows: Vec<Map<String, Value>> = parse_json(&body)?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match Record::from_wire(row, &self.primary_key, form) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(form = %form, error = %e, "Skipping malformed record row");
                }
            }
        }
        Ok(records)
    }

    async fn import_records(&self, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let rows: Vec<Map<String, Value>> = records
            .iter()
            .map(|record| record.to_wire(&self.primary_key))
            .collect();
        let data = serde_json::to_string(&rows)?;

        let mut params = self.base_params("record");
        params.push(("action".to_string(), "import".to_string()));
        params.push(("type".to_string(), "flat".to_string()));
        params.push(("overwriteBehavior".to_string(), "normal".to_string()));
        params.push(("data".to_string(), data));

        let body = self.post_form(params).await?;
        let response: ImportResponse = parse_json(&body)?;
        Ok(response.count)
    }

    async fn confirm_present(&self, ids: &[RecordId]) -> Result<Vec<RecordId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut params = self.base_params("record");
        params.push(("action".to_string(), "export".to_string()));
        params.push(("type".to_string(), "flat".to_string()));
        params.push(("fields[0]".to_string(), self.primary_key.clone()));
        push_indexed(&mut params, "records", ids.iter().map(RecordId::as_str));

        let body = self.post_form(params).await?;
        let rows: Vec<Map<String, Value>> = parse_json(&body)?;

        let present: std::collections::HashSet<String> = rows
            .iter()
            .filter_map(|row| row.get(&self.primary_key))
            .map(stringify)
            .collect();

        Ok(ids
            .iter()
            .filter(|id| present.contains(id.as_str()))
            .cloned()
            .collect())
    }

    async fn delete_records(&self, ids: &[RecordId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut params = self.base_params("record");
        params.push(("action".to_string(), "delete".to_string()));
        push_indexed(&mut params, "records", ids.iter().map(RecordId::as_str));

        // The delete response is the bare count, not a JSON object
        let body = self.post_form(params).await?;
        body.trim().parse().map_err(|_| {
            RedcapError::InvalidResponse(format!(
                "expected deleted-record count, got '{}'",
                truncate(&body)
            ))
            .into()
        })
    }
}

/// Append `name[0]=..`, `name[1]=..` parameters for an array argument
fn push_indexed<'a>(
    params: &mut Vec<(String, String)>,
    name: &str,
    values: impl Iterator<Item = &'a str>,
) {
    for (i, value) in values.enumerate() {
        params.push((format!("{name}[{i}]"), value.to_string()));
    }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| RedcapError::InvalidResponse(format!("{e}: {}", truncate(body))).into())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keep error payloads log-sized
fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        None => body.to_string(),
        Some((idx, _)) => format!("{}...", &body[..idx]),
    }
}
