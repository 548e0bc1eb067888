//! Google Sheets values API

use async_trait::async_trait;
use intake_common::category::append_range;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{check_status, GoogleError, TokenProvider};
use crate::services::SheetStore;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// `ValueRange` resource
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    values: &'a [Vec<String>],
}

/// Reads and appends values of one spreadsheet
pub struct SheetsClient {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    spreadsheet_id: String,
    base_url: String,
}

impl SheetsClient {
    pub fn new(http: reqwest::Client, auth: Arc<TokenProvider>, spreadsheet_id: String) -> Self {
        Self {
            http,
            auth,
            spreadsheet_id,
            base_url: SHEETS_BASE_URL.to_string(),
        }
    }

    pub async fn get_values(&self, range: &str) -> Result<ValueRange, GoogleError> {
        let token = self.auth.access_token().await?;
        let url = values_url(&self.base_url, &self.spreadsheet_id, range, "")?;

        let response = self.http.get(url).bearer_auth(&token).send().await?;
        let response = check_status("Sheets", response).await?;

        response
            .json::<ValueRange>()
            .await
            .map_err(|e| GoogleError::Parse(e.to_string()))
    }

    pub async fn append_values(
        &self,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<(), GoogleError> {
        let token = self.auth.access_token().await?;
        let url = values_url(&self.base_url, &self.spreadsheet_id, range, ":append")?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&AppendBody { values: rows })
            .send()
            .await?;
        check_status("Sheets", response).await?;
        Ok(())
    }
}

/// `<base>/<id>/values/<range><suffix>` with each segment percent-encoded
pub fn values_url(
    base_url: &str,
    spreadsheet_id: &str,
    range: &str,
    suffix: &str,
) -> Result<Url, GoogleError> {
    let mut url = Url::parse(base_url).map_err(|e| GoogleError::Parse(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| GoogleError::Parse(format!("Invalid Sheets base URL {}", base_url)))?
        .push(spreadsheet_id)
        .push("values")
        .push(&format!("{}{}", range, suffix));
    Ok(url)
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl SheetStore for SheetsClient {
    async fn get(&self, range: &str) -> intake_common::Result<Vec<Vec<String>>> {
        let values = self.get_values(range).await?;
        debug!(range = %values.range, rows = values.values.len(), "Read sheet range");
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn append(&self, sheet_name: &str, row: Vec<String>) -> intake_common::Result<()> {
        let range = append_range(sheet_name);
        self.append_values(&range, &[row]).await?;
        debug!(range = %range, "Appended row");
        Ok(())
    }
}
