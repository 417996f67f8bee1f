//! Google Drive v3 / Sheets v4 REST クライアント

use super::{CloudSession, CloudStore};
use crate::error::{InvoiceAiError, Result};
use crate::scanner::ImagePayload;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use invoice_ai_common::layout::CLOUD_SHEET_HEADERS;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3";
const SHEETS_API: &str = "https://sheets.googleapis.com/v4";

const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    web_view_link: Option<String>,
}

pub struct GoogleWorkspace {
    http: reqwest::Client,
    session: CloudSession,
}

impl GoogleWorkspace {
    pub fn new(session: CloudSession) -> Self {
        Self {
            http: reqwest::Client::new(),
            session,
        }
    }

    /// アクセストークンを破棄（以降の呼び出しは NotAuthorized）
    pub fn invalidate(&mut self) {
        self.session.invalidate();
    }

    fn token(&self) -> Result<&str> {
        self.session.access_token()
    }

    async fn find_file(&self, query: &str) -> anyhow::Result<Option<String>> {
        let response = self
            .http
            .get(format!("{}/files", DRIVE_API))
            .bearer_auth(self.token()?)
            .query(&[("q", query), ("fields", "files(id, name)"), ("spaces", "drive")])
            .send()
            .await?;
        let list: FileList = check(response).await?.json().await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_file(&self, metadata: Value) -> anyhow::Result<String> {
        let response = self
            .http
            .post(format!("{}/files", DRIVE_API))
            .bearer_auth(self.token()?)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await?;
        let file: DriveFile = check(response).await?.json().await?;
        Ok(file.id)
    }

    async fn append_values(&self, sheet_id: &str, values: Value) -> anyhow::Result<()> {
        let response = self
            .http
            .post(format!("{}/spreadsheets/{}/values/A1:append", SHEETS_API, sheet_id))
            .bearer_auth(self.token()?)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&json!({ "values": values }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

async fn check(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("HTTP {}: {}", status, body))
}

/// Drive検索クエリ用の文字列エスケープ
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn folder_query(name: &str) -> String {
    format!(
        "mimeType='{}' and name='{}' and trashed=false",
        FOLDER_MIME,
        escape_query(name)
    )
}

fn sheet_query(folder_id: &str, name: &str) -> String {
    format!(
        "mimeType='{}' and name='{}' and '{}' in parents and trashed=false",
        SPREADSHEET_MIME,
        escape_query(name),
        escape_query(folder_id)
    )
}

fn sync_error(step: &str, error: anyhow::Error) -> InvoiceAiError {
    match error.downcast::<InvoiceAiError>() {
        Ok(inner) => inner,
        Err(other) => InvoiceAiError::CloudSync(format!("{}: {:#}", step, other)),
    }
}

#[async_trait]
impl CloudStore for GoogleWorkspace {
    async fn ensure_folder(&self, name: &str) -> Result<String> {
        let result: anyhow::Result<String> = async {
            if let Some(id) = self.find_file(&folder_query(name)).await? {
                return Ok(id);
            }
            debug!(folder = name, "creating Drive folder");
            self.create_file(json!({ "name": name, "mimeType": FOLDER_MIME }))
                .await
        }
        .await;
        result.map_err(|e| sync_error("folder", e))
    }

    async fn upload_file(&self, image: &ImagePayload, folder_id: &str) -> Result<String> {
        let result: anyhow::Result<String> = async {
            let metadata = json!({ "name": image.file_name, "parents": [folder_id] });
            let form = Form::new()
                .part(
                    "metadata",
                    Part::text(metadata.to_string()).mime_str("application/json")?,
                )
                .part(
                    "file",
                    Part::bytes(image.data.clone())
                        .file_name(image.file_name.clone())
                        .mime_str(&image.mime_type)?,
                );

            let response = self
                .http
                .post(format!("{}/files", DRIVE_UPLOAD_API))
                .bearer_auth(self.token()?)
                .query(&[("uploadType", "multipart"), ("fields", "id,webViewLink")])
                .multipart(form)
                .send()
                .await?;
            let file: DriveFile = check(response).await?.json().await?;
            debug!(file = %image.file_name, id = %file.id, "uploaded");
            file.web_view_link
                .context("webViewLink がレスポンスにありません")
        }
        .await;
        result.map_err(|e| sync_error("upload", e))
    }

    async fn ensure_sheet(&self, folder_id: &str, name: &str) -> Result<String> {
        let result: anyhow::Result<String> = async {
            if let Some(id) = self.find_file(&sheet_query(folder_id, name)).await? {
                return Ok(id);
            }
            debug!(sheet = name, "creating spreadsheet");
            let id = self
                .create_file(json!({
                    "name": name,
                    "mimeType": SPREADSHEET_MIME,
                    "parents": [folder_id],
                }))
                .await?;
            self.append_values(&id, json!([CLOUD_SHEET_HEADERS])).await?;
            Ok(id)
        }
        .await;
        result.map_err(|e| sync_error("sheet", e))
    }

    async fn append_row(&self, sheet_id: &str, row: &[Value]) -> Result<()> {
        self.append_values(sheet_id, json!([row]))
            .await
            .map_err(|e| sync_error("append", e))
    }
}
