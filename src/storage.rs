// Uploads finished snapshots to Google Cloud Storage
use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::debug;
use yup_oauth2::ServiceAccountAuthenticator;

use crate::config::Settings;
use crate::error::{CollectorError, Result};
use crate::report::{Event, Reporter};

/// Destination object for the advanced for-sale snapshot
pub const FORSALE_BLOB_NAME: &str = "forsale_latest.csv";
/// Destination object (and local file name) of the summary
pub const SUMMARY_BLOB_NAME: &str = "overall_summary_forsale.csv";

const STORAGE_SCOPES: [&str; 1] = ["https://www.googleapis.com/auth/devstorage.read_write"];

/// Accepts a local file and a fixed destination name, returns the object URI.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    async fn upload(&self, local: &Path, destination: &str) -> Result<String>;
}

/// GCS JSON API media upload, authenticated with a service-account key file.
pub struct GcsUploader {
    http: Client,
    bucket: String,
    credentials: PathBuf,
}

impl GcsUploader {
    pub fn new(settings: &Settings) -> Result<Self> {
        let bucket = settings.bucket()?.to_string();
        let credentials = settings.google_application_credentials.clone().ok_or_else(|| {
            CollectorError::Configuration(
                "GOOGLE_APPLICATION_CREDENTIALS is required for uploads".to_string(),
            )
        })?;
        Ok(GcsUploader {
            http: Client::builder().build()?,
            bucket,
            credentials,
        })
    }

    async fn access_token(&self) -> Result<String> {
        let key = yup_oauth2::read_service_account_key(&self.credentials)
            .await
            .map_err(|e| CollectorError::Upload(format!("reading service account key: {}", e)))?;
        let auth = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| CollectorError::Upload(format!("building authenticator: {}", e)))?;
        let token = auth
            .token(&STORAGE_SCOPES)
            .await
            .map_err(|e| CollectorError::Upload(format!("requesting token: {}", e)))?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| CollectorError::Upload("token string is empty".to_string()))
    }
}

impl ObjectStore for GcsUploader {
    async fn upload(&self, local: &Path, destination: &str) -> Result<String> {
        let body = tokio::fs::read(local).await?;
        let token = self.access_token().await?;
        let url = format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o",
            self.bucket
        );

        let response = self
            .http
            .post(&url)
            .query(&[("uploadType", "media"), ("name", destination)])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(body)
            .send()
            .await?;
        debug!("Upload response code: {}", response.status());
        response.error_for_status()?;

        Ok(format!("gs://{}/{}", self.bucket, destination))
    }
}

/// Uploads once, no retry, and reports where the file went.
pub async fn upload_file<S, R>(
    store: &S,
    local: &Path,
    destination: &str,
    reporter: &R,
) -> Result<String>
where
    S: ObjectStore,
    R: Reporter,
{
    let uri = store.upload(local, destination).await?;
    reporter.report(Event::Uploaded {
        path: local.to_path_buf(),
        destination: uri.clone(),
    });
    Ok(uri)
}
