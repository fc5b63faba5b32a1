//! Jade API connector implementation
//!
//! Implements `RemoteStore` for the Jade sync API.

use async_trait::async_trait;
use bridge_traits::http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RetryPolicy,
};
use core_sync::{
    HealthStatus, Manifest, RemoteSettings, RemoteStore, RemoteStoreFactory, SyncError,
    SyncRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{JadeError, Result};
use crate::types::{fields, ApiEnvelope, FileExists, RebuildRequest};

/// Header carrying the access token on every call
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Timeout for calls other than the health probe
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Jade API connector
///
/// One connector is built per publish cycle from the settings snapshot, so
/// edits to the endpoint or token never affect a cycle in flight.
///
/// # Example
///
/// ```ignore
/// use provider_jade::JadeConnector;
/// use core_sync::RemoteSettings;
///
/// let settings = RemoteSettings::new("https://jade.example.com", "token");
/// let connector = JadeConnector::new(http_client, &settings);
/// let stored = connector.exists("5d41402abc4b2a76b9719d911017c592").await?;
/// ```
pub struct JadeConnector {
    http_client: Arc<dyn HttpClient>,

    /// `<endpoint>/api/sync`
    base_url: String,

    access_token: String,

    retry_policy: RetryPolicy,
}

impl JadeConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, settings: &RemoteSettings) -> Self {
        Self {
            http_client,
            base_url: settings.base_url(),
            access_token: settings.access_token.clone(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Override the retry policy used for everything except the health probe.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: HttpMethod, path: &str) -> HttpRequest {
        HttpRequest::new(method, format!("{}{}", self.base_url, path))
            .header(ACCESS_TOKEN_HEADER, self.access_token.clone())
            .timeout(REQUEST_TIMEOUT)
    }

    /// Send with retries and classify the status code.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .http_client
            .execute_with_retry(request, self.retry_policy.clone())
            .await?;
        Self::check_status(response)
    }

    fn check_status(response: HttpResponse) -> Result<HttpResponse> {
        if response.status == 401 {
            return Err(JadeError::Unauthorized);
        }
        if !response.is_success() {
            return Err(JadeError::ApiError {
                status_code: response.status,
                message: Self::error_message(&response),
            });
        }
        Ok(response)
    }

    /// Prefer the envelope's `msg`, fall back to the raw body.
    fn error_message(response: &HttpResponse) -> String {
        if let Ok(envelope) = response.json::<ApiEnvelope<serde_json::Value>>() {
            if let Some(msg) = envelope.msg {
                return msg;
            }
        }
        String::from_utf8_lossy(&response.body).trim().to_string()
    }

    fn build_form(request: &SyncRequest) -> MultipartForm {
        let mut form = MultipartForm::new()
            .text(fields::PATH, request.path.clone())
            .text(fields::STATUS, request.status.as_tag());

        if let Some(old_path) = request.status.old_path() {
            form = form.text(fields::OLD_PATH, old_path);
        }

        if let Some(metadata) = &request.metadata {
            form = form
                .text(fields::MD5, metadata.content_hash.clone())
                .text(fields::EXTENSION, metadata.extension.clone())
                .text(fields::LAST_MODIFIED, metadata.last_modified.clone());
        }

        if let Some(content) = &request.content {
            let file_name = request
                .path
                .rsplit('/')
                .next()
                .unwrap_or(request.path.as_str());
            form = form.file(fields::FILE, file_name, content.clone());
        }

        form
    }
}

#[async_trait]
impl RemoteStore for JadeConnector {
    #[instrument(skip(self))]
    async fn check_health(&self, timeout: Duration) -> HealthStatus {
        let request = self
            .request(HttpMethod::Get, "/check-health")
            .timeout(timeout);

        let response = match self
            .http_client
            .execute_with_retry(request, RetryPolicy::no_retry())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Health probe failed");
                return HealthStatus::Unavailable(e.to_string());
            }
        };

        match Self::check_status(response) {
            Ok(response) => {
                // A 2xx with `{"data": false}` means the service is up but not ready.
                let not_ready = response
                    .json::<ApiEnvelope<serde_json::Value>>()
                    .map(|envelope| envelope.data == Some(serde_json::Value::Bool(false)))
                    .unwrap_or(false);
                if not_ready {
                    HealthStatus::Unavailable("service reported not ready".to_string())
                } else {
                    debug!("Health probe passed");
                    HealthStatus::Healthy
                }
            }
            Err(JadeError::Unauthorized) => HealthStatus::Unauthorized,
            Err(e) => HealthStatus::Unavailable(e.to_string()),
        }
    }

    #[instrument(skip(self))]
    async fn exists(&self, content_hash: &str) -> core_sync::Result<bool> {
        let request = self.request(
            HttpMethod::Get,
            &format!("/check-file-exists?md5={}", content_hash),
        );
        let response = self
            .send(request)
            .await
            .map_err(|e| e.into_sync_error("check-file-exists"))?;

        let envelope: ApiEnvelope<FileExists> = response
            .json()
            .map_err(|e| JadeError::ParseError(e.to_string()).into_sync_error("check-file-exists"))?;
        Ok(envelope.data.map(|data| data.exists).unwrap_or(false))
    }

    #[instrument(skip(self, request), fields(path = %request.path, status = %request.status.as_tag(), upload = request.carries_content()))]
    async fn sync_file(&self, request: SyncRequest) -> core_sync::Result<()> {
        let form = Self::build_form(&request);
        let http_request = self.request(HttpMethod::Post, "").multipart(form);

        match self.send(http_request).await {
            Ok(_) => {
                debug!("Path synced");
                Ok(())
            }
            Err(JadeError::ApiError {
                status_code,
                message,
            }) => Err(SyncError::Rejected {
                path: request.path,
                status: status_code,
                message,
            }),
            Err(e) => Err(e.into_sync_error("sync")),
        }
    }

    #[instrument(skip(self))]
    async fn flush(&self) -> core_sync::Result<()> {
        self.send(self.request(HttpMethod::Get, "/flush"))
            .await
            .map_err(|e| e.into_sync_error("flush"))?;
        info!("Remote staging flushed");
        Ok(())
    }

    #[instrument(skip(self, manifest), fields(files = manifest.len()))]
    async fn rebuild(&self, manifest: &Manifest, clear_others: bool) -> core_sync::Result<()> {
        let body = RebuildRequest {
            files: manifest.entries(),
            clear_others,
        };
        let request = self
            .request(HttpMethod::Post, "/rebuild")
            .json(&body)
            .map_err(|e| SyncError::CommitFailed(e.to_string()))?;

        match self.send(request).await {
            Ok(_) => Ok(()),
            Err(JadeError::Unauthorized) => Err(SyncError::Unauthorized),
            Err(e) => Err(SyncError::CommitFailed(e.to_string())),
        }
    }
}

/// Builds a [`JadeConnector`] per settings snapshot.
pub struct JadeRemoteFactory {
    http_client: Arc<dyn HttpClient>,
    retry_policy: RetryPolicy,
}

impl JadeRemoteFactory {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

impl RemoteStoreFactory for JadeRemoteFactory {
    fn connect(&self, settings: &RemoteSettings) -> core_sync::Result<Arc<dyn RemoteStore>> {
        settings.validate()?;
        Ok(Arc::new(
            JadeConnector::new(self.http_client.clone(), settings)
                .with_retry_policy(self.retry_policy.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bytes::Bytes;
    use core_sync::{ContentMetadata, ManifestEntry, PathStatus};
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn execute_with_retry(&self, request: HttpRequest, policy: RetryPolicy) -> BridgeResult<HttpResponse>;
            async fn is_connected(&self) -> bool;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn settings() -> RemoteSettings {
        RemoteSettings::new("https://jade.example.com/", "secret-token")
    }

    fn connector(mock: MockHttpClient) -> JadeConnector {
        JadeConnector::new(Arc::new(mock), &settings())
    }

    fn metadata() -> ContentMetadata {
        ContentMetadata {
            content_hash: "5d41402abc4b2a76b9719d911017c592".to_string(),
            extension: "md".to_string(),
            last_modified: "2024-01-02 03:04:05".to_string(),
        }
    }

    #[tokio::test]
    async fn test_health_ok() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .withf(|req, policy| {
                req.url == "https://jade.example.com/api/sync/check-health"
                    && req.headers.get(ACCESS_TOKEN_HEADER).map(String::as_str)
                        == Some("secret-token")
                    && req.timeout == Some(Duration::from_millis(500))
                    && policy.max_attempts == 1
            })
            .times(1)
            .returning(|_, _| Ok(response(200, r#"{"data":true}"#)));

        let status = connector(mock_http)
            .check_health(Duration::from_millis(500))
            .await;
        assert_eq!(status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_health_unauthorized() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .returning(|_, _| Ok(response(401, r#"{"msg":"bad token"}"#)));

        let status = connector(mock_http)
            .check_health(Duration::from_millis(500))
            .await;
        assert_eq!(status, HealthStatus::Unauthorized);
    }

    #[tokio::test]
    async fn test_health_not_ready() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .returning(|_, _| Ok(response(200, r#"{"data":false}"#)));

        let status = connector(mock_http)
            .check_health(Duration::from_millis(500))
            .await;
        assert!(matches!(status, HealthStatus::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_health_transport_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute_with_retry().returning(|_, _| {
            Err(BridgeError::OperationFailed("request timed out".into()))
        });

        let status = connector(mock_http)
            .check_health(Duration::from_millis(500))
            .await;
        assert!(matches!(status, HealthStatus::Unavailable(msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_exists() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .withf(|req, _| {
                req.url.ends_with("/api/sync/check-file-exists?md5=abc")
                    && req.method == HttpMethod::Get
            })
            .times(1)
            .returning(|_, _| Ok(response(200, r#"{"data":{"exists":true},"msg":"ok"}"#)));

        assert!(connector(mock_http).exists("abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_malformed_body() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .returning(|_, _| Ok(response(200, "<html>")));

        let err = connector(mock_http).exists("abc").await.unwrap_err();
        assert!(matches!(err, SyncError::Remote { operation, .. } if operation == "check-file-exists"));
    }

    #[tokio::test]
    async fn test_sync_upload_form() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .withf(|req, _| {
                let Some(form) = &req.form else {
                    return false;
                };
                req.url == "https://jade.example.com/api/sync"
                    && req.method == HttpMethod::Post
                    && form.field("path") == Some("notes/hello.md")
                    && form.field("status") == Some("created")
                    && form.field("md5") == Some("5d41402abc4b2a76b9719d911017c592")
                    && form.field("extension") == Some("md")
                    && form.field("lastModified") == Some("2024-01-02 03:04:05")
                    && form.field("oldPath").is_none()
                    && form
                        .file
                        .as_ref()
                        .map(|f| f.field == "file" && f.file_name == "hello.md")
                        .unwrap_or(false)
            })
            .times(1)
            .returning(|_, _| Ok(response(200, r#"{"msg":"ok"}"#)));

        let request = SyncRequest::with_metadata("notes/hello.md", PathStatus::Created, metadata())
            .with_content(Bytes::from_static(b"hello"));
        connector(mock_http).sync_file(request).await.unwrap();
    }

    #[tokio::test]
    async fn test_sync_rename_without_file() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .withf(|req, _| {
                let form = req.form.as_ref().unwrap();
                form.field("status") == Some("renamed")
                    && form.field("oldPath") == Some("old/name.md")
                    && form.field("md5").is_some()
                    && !form.has_file()
            })
            .times(1)
            .returning(|_, _| Ok(response(200, "{}")));

        let request = SyncRequest::with_metadata(
            "new/name.md",
            PathStatus::Renamed {
                from: "old/name.md".into(),
            },
            metadata(),
        );
        connector(mock_http).sync_file(request).await.unwrap();
    }

    #[tokio::test]
    async fn test_sync_delete_is_bare() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .withf(|req, _| {
                let form = req.form.as_ref().unwrap();
                form.fields.len() == 2
                    && form.field("path") == Some("gone.md")
                    && form.field("status") == Some("deleted")
                    && !form.has_file()
            })
            .times(1)
            .returning(|_, _| Ok(response(200, "{}")));

        connector(mock_http)
            .sync_file(SyncRequest::deletion("gone.md"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sync_rejection_carries_path() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .returning(|_, _| Ok(response(413, r#"{"msg":"file too large"}"#)));

        let err = connector(mock_http)
            .sync_file(
                SyncRequest::with_metadata("big.pdf", PathStatus::Created, metadata())
                    .with_content(Bytes::from_static(b"x")),
            )
            .await
            .unwrap_err();

        match err {
            SyncError::Rejected {
                path,
                status,
                message,
            } => {
                assert_eq!(path, "big.pdf");
                assert_eq!(status, 413);
                assert_eq!(message, "file too large");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_flush() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .withf(|req, _| req.url.ends_with("/api/sync/flush") && req.method == HttpMethod::Get)
            .times(1)
            .returning(|_, _| Ok(response(200, "{}")));

        connector(mock_http).flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_rebuild_body() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .withf(|req, _| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
                req.url.ends_with("/api/sync/rebuild")
                    && req.method == HttpMethod::Post
                    && body["clearOthers"] == true
                    && body["files"].as_array().map(|f| f.len()) == Some(2)
                    && body["files"][1]["deleted"] == true
            })
            .times(1)
            .returning(|_, _| Ok(response(200, "{}")));

        let manifest: Manifest = vec![
            ManifestEntry::present("a.md", "h", "md", "2024-01-01 00:00:00"),
            ManifestEntry::deleted("b.md"),
        ]
        .into_iter()
        .collect();
        connector(mock_http).rebuild(&manifest, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_rebuild_failure() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute_with_retry()
            .returning(|_, _| Ok(response(500, "internal")));

        let err = connector(mock_http)
            .rebuild(&Manifest::new(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::CommitFailed(msg) if msg.contains("internal")));
    }

    #[test]
    fn test_factory_validates_settings() {
        let factory = JadeRemoteFactory::new(Arc::new(MockHttpClient::new()));
        assert!(matches!(
            factory.connect(&RemoteSettings::new("", "t")),
            Err(SyncError::NotConfigured { .. })
        ));
        assert!(factory.connect(&settings()).is_ok());
    }
}
