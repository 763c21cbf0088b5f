//! HTTP client with a blocking GET path and a non-blocking upload path.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, Url};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use super::request::{RawResponse, Request};
use super::response::ResponseInfo;
use super::retry::{with_connect_retries, with_connect_retries_async};
use crate::auth::{Auth, SignedAuth, Signer, TokenAuth};
use crate::config::Config;
use crate::form::UploadForm;

/// Result of a GET: the JSON body for a 200 (an empty object if the body is
/// empty or not JSON), `None` for anything else.
pub type GetResult = (Option<serde_json::Value>, ResponseInfo);

/// Result of an upload.
#[derive(Debug)]
pub enum UploadOutcome {
    /// The server answered; `info` says whether it was a success.
    Completed(RawResponse, ResponseInfo),
    /// The call failed part way. The response carries status and headers
    /// (no body) when the failure came after the response head arrived.
    Interrupted(Option<RawResponse>, ResponseInfo),
}

impl UploadOutcome {
    pub fn info(&self) -> &ResponseInfo {
        match self {
            UploadOutcome::Completed(_, info) | UploadOutcome::Interrupted(_, info) => info,
        }
    }

    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            UploadOutcome::Completed(response, _) => Some(response),
            UploadOutcome::Interrupted(response, _) => response.as_ref(),
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, UploadOutcome::Interrupted(..))
    }
}

/// The two call shapes, as seen by code issuing storage operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Blocking GET with query parameters.
    ///
    /// Safe to call from async code, but it holds up the calling task until
    /// the response is in.
    fn get(&self, url: &str, params: &[(String, String)], auth: Option<Arc<dyn Auth>>) -> GetResult;

    /// Non-blocking multipart POST.
    async fn post(&self, url: &str, form: UploadForm, auth: Option<Arc<dyn Auth>>) -> UploadOutcome;
}

/// `QiniuRust/<version> (<os>; <arch>; ) Rust/<rustc>`
pub fn user_agent() -> String {
    format!(
        "QiniuRust/{} ({}; {}; ) Rust/{}",
        env!("QINIU_TRANSPORT_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("QINIU_TRANSPORT_RUSTC"),
    )
}

/// Transport backed by pooled reqwest engines.
///
/// The blocking and async engines are each built on first use from the
/// [`Config`] given here, then shared by every call on this client. Share
/// one `HttpClient` (e.g. in an `Arc`) to share the connection pools.
pub struct HttpClient {
    config: Config,
    user_agent: String,
    blocking: OnceLock<reqwest::blocking::Client>,
    blocking_init: Mutex<()>,
    engine: tokio::sync::OnceCell<reqwest::Client>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl HttpClient {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            user_agent: user_agent(),
            blocking: OnceLock::new(),
            blocking_init: Mutex::new(()),
            engine: tokio::sync::OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sends a GET, blocking the calling thread until it completes.
    ///
    /// Inside an async runtime the blocking engine cannot run on the runtime's
    /// thread, so the call is moved to a scoped thread and joined.
    #[tracing::instrument(skip(self, params, auth))]
    pub fn get(&self, url: &str, params: &[(String, String)], auth: Option<&dyn Auth>) -> GetResult {
        if tokio::runtime::Handle::try_current().is_err() {
            return self.get_blocking(url, params, auth);
        }

        debug!("GET {} issued from async context, running it off the runtime thread", url);
        std::thread::scope(|s| s.spawn(|| self.get_blocking(url, params, auth)).join())
            .unwrap_or_else(|_| {
                warn!("GET {} worker thread panicked", url);
                (None, ResponseInfo::from_error(anyhow!("GET worker thread panicked")))
            })
    }

    fn get_blocking(&self, url: &str, params: &[(String, String)], auth: Option<&dyn Auth>) -> GetResult {
        debug!("GET {} with params {:?}...", url, params);

        let response = match self.send_get(url, params, auth) {
            Ok(response) => response,
            Err(e) => {
                warn!("GET {} failed: {:#}", url, e);
                return (None, ResponseInfo::from_error(e));
            }
        };

        let info = ResponseInfo::from_response(&response);
        if !info.ok() {
            return (None, info);
        }

        let result = if response.body.is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            response.json().unwrap_or_else(|e| {
                debug!("GET {} returned a non-JSON body ({}), treating as empty", url, e);
                serde_json::Value::Object(Default::default())
            })
        };
        (Some(result), info)
    }

    /// Encodes `form` and POSTs it without blocking the calling thread.
    #[tracing::instrument(skip(self, form, auth))]
    pub async fn post(&self, url: &str, form: UploadForm, auth: Option<&dyn Auth>) -> UploadOutcome {
        debug!("POST {} (multipart)...", url);

        let mut head = None;
        let result = self.send_post(url, form, auth, &mut head).await;
        match result {
            Ok(response) => {
                let info = ResponseInfo::from_response(&response);
                UploadOutcome::Completed(response, info)
            }
            Err(e) => {
                warn!("POST {} failed: {:#}", url, e);
                UploadOutcome::Interrupted(head, ResponseInfo::from_error(e))
            }
        }
    }

    /// POST authorised with an upload token.
    pub async fn post_with_token(&self, url: &str, form: UploadForm, token: &str) -> UploadOutcome {
        let auth = TokenAuth::new(token);
        self.post(url, form, Some(&auth)).await
    }

    /// POST signed by `signer`.
    pub async fn post_with_auth<S: Signer>(&self, url: &str, form: UploadForm, signer: S) -> UploadOutcome {
        let auth = SignedAuth::new(signer);
        self.post(url, form, Some(&auth)).await
    }

    /// POST whose form already carries its own credentials (e.g. a `token` field).
    pub async fn post_file(&self, url: &str, form: UploadForm) -> UploadOutcome {
        self.post(url, form, None).await
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent).context("Invalid User-Agent")?,
        );
        Ok(headers)
    }

    fn send_get(&self, url: &str, params: &[(String, String)], auth: Option<&dyn Auth>) -> Result<RawResponse> {
        let parsed = if params.is_empty() {
            Url::parse(url)
        } else {
            Url::parse_with_params(url, params)
        };
        let url = parsed.with_context(|| format!("Invalid URL: {}", url))?;
        let request = Request::new(Method::GET, url, self.default_headers()?, Bytes::new());
        let request = apply_auth(request, auth)?;

        let client = self.blocking_engine()?;
        with_connect_retries("GET", self.config.connection_retries, || {
            let mut builder = client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers.clone());
            if !request.body.is_empty() {
                builder = builder.body(request.body.clone());
            }
            let response = builder.send().context("Failed to send request")?;

            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().context("Failed to read response body")?;
            Ok(RawResponse::new(status, headers, body))
        })
    }

    async fn send_post(
        &self,
        url: &str,
        form: UploadForm,
        auth: Option<&dyn Auth>,
        head: &mut Option<RawResponse>,
    ) -> Result<RawResponse> {
        let url = Url::parse(url).with_context(|| format!("Invalid URL: {}", url))?;

        // File payloads may hit the disk; keep that off the scheduler thread.
        let (body, content_type) = tokio::task::spawn_blocking(move || form.encode())
            .await
            .context("Form encoding task failed")??;

        let mut headers = self.default_headers()?;
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&content_type).context("Invalid multipart Content-Type")?,
        );
        let request = apply_auth(Request::new(Method::POST, url, headers, body), auth)?;

        let client = self.async_engine().await?;
        let response = with_connect_retries_async("POST", self.config.connection_retries, || {
            let builder = client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers.clone())
                .body(request.body.clone());
            async move { builder.send().await.context("Failed to send request") }
        })
        .await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        *head = Some(RawResponse::new(status, headers.clone(), Bytes::new()));

        let body = response
            .bytes()
            .await
            .context("Failed to read response body")?;
        Ok(RawResponse::new(status, headers, body))
    }

    fn blocking_engine(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.blocking.get() {
            return Ok(client);
        }

        let _guard = self
            .blocking_init
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = self.blocking.get() {
            return Ok(client);
        }

        debug!(
            "Initialising blocking HTTP engine (pool {}, timeout {}s)",
            self.config.connection_pool, self.config.connection_timeout_secs
        );
        let client = reqwest::blocking::Client::builder()
            .pool_max_idle_per_host(self.config.connection_pool)
            .connect_timeout(self.config.connection_timeout())
            .timeout(self.config.connection_timeout())
            .build()
            .context("Failed to build blocking HTTP client")?;
        Ok(self.blocking.get_or_init(|| client))
    }

    async fn async_engine(&self) -> Result<&reqwest::Client> {
        self.engine
            .get_or_try_init(|| async {
                debug!(
                    "Initialising async HTTP engine (pool {}, connect/read timeout {}s)",
                    self.config.connection_pool, self.config.connection_timeout_secs
                );
                // No total timeout: a large upload may legitimately take longer.
                // A server that goes silent for a whole timeout still fails the call.
                reqwest::Client::builder()
                    .pool_max_idle_per_host(self.config.connection_pool)
                    .connect_timeout(self.config.connection_timeout())
                    .read_timeout(self.config.connection_timeout())
                    .build()
                    .context("Failed to build async HTTP client")
            })
            .await
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        // A blocking client panics if dropped on a runtime thread.
        let Some(client) = self.blocking.take() else {
            return;
        };
        if tokio::runtime::Handle::try_current().is_ok() {
            let _ = std::thread::spawn(move || drop(client)).join();
        }
    }
}

fn apply_auth(request: Request, auth: Option<&dyn Auth>) -> Result<Request> {
    match auth {
        Some(auth) => auth.sign(request),
        None => Ok(request),
    }
}

#[async_trait]
impl Transport for HttpClient {
    fn get(&self, url: &str, params: &[(String, String)], auth: Option<Arc<dyn Auth>>) -> GetResult {
        HttpClient::get(self, url, params, auth.as_deref())
    }

    async fn post(&self, url: &str, form: UploadForm, auth: Option<Arc<dyn Auth>>) -> UploadOutcome {
        HttpClient::post(self, url, form, auth.as_deref()).await
    }
}
