//! Authentication strategies applied to a request just before it is sent.
//!
//! A strategy only ever adds headers; the URL and body it receives are
//! final, so signatures can cover them.

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use std::fmt;

use crate::http::Request;

/// Attaches proof of identity to an outgoing request.
pub trait Auth: Send + Sync {
    fn sign(&self, request: Request) -> Result<Request>;
}

/// Computes the credential for a request, e.g. an access key plus an HMAC
/// over the request's canonical form.
#[cfg_attr(test, mockall::automock)]
pub trait Signer: Send + Sync {
    fn credential(&self, request: &Request) -> Result<String>;
}

/// Sends a pre-issued upload token: `Authorization: UpToken <token>`.
#[derive(Clone)]
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    pub const SCHEME: &'static str = "UpToken";

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuth").field("token", &"***").finish()
    }
}

impl Auth for TokenAuth {
    fn sign(&self, request: Request) -> Result<Request> {
        set_authorization(request, Self::SCHEME, &self.token)
    }
}

/// Delegates to a [`Signer`]: `Authorization: QBox <credential>`.
pub struct SignedAuth<S: Signer> {
    signer: S,
    scheme: String,
}

impl<S: Signer> SignedAuth<S> {
    pub const DEFAULT_SCHEME: &'static str = "QBox";

    pub fn new(signer: S) -> Self {
        Self {
            signer,
            scheme: Self::DEFAULT_SCHEME.to_string(),
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }
}

impl<S: Signer> Auth for SignedAuth<S> {
    fn sign(&self, request: Request) -> Result<Request> {
        let credential = self
            .signer
            .credential(&request)
            .context("Failed to sign request")?;
        set_authorization(request, &self.scheme, &credential)
    }
}

fn set_authorization(mut request: Request, scheme: &str, credential: &str) -> Result<Request> {
    let mut value = HeaderValue::from_str(&format!("{} {}", scheme, credential))
        .context("Credential is not a valid header value")?;
    value.set_sensitive(true);
    request.headers.insert(AUTHORIZATION, value);
    debug!("Attached {} authorization to {} {}", scheme, request.method, request.url);
    Ok(request)
}
