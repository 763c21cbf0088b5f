pub mod auth;
pub mod commands;
pub mod config;
pub mod form;
pub mod http;

pub use auth::{Auth, SignedAuth, Signer, TokenAuth};
pub use config::Config;
pub use form::{FileAttachment, UploadForm};
pub use http::{HttpClient, ResponseInfo, Transport, UploadOutcome};
