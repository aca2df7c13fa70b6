use std::fmt;

use c2md_core::is_image_filename;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub media_type: String,
    pub download_url: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        is_image_filename(&self.filename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageData {
    pub page_id: String,
    pub title: String,
    /// Storage-format body.
    pub html: String,
    pub url: String,
    pub version: Option<u64>,
    pub attachments: Vec<Attachment>,
}

impl PageData {
    pub fn image_attachments(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_image())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    NotFound,
    HttpStatus(u16),
    Timeout,
    Network,
    Decode,
    ShortLinkUnresolved,
    Io,
}

impl FailureKind {
    /// Failures worth another attempt: transport problems, server errors and
    /// rate limiting. Client errors are final.
    pub fn is_transient(&self) -> bool {
        match self {
            FailureKind::Timeout | FailureKind::Network => true,
            FailureKind::HttpStatus(code) => *code >= 500 || *code == 429,
            _ => false,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::NotFound => write!(f, "not found"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response body"),
            FailureKind::ShortLinkUnresolved => write!(f, "short link unresolved"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}
