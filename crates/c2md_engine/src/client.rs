use std::path::{Path, PathBuf};
use std::time::Duration;

use c2md_core::{parse_page_ref, safe_attachment_name};
use c2md_logging::{c2md_debug, c2md_info, c2md_warn};
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use url::Url;

use crate::api::{AttachmentPage, ContentSearch, PageResponse};
use crate::persist::{AtomicFileWriter, PersistError};
use crate::{Attachment, FailureKind, FetchError, PageData, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Confluence Cloud: account e-mail plus API token.
    Basic { username: String, token: String },
    /// Data Center personal access token.
    Bearer(String),
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Site root including the `/wiki` context path, no trailing slash.
    pub base_url: String,
    pub auth: Auth,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    pub retry: RetryPolicy,
    pub max_attachment_pages: usize,
}

impl ClientSettings {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            max_attachment_pages: 20,
        }
    }
}

/// Where pages come from. `ConfluenceClient` talks to the REST API; tests
/// substitute canned pages.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page_id: &str) -> Result<PageData, FetchError>;

    async fn resolve_short_link(&self, token: &str) -> Result<String, FetchError>;

    async fn resolve_title(&self, space_key: &str, title: &str) -> Result<String, FetchError>;

    async fn download_attachment(
        &self,
        attachment: &Attachment,
        dest_dir: &Path,
    ) -> Result<PathBuf, FetchError>;
}

const STORAGE_QUERY: &[(&str, &str)] = &[("body-format", "storage")];

#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    settings: ClientSettings,
    http: reqwest::Client,
}

impl ConfluenceClient {
    pub fn new(settings: ClientSettings) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, http })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, FetchError> {
        let mut url = Url::parse(&format!("{}/{}", self.settings.base_url, path))
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn get(&self, url: Url, timeout: Duration) -> reqwest::RequestBuilder {
        let request = self.http.get(url).timeout(timeout);
        match &self.settings.auth {
            Auth::Basic { username, token } => request.basic_auth(username, Some(token)),
            Auth::Bearer(token) => request.bearer_auth(token),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        c2md_debug!("GET {}", url);
        let response = self
            .get(url, self.settings.request_timeout)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&body)
            .map_err(|err| FetchError::new(FailureKind::Decode, err.to_string()))
    }

    async fn fetch_attachments(&self, page_id: &str) -> Vec<Attachment> {
        let mut attachments = Vec::new();
        let mut next = match self.endpoint(&format!("api/v2/pages/{page_id}/attachments"), &[]) {
            Ok(url) => Some(url),
            Err(err) => {
                c2md_warn!("Cannot list attachments of page {}: {}", page_id, err);
                None
            }
        };

        let mut pages = 0;
        while let Some(url) = next.take() {
            if pages >= self.settings.max_attachment_pages {
                c2md_warn!(
                    "Attachment listing of page {} stopped after {} pages",
                    page_id,
                    pages
                );
                break;
            }
            pages += 1;

            let current = &url;
            let listed: AttachmentPage = match self
                .settings
                .retry
                .run("list attachments", move || self.get_json(current.clone()))
                .await
            {
                Ok(listed) => listed,
                Err(err) => {
                    c2md_warn!("Cannot list attachments of page {}: {}", page_id, err);
                    break;
                }
            };

            attachments.extend(listed.results.into_iter().map(|item| Attachment {
                download_url: self.absolute(&item.download_link),
                filename: item.title,
                media_type: item.media_type,
            }));

            next = listed
                .links
                .next
                .as_deref()
                .and_then(|cursor| url.join(cursor).ok());
        }

        attachments
    }

    /// Links in API payloads are relative to the site root.
    fn absolute(&self, link: &str) -> String {
        if link.is_empty() || link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}{}", self.settings.base_url, link)
        }
    }
}

#[async_trait::async_trait]
impl PageSource for ConfluenceClient {
    async fn fetch_page(&self, page_id: &str) -> Result<PageData, FetchError> {
        let url = self.endpoint(&format!("api/v2/pages/{page_id}"), STORAGE_QUERY)?;
        let url = &url;
        let page: PageResponse = self
            .settings
            .retry
            .run("fetch page", move || self.get_json(url.clone()))
            .await
            .map_err(|err| match err.kind {
                FailureKind::HttpStatus(404) => FetchError::new(
                    FailureKind::NotFound,
                    format!("Page not found: {page_id}"),
                ),
                FailureKind::HttpStatus(code) => FetchError::new(
                    FailureKind::HttpStatus(code),
                    format!("Failed to fetch page {page_id}: HTTP {code}"),
                ),
                _ => err,
            })?;

        let html = page.storage_html().to_string();
        let url = match (page.links.base.as_deref(), page.links.webui.as_deref()) {
            (Some(base), Some(webui)) => format!("{base}{webui}"),
            _ => format!("{}/pages/{}", self.settings.base_url, page_id),
        };
        c2md_info!("Fetched page {} ({} bytes of storage markup)", page_id, html.len());

        let attachments = self.fetch_attachments(page_id).await;

        Ok(PageData {
            page_id: page_id.to_string(),
            title: page.title,
            html,
            url,
            version: page.version.map(|v| v.number),
            attachments,
        })
    }

    async fn resolve_short_link(&self, token: &str) -> Result<String, FetchError> {
        let url = self.endpoint(&format!("x/{token}"), &[])?;
        let response = self
            .get(url, self.settings.request_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("Failed to resolve short link: {token}"),
            ));
        }

        let final_url = response.url().to_string();
        c2md_debug!("Short link {} resolved to {}", token, final_url);
        parse_page_ref(&final_url)
            .ok()
            .and_then(|page_ref| page_ref.page_id().map(str::to_string))
            .ok_or_else(|| {
                FetchError::new(
                    FailureKind::ShortLinkUnresolved,
                    format!("Could not extract page ID from resolved URL: {final_url}"),
                )
            })
    }

    async fn resolve_title(&self, space_key: &str, title: &str) -> Result<String, FetchError> {
        let url = self.endpoint(
            "rest/api/content",
            &[("spaceKey", space_key), ("title", title), ("type", "page")],
        )?;
        let url = &url;
        let found: ContentSearch = self
            .settings
            .retry
            .run("look up page title", move || self.get_json(url.clone()))
            .await?;

        found
            .results
            .into_iter()
            .next()
            .map(|summary| summary.id)
            .ok_or_else(|| {
                FetchError::new(
                    FailureKind::NotFound,
                    format!("Page not found: {title} in space {space_key}"),
                )
            })
    }

    async fn download_attachment(
        &self,
        attachment: &Attachment,
        dest_dir: &Path,
    ) -> Result<PathBuf, FetchError> {
        let name = safe_attachment_name(&attachment.filename).ok_or_else(|| {
            FetchError::new(
                FailureKind::Io,
                format!("Refusing to write attachment named {:?}", attachment.filename),
            )
        })?;
        let url = Url::parse(&attachment.download_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let response = self
            .get(url, self.settings.download_timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("Failed to download {}: HTTP {}", name, status.as_u16()),
            ));
        }

        let writer = AtomicFileWriter::new(dest_dir.to_path_buf());
        let mut staged = writer.stage().map_err(persist_error)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            staged.append(&chunk).map_err(persist_error)?;
        }
        let path = staged.commit(&name).map_err(persist_error)?;
        c2md_debug!("Saved attachment {}", path.display());
        Ok(path)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

fn persist_error(err: PersistError) -> FetchError {
    FetchError::new(FailureKind::Io, err.to_string())
}
