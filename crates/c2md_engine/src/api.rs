//! Wire shapes of the Confluence REST responses this tool reads.
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub(crate) struct PageResponse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<PageBody>,
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default, rename = "_links")]
    pub links: Links,
}

impl PageResponse {
    pub fn storage_html(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|b| b.storage.as_ref())
            .map(|s| s.value.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageBody {
    #[serde(default)]
    pub storage: Option<StorageBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StorageBody {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Version {
    pub number: u64,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Links {
    pub webui: Option<String>,
    pub base: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachmentPage {
    #[serde(default)]
    pub results: Vec<AttachmentItem>,
    #[serde(default, rename = "_links")]
    pub links: Links,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttachmentItem {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "mediaType")]
    pub media_type: String,
    #[serde(default, rename = "downloadLink")]
    pub download_link: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentSearch {
    #[serde(default)]
    pub results: Vec<ContentSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// Content IDs are strings in the REST API, but some proxies and older
/// servers hand them out as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
