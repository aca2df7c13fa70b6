use percent_encoding::percent_decode_str;
use url::Url;

/// What the user pointed at, before any network lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    /// Numeric page ID, usable directly against the REST API.
    Id(String),
    /// Token of a `/wiki/x/<token>` short link; needs a redirect lookup.
    ShortLink(String),
    /// Page title from a legacy `/wiki/display/<SPACE>/<Title>` URL.
    Title(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub target: PageTarget,
    /// `<scheme>://<host>/wiki` of the URL the reference came from.
    pub base_url: Option<String>,
    pub space_key: Option<String>,
}

impl PageRef {
    fn id(id: &str, base_url: Option<String>, space_key: Option<String>) -> Self {
        Self {
            target: PageTarget::Id(id.to_string()),
            base_url,
            space_key,
        }
    }

    pub fn page_id(&self) -> Option<&str> {
        match &self.target {
            PageTarget::Id(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Cannot parse Confluence URL or page ID: {0}")]
    Unrecognized(String),
}

/// Parse a Confluence page URL or bare page ID.
///
/// Supported shapes:
/// - `123456`
/// - `https://host/wiki/spaces/SPACE/pages/123456/Title`
/// - `https://host/wiki/display/SPACE/Title`
/// - `https://host/wiki/x/AbCdEf`
/// - any URL with `/pages/<id>` in its path or a `pageId=<id>` query
pub fn parse_page_ref(input: &str) -> Result<PageRef, ParseError> {
    let input = input.trim();
    let unrecognized = || ParseError::Unrecognized(input.to_string());

    if is_numeric(input) {
        return Ok(PageRef::id(input, None, None));
    }

    let url = parse_lenient(input).ok_or_else(unrecognized)?;
    let base_url = Some(wiki_base(&url).ok_or_else(unrecognized)?);
    let segments: Vec<&str> = url
        .path_segments()
        .map(|parts| parts.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    for window in segments.windows(5) {
        if let ["wiki", "spaces", space, "pages", id] = window {
            if is_numeric(id) {
                return Ok(PageRef::id(id, base_url, Some((*space).to_string())));
            }
        }
    }

    for window in segments.windows(4) {
        if let ["wiki", "display", space, title] = window {
            return Ok(PageRef {
                target: PageTarget::Title(decode_title(title)),
                base_url,
                space_key: Some((*space).to_string()),
            });
        }
    }

    for window in segments.windows(3) {
        if let ["wiki", "x", token] = window {
            if is_short_token(token) {
                return Ok(PageRef {
                    target: PageTarget::ShortLink((*token).to_string()),
                    base_url,
                    space_key: None,
                });
            }
        }
    }

    for window in segments.windows(2) {
        if let ["pages", id] = window {
            if is_numeric(id) {
                return Ok(PageRef::id(id, base_url, None));
            }
        }
    }

    let query_id = url
        .query_pairs()
        .find(|(key, value)| key == "pageId" && is_numeric(value))
        .map(|(_, value)| value.into_owned());
    if let Some(id) = query_id {
        return Ok(PageRef::id(&id, base_url, None));
    }

    Err(unrecognized())
}

fn parse_lenient(input: &str) -> Option<Url> {
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) if url.has_host() => Some(url),
        _ => Url::parse(&format!("https://{input}"))
            .ok()
            .filter(Url::has_host),
    }
}

fn wiki_base(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    Some(format!("{}://{host}{port}/wiki", url.scheme()))
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_short_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn decode_title(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::{decode_title, is_short_token, wiki_base};
    use url::Url;

    #[test]
    fn title_decoding_handles_plus_and_escapes() {
        assert_eq!(decode_title("Release+Notes%3A+2024"), "Release Notes: 2024");
    }

    #[test]
    fn wiki_base_keeps_explicit_port() {
        let url = Url::parse("http://localhost:8090/wiki/x/abc").unwrap();
        assert_eq!(wiki_base(&url).unwrap(), "http://localhost:8090/wiki");
    }

    #[test]
    fn short_tokens_reject_punctuation() {
        assert!(is_short_token("AbC-d_9"));
        assert!(!is_short_token("a.b"));
        assert!(!is_short_token(""));
    }
}
