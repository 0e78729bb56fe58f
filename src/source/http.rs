//! HTTP media source
//!
//! Any `http(s)` URL is a single item described by a `HEAD` request. URLs whose
//! path ends in `.m3u` or `.m3u8` are playlists whose entries become collection
//! members.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Client, StatusCode, Url, header};
use std::time::Duration;
use tracing::debug;

use super::{
    Collection, Encoding, MediaSource, MemberRef, ResolvedItem, Result, SourceError, SourceStream,
    m3u,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
            user_agent: format!("importbox/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// [`MediaSource`] backed by plain HTTP downloads
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        Ok(Self { client })
    }

    /// Describe a URL as a single-encoding item
    async fn describe(&self, url: Url, title: Option<&str>) -> Result<ResolvedItem> {
        debug!(%url, "Describing media item");

        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!("{url} returned {status}")));
        }

        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let declared_byte_length = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let title = title
            .map(str::to_owned)
            .unwrap_or_else(|| m3u::title_from_url(&url));

        Ok(ResolvedItem {
            source_id: m3u::source_id_for(&url),
            title,
            locator: url.to_string(),
            encodings: vec![Encoding {
                has_audio: carries_audio(&mime_type),
                mime_type,
                quality_rank: 0,
                declared_byte_length,
            }],
        })
    }
}

/// Audio and video containers are both treated as audio-capable
fn carries_audio(mime_type: &str) -> bool {
    let lower = mime_type.trim().to_ascii_lowercase();
    lower.starts_with("audio/") || lower.starts_with("video/")
}

fn parse_reference(reference: &str) -> Result<Url> {
    let url = Url::parse(reference.trim())
        .map_err(|e| SourceError::InvalidReference(format!("{reference}: {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(SourceError::InvalidReference(format!(
            "unsupported scheme '{scheme}'"
        ))),
    }
}

fn is_playlist(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    path.ends_with(".m3u") || path.ends_with(".m3u8")
}

#[async_trait]
impl MediaSource for HttpSource {
    async fn resolve_collection(&self, reference: &str) -> Result<Collection> {
        let url = parse_reference(reference)?;
        if !is_playlist(&url) {
            return Err(SourceError::NotACollection);
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::Unavailable(format!("playlist {url} not found")));
        }

        let body = response
            .error_for_status()
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?
            .text()
            .await
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;

        let members = m3u::parse(&url, &body);
        debug!(%url, members = members.len(), "Parsed playlist");

        Ok(Collection {
            title: m3u::title_from_url(&url),
            members,
        })
    }

    async fn resolve_single(&self, reference: &str) -> Result<ResolvedItem> {
        let url = parse_reference(reference)?;
        self.describe(url, None).await
    }

    async fn materialize(&self, member: &MemberRef) -> Result<ResolvedItem> {
        let url = parse_reference(&member.locator)?;
        self.describe(url, Some(&member.title)).await
    }

    async fn open_stream(&self, item: &ResolvedItem, encoding: &Encoding) -> Result<SourceStream> {
        debug!(locator = %item.locator, mime = %encoding.mime_type, "Opening stream");

        let response = self
            .client
            .get(&item.locator)
            .send()
            .await
            .map_err(|e| SourceError::StreamFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| SourceError::StreamFailed(e.to_string()))?;

        let declared_length = response.content_length().filter(|len| *len > 0);
        let stream = response
            .bytes_stream()
            .map_err(std::io::Error::other);

        Ok(SourceStream {
            reader: Box::new(tokio_util::io::StreamReader::new(stream)),
            declared_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference_rejects_non_http() {
        assert!(matches!(
            parse_reference("ftp://example.com/a.mp3"),
            Err(SourceError::InvalidReference(_))
        ));
        assert!(matches!(
            parse_reference("not a url"),
            Err(SourceError::InvalidReference(_))
        ));
        assert!(parse_reference(" https://example.com/a.mp3 ").is_ok());
    }

    #[test]
    fn test_playlist_detection() {
        let playlist = Url::parse("https://example.com/mix.M3U8?token=1").unwrap();
        let single = Url::parse("https://example.com/song.mp3").unwrap();

        assert!(is_playlist(&playlist));
        assert!(!is_playlist(&single));
    }

    #[test]
    fn test_carries_audio() {
        assert!(carries_audio("audio/mp4"));
        assert!(carries_audio("video/webm; codecs=\"vp9, opus\""));
        assert!(!carries_audio("image/png"));
        assert!(!carries_audio(DEFAULT_CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_single_url_is_not_a_collection() {
        let source = HttpSource::new(HttpConfig::default()).unwrap();
        let result = source.resolve_collection("https://example.com/song.mp3").await;
        assert!(matches!(result, Err(SourceError::NotACollection)));
    }
}
