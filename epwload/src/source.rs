use std::{
    fmt,
    fs::File,
    ops::Deref,
    path::{Path, PathBuf},
    time::Duration,
};

use ::base64::{engine::general_purpose::STANDARD, Engine};
use memmap2::Mmap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::{LoadError, LoadResult};

pub const DATA_PREFIX: &str = "data:application/octet-stream;base64,";

/// A parsed archive locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Base64 payload following [`DATA_PREFIX`].
    Inline(String),
    Remote(Url),
    Local(PathBuf),
}

/// Acquired bytes, either owned or a read-only file mapping.
#[derive(Debug)]
pub enum Acquired {
    Owned(Vec<u8>),
    Mapped(Mmap),
}
impl Acquired {
    pub fn into_vec(self) -> Vec<u8> {
        match self {
            Acquired::Owned(bytes) => bytes,
            Acquired::Mapped(map) => map.to_vec(),
        }
    }
}
impl Deref for Acquired {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Acquired::Owned(bytes) => bytes,
            Acquired::Mapped(map) => map,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Inline(payload) => write!(f, "<data: {} chars>", payload.len() + DATA_PREFIX.len()),
            Source::Remote(url) => write!(f, "{}", url),
            Source::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Source {
    pub fn parse(locator: &str) -> LoadResult<Self> {
        if let Some(payload) = locator.strip_prefix(DATA_PREFIX) {
            return Ok(Source::Inline(payload.to_string()));
        }
        if locator.starts_with("data:") {
            return Err(LoadError::acquisition(
                "<data>",
                "only application/octet-stream base64 data URIs are supported",
            ));
        }
        if locator.starts_with("http://") || locator.starts_with("https://") {
            let url = Url::parse(locator).map_err(|e| LoadError::acquisition(locator, e))?;
            return Ok(Source::Remote(url));
        }
        if locator.starts_with("file://") {
            let path = Url::parse(locator)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| LoadError::acquisition(locator, "not a local file url"))?;
            return Ok(Source::Local(path));
        }
        Ok(Source::Local(PathBuf::from(locator)))
    }

    /// Fetch the bytes, racing `timeout` and `token`.
    pub async fn acquire(
        &self, token: &CancellationToken, timeout: Option<Duration>,
    ) -> LoadResult<Acquired> {
        let fetch = async {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, self.fetch()).await {
                    Ok(result) => result,
                    Err(_) => Err(LoadError::acquisition(
                        self.to_string(),
                        format!("timed out after {:?}", limit),
                    )),
                },
                None => self.fetch().await,
            }
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(LoadError::Cancelled),
            result = fetch => result,
        }
    }

    pub async fn fetch(&self) -> LoadResult<Acquired> {
        match self {
            Source::Inline(payload) => decode_inline(payload).map(Acquired::Owned),
            Source::Remote(url) => fetch_remote(url).await.map(Acquired::Owned),
            Source::Local(path) => map_file(path),
        }
    }
}

/// Decode with the native engine, falling back to the lenient decoder for
/// URL-safe payloads.
pub fn decode_inline(payload: &str) -> LoadResult<Vec<u8>> {
    match STANDARD.decode(payload) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            warn!(error = %e, "native base64 decode failed, falling back to manual decode");
            Ok(crate::base64::decode(payload.as_bytes())?)
        }
    }
}

#[cfg(feature = "remote")]
async fn fetch_remote(url: &Url) -> LoadResult<Vec<u8>> {
    debug!(%url, "fetching");
    let failed = |e: reqwest::Error| LoadError::acquisition(url.as_str(), e);
    let response = reqwest::get(url.clone())
        .await
        .and_then(|response| response.error_for_status())
        .map_err(failed)?;
    let bytes = response.bytes().await.map_err(failed)?;
    Ok(bytes.to_vec())
}

#[cfg(not(feature = "remote"))]
async fn fetch_remote(url: &Url) -> LoadResult<Vec<u8>> {
    Err(LoadError::acquisition(
        url.as_str(),
        "remote sources are not supported by this build",
    ))
}

fn map_file(path: &Path) -> LoadResult<Acquired> {
    debug!(path = %path.display(), "mapping");
    let failed = |e: std::io::Error| LoadError::acquisition(path.display().to_string(), e);
    let file = File::open(path).map_err(failed)?;
    if file.metadata().map_err(failed)?.len() == 0 {
        return Ok(Acquired::Owned(Vec::new()));
    }
    // the mapping is read-only and dropped before the load returns
    let map = unsafe { Mmap::map(&file) }.map_err(failed)?;
    Ok(Acquired::Mapped(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locators() {
        assert_eq!(
            Source::parse("data:application/octet-stream;base64,aGk=").unwrap(),
            Source::Inline("aGk=".into())
        );
        assert!(matches!(
            Source::parse("https://example.com/assets.epw").unwrap(),
            Source::Remote(url) if url.path() == "/assets.epw"
        ));
        assert_eq!(
            Source::parse("assets/a.epw").unwrap(),
            Source::Local(Path::new("assets/a.epw").into())
        );
        assert!(matches!(
            Source::parse("data:image/png;base64,aGk="),
            Err(LoadError::AcquisitionFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn file_urls() {
        assert_eq!(
            Source::parse("file:///tmp/assets.epw").unwrap(),
            Source::Local(Path::new("/tmp/assets.epw").into())
        );
    }

    #[test]
    fn inline_sources_hide_the_payload() {
        let source = Source::parse("data:application/octet-stream;base64,aGk=").unwrap();
        assert_eq!(source.to_string(), "<data: 41 chars>");
    }

    #[test]
    fn url_safe_payloads_fall_back() {
        assert_eq!(decode_inline("-_-_").unwrap(), [0xfb, 0xff, 0xbf]);
        assert_eq!(decode_inline("aGk=").unwrap(), b"hi");
        assert!(matches!(decode_inline("aGk"), Err(LoadError::InvalidEncoding(_))));
    }

    #[tokio::test]
    async fn cancelled_before_completion() {
        let token = CancellationToken::new();
        token.cancel();
        let source = Source::parse("data:application/octet-stream;base64,aGk=").unwrap();
        assert!(matches!(
            source.acquire(&token, None).await,
            Err(LoadError::Cancelled)
        ));
    }
}
