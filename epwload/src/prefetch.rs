use std::time::Duration;

#[cfg(feature = "prefetch")]
use crate::source::Source;

/// Preload the splash override at `url`, giving up after `limit`. Failures
/// and timeouts resolve to `None`.
#[cfg(feature = "prefetch")]
pub async fn preload(url: &str, limit: Duration) -> Option<Vec<u8>> {
    let source = match Source::parse(url) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(%url, error = %e, "failed to preload splash override");
            return None;
        }
    };
    match tokio::time::timeout(limit, source.fetch()).await {
        Ok(Ok(bytes)) if !bytes.is_empty() => Some(bytes.into_vec()),
        Ok(Ok(_)) => {
            tracing::warn!(%url, "splash override is empty");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!(%url, error = %e, "failed to preload splash override");
            None
        }
        Err(_) => {
            tracing::warn!(%url, ?limit, "splash override preload timed out");
            None
        }
    }
}

#[cfg(not(feature = "prefetch"))]
#[inline(always)]
pub async fn preload(_: &str, _: Duration) -> Option<Vec<u8>> { None }

#[cfg(all(test, feature = "prefetch"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_override() {
        let bytes = preload("data:application/octet-stream;base64,aGk=", Duration::from_millis(300)).await;
        assert_eq!(bytes.as_deref(), Some(&b"hi"[..]));
    }

    #[tokio::test]
    async fn missing_override() {
        let missing = preload("/nonexistent/splash.png", Duration::from_millis(300)).await;
        assert_eq!(missing, None);
        let empty = preload("data:application/octet-stream;base64,", Duration::from_millis(300)).await;
        assert_eq!(empty, None);
    }
}
