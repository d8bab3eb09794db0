use indexmap::IndexMap;
use serde_json::Value;

pub const SCRIPT_MIME: &str = "text/javascript;charset=utf-8";
pub const SECONDARY_MIME: &str = "application/wasm";

/// An extracted payload the runtime loads by MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadableUnit {
    pub bytes: Vec<u8>,
    pub mime:  &'static str,
}
impl LoadableUnit {
    pub fn script(bytes: Vec<u8>) -> Self {
        LoadableUnit {
            bytes,
            mime: SCRIPT_MIME,
        }
    }

    pub fn secondary(bytes: Vec<u8>) -> Self {
        LoadableUnit {
            bytes,
            mime: SECONDARY_MIME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplashOrigin {
    Archive,
    /// Preloaded from the `splashURL` option.
    Override(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplashResource {
    pub bytes:  Vec<u8>,
    /// `None` when the archive doesn't say and the bytes can't be sniffed.
    pub mime:   Option<String>,
    pub origin: SplashOrigin,
}

/// Everything the runtime receives after a successful load. Buffers are
/// owned, the archive itself is only kept on request.
#[derive(Debug)]
pub struct LoaderContext<S> {
    pub surface:   S,
    pub options:   IndexMap<String, Value>,
    pub archive:   Option<Vec<u8>>,
    pub script:    LoadableUnit,
    pub secondary: LoadableUnit,
    pub splash:    SplashResource,
}
