use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{LoadError, LoadResult};

pub const CONTAINER_KEY: &str = "container";
pub const ASSETS_KEY: &str = "assetsURI";
pub const SPLASH_OVERRIDE_KEY: &str = "splashURL";

/// Where the archive comes from: a locator string or a list of asset
/// records, of which the first is used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SourceLocator {
    Uri(String),
    Records(Vec<AssetRecord>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetRecord {
    pub url:   String,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Options handed to the loader by the host. Keys other than `container`
/// and `assetsURI` are passed through untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoaderOptions {
    pub container:  String,
    #[serde(rename = "assetsURI")]
    pub assets_uri: SourceLocator,
    #[serde(flatten)]
    pub extra:      IndexMap<String, Value>,
}

impl LoaderOptions {
    pub fn new(container: impl Into<String>, locator: impl Into<String>) -> Self {
        LoaderOptions {
            container:  container.into(),
            assets_uri: SourceLocator::Uri(locator.into()),
            extra:      IndexMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn from_json(text: &str) -> LoadResult<Self> {
        let options: LoaderOptions =
            serde_json::from_str(text).map_err(|e| LoadError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_value(value: Value) -> LoadResult<Self> {
        let options: LoaderOptions =
            serde_json::from_value(value).map_err(|e| LoadError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Every check that doesn't need I/O.
    pub fn validate(&self) -> LoadResult<()> {
        if self.container.trim().is_empty() {
            return Err(LoadError::Config(format!("{} is empty", CONTAINER_KEY)));
        }
        self.locator().map(|_| ())
    }

    pub fn locator(&self) -> LoadResult<&str> {
        let locator = match &self.assets_uri {
            SourceLocator::Uri(uri) => uri.as_str(),
            SourceLocator::Records(records) => records
                .first()
                .map(|record| record.url.as_str())
                .ok_or_else(|| LoadError::Config(format!("{} has no records", ASSETS_KEY)))?,
        };
        if locator.trim().is_empty() {
            return Err(LoadError::Config(format!("{} is empty", ASSETS_KEY)));
        }
        Ok(locator)
    }

    /// Options passed on to the runtime.
    pub fn residual(&self) -> IndexMap<String, Value> {
        self.extra
            .iter()
            .filter(|(key, _)| key.as_str() != CONTAINER_KEY && key.as_str() != ASSETS_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn splash_override(&self) -> Option<&str> {
        self.extra
            .get(SPLASH_OVERRIDE_KEY)
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumPolicy {
    /// Log mismatching entries and keep loading.
    #[default]
    Warn,
    /// Fail when an extracted component mismatches.
    Enforce,
}

/// Paths of the loader components inside directory archives. A name
/// without an extension matches the first entry with that file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPaths {
    pub splash:    String,
    pub script:    String,
    pub secondary: String,
}
impl Default for ComponentPaths {
    fn default() -> Self {
        ComponentPaths {
            splash:    "splash".into(),
            script:    "loader.js".into(),
            secondary: "loader.wasm".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub checksum_policy:  ChecksumPolicy,
    /// Keep the raw archive in the hand-off context.
    pub retain_archive:   bool,
    pub fetch_timeout:    Option<Duration>,
    pub prefetch_timeout: Duration,
    pub components:       ComponentPaths,
}
impl Default for LoaderSettings {
    fn default() -> Self {
        LoaderSettings {
            checksum_policy:  ChecksumPolicy::default(),
            retain_archive:   false,
            fetch_timeout:    None,
            prefetch_timeout: Duration::from_millis(300),
            components:       ComponentPaths::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn residual_keeps_order_and_drops_consumed_keys() {
        let options = LoaderOptions::from_json(
            r#"{"container":"game","zeta":1,"assetsURI":"assets.epw","alpha":{"b":2},"splashURL":"s.png"}"#,
        )
        .unwrap();
        assert_eq!(options.container, "game");
        assert_eq!(options.locator().unwrap(), "assets.epw");
        let residual = options.residual();
        assert_eq!(residual.keys().collect::<Vec<_>>(), ["zeta", "alpha", "splashURL"]);
        assert_eq!(residual["alpha"], json!({"b": 2}));
        assert_eq!(options.splash_override(), Some("s.png"));
    }

    #[test]
    fn first_record_is_the_locator() {
        let options = LoaderOptions::from_value(json!({
            "container": "game",
            "assetsURI": [{"url": "a.epw", "path": "/"}, {"url": "b.epw"}],
        }))
        .unwrap();
        assert_eq!(options.locator().unwrap(), "a.epw");
        assert!(options.residual().is_empty());
    }

    #[test]
    fn invalid_options() {
        for value in [
            json!({"assetsURI": "a.epw"}),
            json!({"container": 1, "assetsURI": "a.epw"}),
            json!({"container": "game"}),
            json!({"container": "game", "assetsURI": 3}),
            json!({"container": "game", "assetsURI": []}),
            json!({"container": "game", "assetsURI": [{"path": "/"}]}),
            json!({"container": "", "assetsURI": "a.epw"}),
            json!({"container": "game", "assetsURI": " "}),
        ] {
            assert!(
                matches!(LoaderOptions::from_value(value.clone()), Err(LoadError::Config(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn blank_splash_override_is_ignored() {
        let options = LoaderOptions::new("game", "a.epw").with_option(SPLASH_OVERRIDE_KEY, " ");
        assert_eq!(options.splash_override(), None);
        let options = LoaderOptions::new("game", "a.epw").with_option(SPLASH_OVERRIDE_KEY, json!(null));
        assert_eq!(options.splash_override(), None);
    }
}
