use epw::{mime::guess_mime, Archive};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::{LoaderOptions, LoaderSettings},
    context::{LoaderContext, SplashOrigin, SplashResource},
    error::{LoadError, LoadResult, RETRY_HINT},
    extract::{extract, Extracted},
    prefetch,
    source::Source,
    surface::{Surface, Surfaces},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Acquiring,
    Validating,
    Extracting,
    Done,
    Failed,
}

/// Acquires, validates and extracts archives into a [`LoaderContext`].
///
/// `load` borrows the loader mutably, so a loader runs one load at a time.
/// A failed load returns its surface, so the same loader can retry.
pub struct Loader<T: Surfaces> {
    surfaces: T,
    settings: LoaderSettings,
    state:    LoadState,
    token:    CancellationToken,
}

impl<T: Surfaces> Loader<T> {
    pub fn new(surfaces: T, settings: LoaderSettings) -> Self {
        Loader {
            surfaces,
            settings,
            state: LoadState::Idle,
            token: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> LoadState { self.state }

    pub fn settings(&self) -> &LoaderSettings { &self.settings }

    /// Token cancelling the current and every later acquisition of this
    /// loader.
    pub fn cancellation_token(&self) -> CancellationToken { self.token.clone() }

    pub async fn load(&mut self, options: &LoaderOptions) -> LoadResult<LoaderContext<T::Surface>> {
        let result = self.run(options).await;
        self.state = match result {
            Ok(_) => LoadState::Done,
            Err(_) => LoadState::Failed,
        };
        result
    }

    async fn run(&mut self, options: &LoaderOptions) -> LoadResult<LoaderContext<T::Surface>> {
        options.validate()?;
        let locator = options.locator()?;
        let mut surface = self
            .surfaces
            .take(&options.container)
            .ok_or_else(|| LoadError::UnknownContainer(options.container.clone()))?;
        surface.clear();

        match self.acquire_and_extract(locator).await {
            Ok((archive, extracted)) => {
                let splash = self.resolve_splash(options, extracted.splash).await;
                info!(origin = ?splash.origin, mime = ?splash.mime, "splash resolved");
                surface.show_splash(&splash);
                Ok(LoaderContext {
                    surface,
                    options: options.residual(),
                    archive,
                    script: extracted.script,
                    secondary: extracted.secondary,
                    splash,
                })
            }
            Err(e) => {
                error!(error = %e, "load failed");
                if let Some(stage) = e.stage() {
                    surface.clear();
                    surface.show_error(stage.message(), RETRY_HINT);
                }
                self.surfaces.restore(&options.container, surface);
                Err(e)
            }
        }
    }

    async fn acquire_and_extract(&mut self, locator: &str) -> LoadResult<(Option<Vec<u8>>, Extracted)> {
        self.state = LoadState::Acquiring;
        let source = Source::parse(locator)?;
        info!(%source, "downloading archive");
        let bytes = source
            .acquire(&self.token.child_token(), self.settings.fetch_timeout)
            .await?;
        if bytes.is_empty() {
            return Err(LoadError::acquisition(source.to_string(), "archive is empty"));
        }

        self.state = LoadState::Validating;
        let archive = Archive::parse(&bytes)?;
        info!(layout = archive.layout().name(), length = archive.len(), "archive validated");
        for failure in archive.checksum_failures() {
            warn!(%failure, "archive entry is corrupted");
        }

        self.state = LoadState::Extracting;
        let extracted = extract(&archive, &self.settings.components, self.settings.checksum_policy)?;
        drop(archive);

        let retained = self.settings.retain_archive.then(|| bytes.into_vec());
        Ok((retained, extracted))
    }

    async fn resolve_splash(&self, options: &LoaderOptions, splash: SplashResource) -> SplashResource {
        let Some(url) = options.splash_override() else {
            return splash;
        };
        match prefetch::preload(url, self.settings.prefetch_timeout).await {
            Some(bytes) => {
                info!(%url, "using splash override");
                SplashResource {
                    mime: guess_mime(&bytes, Some(url)).map(String::from),
                    bytes,
                    origin: SplashOrigin::Override(url.to_string()),
                }
            }
            None => {
                warn!(%url, "splash override failed to preload, using the archive splash");
                splash
            }
        }
    }
}
