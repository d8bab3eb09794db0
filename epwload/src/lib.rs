//! Load-time side of EPW archives: acquire the archive from a data URI, a
//! URL or a local file, validate it and hand the extracted components to
//! the runtime.

pub mod base64;
pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod loader;
pub mod prefetch;
pub mod source;
pub mod surface;

pub use config::{ChecksumPolicy, ComponentPaths, LoaderOptions, LoaderSettings, SourceLocator};
pub use context::{LoadableUnit, LoaderContext, SplashOrigin, SplashResource};
pub use error::{FailureStage, LoadError, LoadResult};
pub use loader::{LoadState, Loader};
pub use source::{Acquired, Source};
pub use surface::{Surface, Surfaces};
