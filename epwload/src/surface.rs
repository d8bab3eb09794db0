use std::collections::HashMap;

use crate::context::SplashResource;

/// Where the loader presents progress.
pub trait Surface {
    fn clear(&mut self);

    fn show_splash(&mut self, splash: &SplashResource);

    fn show_error(&mut self, message: &str, detail: &str);
}

/// Surfaces by container id.
pub trait Surfaces {
    type Surface: Surface;

    /// Claim the surface registered as `id`.
    fn take(&mut self, id: &str) -> Option<Self::Surface>;

    /// Hand a surface back after a failed load, so the load can be retried.
    fn restore(&mut self, id: &str, surface: Self::Surface);
}

impl<S: Surface> Surfaces for HashMap<String, S> {
    type Surface = S;

    fn take(&mut self, id: &str) -> Option<S> { self.remove(id) }

    fn restore(&mut self, id: &str, surface: S) { self.insert(id.to_string(), surface); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Blank(u8);
    impl Surface for Blank {
        fn clear(&mut self) {}

        fn show_splash(&mut self, _: &SplashResource) {}

        fn show_error(&mut self, _: &str, _: &str) {}
    }

    #[test]
    fn take_then_restore() {
        let mut surfaces = HashMap::from([("game".to_string(), Blank(7))]);
        let surface = surfaces.take("game").unwrap();
        assert!(surfaces.take("game").is_none());
        surfaces.restore("game", surface);
        assert_eq!(surfaces.take("game"), Some(Blank(7)));
    }
}
