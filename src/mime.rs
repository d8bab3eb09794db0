use std::path::Path;

use image::ImageFormat;

/// Resolve the MIME type of an image, from its magic bytes first and its
/// file name second.
pub fn guess_mime(data: &[u8], name: Option<&str>) -> Option<&'static str> {
    image::guess_format(data)
        .ok()
        .or_else(|| name.and_then(|name| ImageFormat::from_path(Path::new(name)).ok()))
        .map(|format| format.to_mime_type())
}

/// Preferred file extension for an image MIME type.
pub fn extension(mime: &str) -> Option<&'static str> {
    ImageFormat::from_mime_type(mime).and_then(|format| format.extensions_str().first().copied())
}
