use crate::error::{ArchiveError, ArchiveResult};

/// A file to be packed: normalized relative path and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    path: String,
    data: Vec<u8>,
}
impl Entry {
    /// Create an entry, normalizing `path` with [`normalize_path`].
    pub fn new(path: &str, data: impl Into<Vec<u8>>) -> ArchiveResult<Self> {
        Ok(Entry {
            path: normalize_path(path)?,
            data: data.into(),
        })
    }

    pub fn path(&self) -> &str { &self.path }

    pub fn data(&self) -> &[u8] { &self.data }

    pub fn len(&self) -> usize { self.data.len() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    pub fn into_parts(self) -> (String, Vec<u8>) { (self.path, self.data) }
}

/// Convert `path` to the archive form: forward slashes, no leading slash,
/// no empty, `.` or `..` segments.
pub fn normalize_path(path: &str) -> ArchiveResult<String> {
    let invalid = |reason| ArchiveError::InvalidPath {
        path: path.to_string(),
        reason,
    };
    let slashed = path.replace('\\', "/");
    let trimmed = slashed.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(invalid("path is empty"));
    }
    for segment in trimmed.split('/') {
        match segment {
            "" => return Err(invalid("path contains an empty segment")),
            "." | ".." => return Err(invalid("path contains a relative segment")),
            _ => {}
        }
    }
    if trimmed.contains('\0') {
        return Err(invalid("path contains a nul character"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_separators() {
        assert_eq!(normalize_path("b\\c.bin").unwrap(), "b/c.bin");
        assert_eq!(normalize_path("/a.txt").unwrap(), "a.txt");
        assert_eq!(normalize_path("assets/img/splash.png").unwrap(), "assets/img/splash.png");
    }

    #[test]
    fn rejects_malformed_paths() {
        for path in ["", "/", "a//b", "a/./b", "../a", "a/", "a\0b"] {
            assert!(
                matches!(normalize_path(path), Err(ArchiveError::InvalidPath { .. })),
                "{path:?} should be rejected"
            );
        }
    }

    #[test]
    fn entry_keeps_payload() {
        let entry = Entry::new("d.png", vec![1, 2, 3]).unwrap();
        assert_eq!(entry.path(), "d.png");
        assert_eq!(entry.len(), 3);
        assert!(Entry::new("x", Vec::new()).unwrap().is_empty());
    }
}
