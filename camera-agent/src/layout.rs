use std::path::{Path, PathBuf};

/// Resolves the camera's absolute paths under a filesystem root
///
/// On the camera the root is `/`; tests and dry runs point it at a scratch
/// directory so the same code can run off-device.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, absolute: &str) -> PathBuf {
        if self.root == Path::new("/") {
            PathBuf::from(absolute)
        } else {
            self.root.join(absolute.trim_start_matches('/'))
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new("/")
    }
}
