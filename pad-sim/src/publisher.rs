//! Well-known file that tells the consumer which event node to open

use crate::error::Result;
use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default location read by the car controller
pub const DEFAULT_PATH_FILE: &str = "/tmp/virtual_gamepad_path.txt";

/// Owns the path file; removes it on [`PathPublisher::remove`] or drop
pub struct PathPublisher {
    path: PathBuf,
    published: bool,
}

impl PathPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            published: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Write the device node path, replacing any previous content
    pub fn publish(&mut self, dev_node: &Path) -> Result<()> {
        fs::write(&self.path, dev_node.as_os_str().as_encoded_bytes())?;
        self.published = true;
        info!(
            "Published {} to {}",
            dev_node.display(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the file. A file that is already gone is not an error.
    pub fn remove(&mut self) -> Result<()> {
        if !self.published {
            return Ok(());
        }
        self.published = false;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for PathPublisher {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_writes_exact_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pad_path.txt");
        let mut publisher = PathPublisher::new(&file);

        publisher.publish(Path::new("/dev/input/event7")).unwrap();
        assert!(publisher.is_published());
        assert_eq!(fs::read_to_string(&file).unwrap(), "/dev/input/event7");

        publisher.remove().unwrap();
        assert!(!file.exists());
    }

    #[test]
    fn test_remove_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pad_path.txt");
        let mut publisher = PathPublisher::new(&file);

        publisher.publish(Path::new("/dev/input/event1")).unwrap();
        fs::remove_file(&file).unwrap();
        assert!(publisher.remove().is_ok());
    }

    #[test]
    fn test_drop_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pad_path.txt");
        {
            let mut publisher = PathPublisher::new(&file);
            publisher.publish(Path::new("/dev/input/event2")).unwrap();
            assert!(file.exists());
        }
        assert!(!file.exists());
    }

    #[test]
    fn test_unpublished_never_touches_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pad_path.txt");
        fs::write(&file, "someone else's").unwrap();

        drop(PathPublisher::new(&file));
        assert!(file.exists());
    }
}
