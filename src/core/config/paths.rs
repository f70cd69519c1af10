use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub products_db: PathBuf,
    pub vectors_db: PathBuf,
}

impl AppPaths {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let log_dir = data_dir.join("logs");
        let products_db = data_dir.join("products.db");
        let vectors_db = data_dir.join("vectors.db");

        AppPaths {
            data_dir,
            log_dir,
            products_db,
            vectors_db,
        }
    }

    /// Creates the data and log directories if they are missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.data_dir, &self.log_dir] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_store_locations_from_data_dir() {
        let paths = AppPaths::new("/tmp/catalog");
        assert_eq!(paths.products_db, PathBuf::from("/tmp/catalog/products.db"));
        assert_eq!(paths.vectors_db, PathBuf::from("/tmp/catalog/vectors.db"));
        assert_eq!(paths.log_dir, PathBuf::from("/tmp/catalog/logs"));
    }

    #[test]
    fn ensure_dirs_creates_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(tmp.path().join("nested"));
        paths.ensure_dirs().unwrap();
        assert!(paths.log_dir.is_dir());
    }
}
