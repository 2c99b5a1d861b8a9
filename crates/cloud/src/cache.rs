//! On-disk DEM cache.
//!
//! Downloaded GeoTIFFs are kept as `dem_{dataset}_{name}.tif` under the
//! output directory and reused whenever that file already exists. There is
//! no eviction.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Replace characters that would escape the cache directory or break
/// file names.
pub fn file_component(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect()
}

/// Directory of cached DEM files
#[derive(Debug, Clone)]
pub struct DemCache {
    dir: PathBuf,
}

impl DemCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the DEM for (`dataset`, `name`) lives, cached or not
    pub fn path_for(&self, dataset: &str, name: &str) -> PathBuf {
        self.dir.join(format!(
            "dem_{}_{}.tif",
            file_component(dataset),
            file_component(name)
        ))
    }

    /// Path of an existing cached DEM
    pub async fn lookup(&self, dataset: &str, name: &str) -> Option<PathBuf> {
        let path = self.path_for(dataset, name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Write downloaded bytes into the cache, creating the directory if
    /// needed. The file appears under its final name only once complete.
    pub async fn store(&self, dataset: &str, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(dataset, name);
        let partial = path.with_extension("tif.part");
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &path).await?;
        debug!(path = %path.display(), size = bytes.len(), "cached DEM");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let cache = DemCache::new("output");
        assert_eq!(
            cache.path_for("USGS10m", "45.0_-120.0_0.05"),
            PathBuf::from("output/dem_USGS10m_45.0_-120.0_0.05.tif")
        );
        assert_eq!(
            cache.path_for("USGS10m", "../etc/x"),
            PathBuf::from("output/dem_USGS10m_.._etc_x.tif")
        );
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DemCache::new(tmp.path().join("nested"));
        assert!(cache.lookup("USGS10m", "creek").await.is_none());

        let stored = cache.store("USGS10m", "creek", b"tiff").await.unwrap();
        assert_eq!(cache.lookup("USGS10m", "creek").await, Some(stored.clone()));
        assert_eq!(std::fs::read(stored).unwrap(), b"tiff");
        assert!(cache.lookup("USGS30m", "creek").await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_ignores_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DemCache::new(tmp.path());
        std::fs::create_dir(cache.path_for("USGS10m", "creek")).unwrap();
        assert!(cache.lookup("USGS10m", "creek").await.is_none());
    }
}
