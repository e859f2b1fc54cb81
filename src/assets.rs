use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    config::Dimensions,
    error::{EngineError, EngineResult},
};

struct CachedSource {
    decoded: Arc<image::RgbaImage>,
    stretched: HashMap<(u32, u32), Arc<image::RgbaImage>>,
}

/// Decoded source images plus every stretched variant that has been
/// requested, keyed by the path they were loaded from. Decode and
/// resize both happen once per batch no matter how many editions reuse
/// an attribute. Attribute ids are only unique within one catalog file,
/// so the path is the identity here; a batch spanning several catalogs
/// shares one cache safely.
pub struct SourceImageCache {
    root: PathBuf, // <layers dir>/<network>
    smoothing: bool,
    sources: HashMap<String, CachedSource>,
}

impl SourceImageCache {
    pub fn new(root: impl Into<PathBuf>, smoothing: bool) -> Self {
        Self {
            root: root.into(),
            smoothing,
            sources: HashMap::new(),
        }
    }

    /// Source image at `path` (relative to the cache root), stretched
    /// to exactly `dims`. Aspect ratio is not preserved.
    pub fn fetch(&mut self, path: &str, dims: Dimensions) -> EngineResult<Arc<image::RgbaImage>> {
        let source = match self.sources.entry(path.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let decoded = Arc::new(load_rgba8(&self.root.join(entry.key()))?);
                entry.insert(CachedSource {
                    decoded,
                    stretched: HashMap::new(),
                })
            }
        };
        if source.decoded.dimensions() == (dims.width, dims.height) {
            return Ok(Arc::clone(&source.decoded));
        }
        if let Some(stretched) = source.stretched.get(&(dims.width, dims.height)) {
            return Ok(Arc::clone(stretched));
        }

        let filter = if self.smoothing {
            image::imageops::FilterType::Triangle
        } else {
            image::imageops::FilterType::Nearest
        };
        let stretched = Arc::new(image::imageops::resize(
            &*source.decoded,
            dims.width,
            dims.height,
            filter,
        ));
        source
            .stretched
            .insert((dims.width, dims.height), Arc::clone(&stretched));
        Ok(stretched)
    }
}

fn load_rgba8(path: &Path) -> EngineResult<image::RgbaImage> {
    let bytes = std::fs::read(path).map_err(|e| {
        EngineError::render(format!("reading source image {}: {e}", path.display()))
    })?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| {
        EngineError::render(format!("decoding source image {}: {e}", path.display()))
    })?;
    Ok(decoded.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_root(name: &str) -> PathBuf {
        let dir = PathBuf::from("target").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path, image: &image::RgbaImage) {
        image.save_with_format(path, image::ImageFormat::Png).unwrap();
    }

    #[test]
    fn fetch_stretches_without_preserving_aspect() {
        let root = fixture_root("source_image_cache_stretch");
        let mut half = image::RgbaImage::new(2, 1);
        half.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        half.put_pixel(1, 0, image::Rgba([0, 0, 255, 255]));
        write_png(&root.join("half.png"), &half);

        let mut cache = SourceImageCache::new(&root, false);
        let out = cache
            .fetch(
                "half.png",
                Dimensions {
                    width: 4,
                    height: 2,
                },
            )
            .unwrap();
        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(out.get_pixel(2, 0).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(3, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn fetch_reuses_cached_variants() {
        let root = fixture_root("source_image_cache_reuse");
        let flat = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]));
        write_png(&root.join("flat.png"), &flat);

        let mut cache = SourceImageCache::new(&root, true);
        let dims = Dimensions {
            width: 8,
            height: 8,
        };
        let first = cache.fetch("flat.png", dims).unwrap();
        let second = cache.fetch("flat.png", dims).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn fetch_distinguishes_sources_by_path() {
        let root = fixture_root("source_image_cache_paths");
        let green = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 255]));
        let orange = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 128, 0, 255]));
        write_png(&root.join("green.png"), &green);
        write_png(&root.join("orange.png"), &orange);

        let mut cache = SourceImageCache::new(&root, false);
        let dims = Dimensions {
            width: 4,
            height: 4,
        };
        let a = cache.fetch("green.png", dims).unwrap();
        let b = cache.fetch("orange.png", dims).unwrap();
        assert_eq!(a.get_pixel(0, 0).0, [0, 255, 0, 255]);
        assert_eq!(b.get_pixel(0, 0).0, [255, 128, 0, 255]);
    }

    #[test]
    fn fetch_skips_resize_at_native_dimensions() {
        let root = fixture_root("source_image_cache_native");
        let flat = image::RgbaImage::from_pixel(3, 3, image::Rgba([9, 9, 9, 255]));
        write_png(&root.join("flat.png"), &flat);

        let mut cache = SourceImageCache::new(&root, true);
        let dims = Dimensions {
            width: 3,
            height: 3,
        };
        let first = cache.fetch("flat.png", dims).unwrap();
        let second = cache.fetch("flat.png", dims).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get_pixel(1, 1).0, [9, 9, 9, 255]);
    }

    #[test]
    fn fetch_missing_file_is_a_render_error() {
        let root = fixture_root("source_image_cache_missing");
        let mut cache = SourceImageCache::new(&root, true);
        let err = cache
            .fetch(
                "nope.png",
                Dimensions {
                    width: 2,
                    height: 2,
                },
            )
            .unwrap_err();
        assert!(err.to_string().contains("render error"));
    }
}
