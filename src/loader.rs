//! Concurrent image loading, decoupled from layout.
//!
//! Sources load on detached worker threads; completion is only ever
//! observed when the compositor polls at a relayout pass. Failures settle
//! their own slot and never abort sibling loads.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use anyhow::Context as _;
use kurbo::Size;
use tracing::{debug, warn};

use crate::error::{WavelayError, WavelayResult};

/// Decoded raster handle for one overlay source.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    /// Source identifier, kept verbatim for the host scene.
    pub source: String,
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major, tightly packed.
    pub rgba8: Arc<Vec<u8>>,
}

impl LoadedImage {
    pub fn natural_size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Per-source load progress, index-aligned with the configured sources.
#[derive(Clone, Debug)]
pub enum LoadState {
    Pending,
    Loaded(LoadedImage),
    Failed { source: String, reason: String },
}

impl LoadState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_loaded(&self) -> Option<&LoadedImage> {
        match self {
            Self::Loaded(image) => Some(image),
            _ => None,
        }
    }
}

/// Loads a batch of sources concurrently, preserving input order.
pub struct LayerLoader {
    rx: Receiver<(usize, WavelayResult<LoadedImage>)>,
    slots: Vec<LoadState>,
}

impl LayerLoader {
    /// Starts loading every source on its own worker thread and returns
    /// immediately.
    pub fn spawn(sources: &[String]) -> Self {
        let (tx, rx) = mpsc::channel();
        for (index, source) in sources.iter().enumerate() {
            let tx = tx.clone();
            let source = source.clone();
            thread::spawn(move || {
                let result = load_one(&source);
                // The receiver is gone if the compositor was destroyed.
                let _ = tx.send((index, result));
            });
        }
        drop(tx);
        Self {
            rx,
            slots: vec![LoadState::Pending; sources.len()],
        }
    }

    /// Drains results that have arrived since the last call and returns the
    /// slot table. Never blocks.
    pub fn poll(&mut self) -> &[LoadState] {
        while let Ok((index, result)) = self.rx.try_recv() {
            self.settle(index, result);
        }
        &self.slots
    }

    /// Blocks until every slot has settled. Test and demo convenience; the
    /// compositor itself only polls.
    pub fn wait_settled(&mut self) -> &[LoadState] {
        while self.slots.iter().any(|slot| !slot.is_settled()) {
            match self.rx.recv() {
                Ok((index, result)) => self.settle(index, result),
                Err(_) => break,
            }
        }
        &self.slots
    }

    pub fn slots(&self) -> &[LoadState] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn settle(&mut self, index: usize, result: WavelayResult<LoadedImage>) {
        match result {
            Ok(image) => {
                debug!(index, source = %image.source, width = image.width, height = image.height, "image loaded");
                self.slots[index] = LoadState::Loaded(image);
            }
            Err(err) => {
                let (source, reason) = match err {
                    WavelayError::LayerLoadFailure { source_label: source, reason } => (source, reason),
                    other => (String::new(), other.to_string()),
                };
                warn!(index, source = %source, reason = %reason, "image load failed; layer will be omitted");
                self.slots[index] = LoadState::Failed { source, reason };
            }
        }
    }
}

impl fmt::Debug for LayerLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerLoader")
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

/// Loads every source synchronously, in order, failing per item.
pub fn load_all(sources: &[String]) -> Vec<WavelayResult<LoadedImage>> {
    sources.iter().map(|source| load_one(source)).collect()
}

fn load_one(source: &str) -> WavelayResult<LoadedImage> {
    decode_source(source).map_err(|err| WavelayError::layer_load(source, format!("{err:#}")))
}

fn decode_source(source: &str) -> anyhow::Result<LoadedImage> {
    let bytes = std::fs::read(source).with_context(|| format!("read image '{source}'"))?;
    let decoded = image::load_from_memory(&bytes).context("decode image from memory")?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(LoadedImage {
        source: source.to_string(),
        width,
        height,
        rgba8: Arc::new(rgba.into_raw()),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "wavelay_{name}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    fn write_png(dir: &std::path::Path, name: &str, width: u32, height: u32) -> String {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        let path = dir.join(name);
        std::fs::write(&path, &buf).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn load_all_preserves_order_and_fails_per_item() {
        let tmp = temp_dir("loader_order");
        std::fs::create_dir_all(&tmp).unwrap();

        let first = write_png(&tmp, "first.png", 2, 1);
        let missing = tmp.join("missing.png").to_string_lossy().into_owned();
        let third = write_png(&tmp, "third.png", 1, 3);

        let results = load_all(&[first.clone(), missing, third.clone()]);
        assert_eq!(results.len(), 3);

        let loaded = results[0].as_ref().unwrap();
        assert_eq!(loaded.source, first);
        assert_eq!((loaded.width, loaded.height), (2, 1));

        assert!(matches!(
            results[1],
            Err(WavelayError::LayerLoadFailure { .. })
        ));

        let loaded = results[2].as_ref().unwrap();
        assert_eq!(loaded.source, third);
        assert_eq!(loaded.natural_size(), Size::new(1.0, 3.0));

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn spawned_loads_settle_into_their_own_slots() {
        let tmp = temp_dir("loader_spawn");
        std::fs::create_dir_all(&tmp).unwrap();

        let good = write_png(&tmp, "good.png", 1, 1);
        let bad = tmp.join("bad.png").to_string_lossy().into_owned();

        let mut loader = LayerLoader::spawn(&[good, bad.clone()]);
        let slots = loader.wait_settled();

        assert!(slots[0].as_loaded().is_some());
        match &slots[1] {
            LoadState::Failed { source, .. } => assert_eq!(source, &bad),
            other => panic!("expected failure, got {other:?}"),
        }

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn corrupt_bytes_fail_decode_without_blocking_siblings() {
        let tmp = temp_dir("loader_corrupt");
        std::fs::create_dir_all(&tmp).unwrap();

        let corrupt = tmp.join("corrupt.png");
        std::fs::write(&corrupt, b"not a png").unwrap();
        let good = write_png(&tmp, "good.png", 1, 1);

        let mut loader =
            LayerLoader::spawn(&[corrupt.to_string_lossy().into_owned(), good]);
        let slots = loader.wait_settled();

        assert!(matches!(slots[0], LoadState::Failed { .. }));
        assert!(slots[1].as_loaded().is_some());

        std::fs::remove_dir_all(&tmp).ok();
    }
}
