//! Worker pool over Tesseract instances, used only for orientation-and-
//! script detection. Tesseract is never used for general OCR in this
//! pipeline — that is the vision model's job (see [`crate::model`]).

use parking_lot::Mutex;
use std::sync::Arc;

use crate::error::{DocMarkError, Result};

const MIN_WORKERS: usize = 3;

/// A single pooled Tesseract handle.
struct Worker {
    api: tesseract::Tesseract,
}

/// Lazily-grown pool of Tesseract workers, capped at `max_workers` (or the
/// number of images being processed, whichever is smaller) with a floor of
/// [`MIN_WORKERS`].
pub struct TesseractPool {
    workers: Mutex<Vec<Worker>>,
    max_workers: usize,
}

impl TesseractPool {
    /// Creates a pool sized for `num_images`, bounded by `max_workers`
    /// (`-1` meaning "unbounded", matching the `max_tesseract_workers`
    /// pipeline argument).
    pub fn new(num_images: usize, max_workers: i64) -> Self {
        let ceiling = if max_workers < 0 { num_images.max(MIN_WORKERS) } else { max_workers as usize };
        let max_workers = ceiling.max(MIN_WORKERS.min(num_images.max(1)));
        Self { workers: Mutex::new(Vec::new()), max_workers }
    }

    /// Detects the page orientation (one of 0, 90, 180, 270 degrees) of a
    /// decoded grayscale image using Tesseract's orientation-and-script
    /// detection, growing the pool lazily up to `max_workers`.
    pub fn detect_orientation(&self, rgb: &[u8], width: i32, height: i32) -> Result<i32> {
        let mut guard = self.workers.lock();
        let worker = match guard.pop() {
            Some(worker) => worker,
            None => {
                let api = tesseract::Tesseract::new(None, Some("osd"))
                    .map_err(|e| DocMarkError::Other(format!("failed to initialize tesseract: {e}")))?;
                Worker { api }
            }
        };
        drop(guard);

        let result = (|| -> Result<i32> {
            let api = worker
                .api
                .set_frame(rgb, width, height, 3, width * 3)
                .map_err(|e| DocMarkError::Other(format!("tesseract set_frame failed: {e}")))?;
            let orientation = api
                .get_orientation()
                .map_err(|e| DocMarkError::Other(format!("tesseract orientation detection failed: {e}")))?;
            Ok(orientation.0)
        })();

        let mut guard = self.workers.lock();
        if guard.len() < self.max_workers {
            guard.push(worker);
        }
        result
    }
}

pub type SharedTesseractPool = Arc<TesseractPool>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_size_respects_minimum() {
        let pool = TesseractPool::new(1, -1);
        assert!(pool.max_workers >= MIN_WORKERS.min(1).max(1));
    }

    #[test]
    fn pool_size_respects_explicit_cap() {
        let pool = TesseractPool::new(50, 4);
        assert_eq!(pool.max_workers, 4.max(MIN_WORKERS.min(1)));
    }
}
