//! Decoded sources backing picture-in-picture layers.
//!
//! Each PiP layer owns at most one [`MediaSource`]. The registry opens
//! handles for new layers, releases handles whose layer was deleted, and
//! releases everything on teardown. A handle leaves the registry before it
//! is released, so no handle is released twice.

use std::collections::BTreeMap;
use std::path::Path;

use image::RgbaImage;

use clipforge_common::error::ClipforgeResult;
use clipforge_project_model::overlay::{LayerId, OverlaySet, PipKind, PipLayer};

use crate::source::{FfmpegSource, MediaSource, StillImageSource};

/// Opens the media behind a PiP layer.
pub trait SourceOpener: Send + Sync {
    fn open(&self, layer: &PipLayer) -> ClipforgeResult<Box<dyn MediaSource>>;
}

/// Opens PiP sources from file paths relative to `base_dir`.
#[derive(Debug, Clone)]
pub struct FileOpener {
    base_dir: std::path::PathBuf,
}

impl FileOpener {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }
}

impl SourceOpener for FileOpener {
    fn open(&self, layer: &PipLayer) -> ClipforgeResult<Box<dyn MediaSource>> {
        let path = self.base_dir.join(&layer.source);
        match layer.kind {
            PipKind::Image => {
                let hold = (layer.end_time - layer.start_time).max(0.0);
                Ok(Box::new(StillImageSource::open(path, hold)?))
            }
            PipKind::Video => Ok(Box::new(FfmpegSource::open(path)?)),
        }
    }
}

/// Outcome of a [`PipSources::sync`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncReport {
    pub opened: usize,
    pub released: usize,
    /// Layers whose source failed to open; they are skipped when drawing.
    pub failed: Vec<LayerId>,
}

/// Registry mapping PiP layer ids to their decoded sources.
#[derive(Default)]
pub struct PipSources {
    handles: BTreeMap<LayerId, Box<dyn MediaSource>>,
}

impl PipSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.handles.contains_key(&id)
    }

    /// Bring the registry in line with `overlays`: open missing handles and
    /// release handles whose layer no longer exists.
    pub fn sync(&mut self, overlays: &OverlaySet, opener: &dyn SourceOpener) -> SyncReport {
        let mut report = SyncReport::default();

        let stale: Vec<LayerId> = self
            .handles
            .keys()
            .copied()
            .filter(|id| overlays.pip(*id).is_none())
            .collect();
        for id in stale {
            if self.release(id) {
                report.released += 1;
            }
        }

        for layer in overlays.pips() {
            if self.handles.contains_key(&layer.id) {
                continue;
            }
            match opener.open(layer) {
                Ok(handle) => {
                    tracing::debug!(layer = %layer.id, source = handle.name(), "Opened PiP source");
                    self.handles.insert(layer.id, handle);
                    report.opened += 1;
                }
                Err(err) => {
                    tracing::warn!(layer = %layer.id, error = %err, "Failed to open PiP source");
                    report.failed.push(layer.id);
                }
            }
        }
        report
    }

    /// Release one layer's handle. Returns whether a handle was held.
    pub fn release(&mut self, id: LayerId) -> bool {
        match self.handles.remove(&id) {
            Some(mut handle) => {
                handle.release();
                tracing::debug!(layer = %id, "Released PiP source");
                true
            }
            None => false,
        }
    }

    /// Release every handle. Returns how many were released.
    pub fn teardown(&mut self) -> usize {
        let ids: Vec<LayerId> = self.handles.keys().copied().collect();
        ids.into_iter().filter(|id| self.release(*id)).count()
    }

    /// Frame of `layer` at timeline time `global_secs`.
    ///
    /// Video layers play from their own start when the layer window opens.
    /// Returns `Ok(None)` when the layer has no open handle.
    pub async fn frame_at(
        &mut self,
        layer: &PipLayer,
        global_secs: f64,
    ) -> ClipforgeResult<Option<&RgbaImage>> {
        let handle = match self.handles.get_mut(&layer.id) {
            Some(handle) => handle,
            None => return Ok(None),
        };
        let local = (global_secs - layer.start_time).max(0.0);
        let local = local.min(handle.metadata().duration_secs.max(0.0));
        handle.seek(local).await?;
        Ok(Some(handle.current_frame()?))
    }
}

impl Drop for PipSources {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use clipforge_common::error::ClipforgeError;
    use clipforge_project_model::geometry::PercentRect;
    use clipforge_project_model::overlay::PipLayerSpec;

    use crate::source::TestPatternSource;

    struct Counted {
        inner: TestPatternSource,
        releases: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl MediaSource for Counted {
        fn metadata(&self) -> &clipforge_project_model::media::SourceMedia {
            self.inner.metadata()
        }
        async fn seek(&mut self, t: f64) -> ClipforgeResult<()> {
            self.inner.seek(t).await
        }
        fn current_frame(&self) -> ClipforgeResult<&RgbaImage> {
            self.inner.current_frame()
        }
        fn name(&self) -> &str {
            "counted"
        }
        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct CountingOpener {
        releases: Arc<AtomicUsize>,
    }

    impl SourceOpener for CountingOpener {
        fn open(&self, layer: &PipLayer) -> ClipforgeResult<Box<dyn MediaSource>> {
            if layer.source == "missing.mp4" {
                return Err(ClipforgeError::media("missing"));
            }
            Ok(Box::new(Counted {
                inner: TestPatternSource::new(10.0, 4, 4),
                releases: Arc::clone(&self.releases),
            }))
        }
    }

    fn spec(source: &str) -> PipLayerSpec {
        PipLayerSpec {
            kind: PipKind::Video,
            source: source.to_string(),
            rect: PercentRect::new(0.0, 0.0, 25.0, 25.0),
            opacity: 1.0,
            start_time: 2.0,
            end_time: 8.0,
        }
    }

    #[test]
    fn test_each_handle_released_exactly_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let opener = CountingOpener {
            releases: Arc::clone(&releases),
        };
        let mut overlays = OverlaySet::new();
        let a = overlays.add_pip(spec("a.mp4")).unwrap();
        let _b = overlays.add_pip(spec("b.mp4")).unwrap();

        let mut registry = PipSources::new();
        let report = registry.sync(&overlays, &opener);
        assert_eq!(report.opened, 2);
        assert_eq!(registry.len(), 2);

        overlays.remove_pip(a).unwrap();
        let report = registry.sync(&overlays, &opener);
        assert_eq!(report.released, 1);
        assert_eq!(report.opened, 0);
        assert!(!registry.contains(a));
        assert!(!registry.release(a));

        assert_eq!(registry.teardown(), 1);
        assert_eq!(registry.teardown(), 0);
        drop(registry);
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_releases_remaining_handles() {
        let releases = Arc::new(AtomicUsize::new(0));
        let opener = CountingOpener {
            releases: Arc::clone(&releases),
        };
        let mut overlays = OverlaySet::new();
        overlays.add_pip(spec("a.mp4")).unwrap();
        {
            let mut registry = PipSources::new();
            registry.sync(&overlays, &opener);
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_open_is_reported_not_fatal() {
        let opener = CountingOpener {
            releases: Arc::new(AtomicUsize::new(0)),
        };
        let mut overlays = OverlaySet::new();
        let bad = overlays.add_pip(spec("missing.mp4")).unwrap();
        overlays.add_pip(spec("ok.mp4")).unwrap();

        let mut registry = PipSources::new();
        let report = registry.sync(&overlays, &opener);
        assert_eq!(report.failed, vec![bad]);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_video_layer_plays_from_window_start() {
        let opener = CountingOpener {
            releases: Arc::new(AtomicUsize::new(0)),
        };
        let mut overlays = OverlaySet::new();
        let id = overlays.add_pip(spec("a.mp4")).unwrap();
        let mut registry = PipSources::new();
        registry.sync(&overlays, &opener);

        let layer = overlays.pip(id).unwrap().clone();
        let frame = registry.frame_at(&layer, 5.5).await.unwrap().unwrap();
        // Window opened at 2s, so the source is 3.5s in.
        assert_eq!(*frame.get_pixel(0, 0), TestPatternSource::color_for(3.5));
    }
}
