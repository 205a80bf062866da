/// Background model loading
///
/// Each load runs import, metrics and freezing as one unit of work on its own
/// dedicated thread. The graph is owned exclusively by that thread until it is
/// frozen; only the frozen [`FrozenModel`] crosses back to the caller through
/// a oneshot channel, so the caller never observes a mutable graph.
use futures::channel::oneshot;
use futures::FutureExt;
use log::{debug, info};
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;
use std::time::Instant;

use crate::error::LoadError;
use crate::freeze::{freeze, FreezeReport, FrozenModel};
use crate::import::{import_model, ModelFormat};
use crate::metrics::ModelMetrics;

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: FrozenModel,
    pub metrics: ModelMetrics,
    pub freeze_report: FreezeReport,
}

/// Cancellation flag; honored only before the worker starts its unit of work.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type LoadResult = Result<LoadedModel, LoadError>;

/// Pending load. Await it, or poll it with [`LoadHandle::try_take`] from a
/// render loop that must not block.
#[derive(Debug)]
pub struct LoadHandle {
    id: u64,
    path: PathBuf,
    cancel: CancelToken,
    receiver: oneshot::Receiver<LoadResult>,
}

impl LoadHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Request cancellation. Has no effect once the worker has started.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Take the result if the worker has finished, without blocking.
    pub fn try_take(&mut self) -> Option<LoadResult> {
        match self.receiver.try_recv() {
            Ok(result) => result,
            Err(oneshot::Canceled) => Some(Err(LoadError::WorkerLost)),
        }
    }
}

impl Future for LoadHandle {
    type Output = LoadResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.receiver
            .poll_unpin(cx)
            .map(|received| received.unwrap_or(Err(LoadError::WorkerLost)))
    }
}

/// Spawns one worker thread per load request.
#[derive(Debug, Default)]
pub struct ModelLoader {
    next_id: AtomicU64,
}

impl ModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_async(&self, path: impl Into<PathBuf>) -> LoadHandle {
        self.load_async_with(path, CancelToken::new())
    }

    /// Start a load observing an existing cancellation token.
    pub fn load_async_with(&self, path: impl Into<PathBuf>, cancel: CancelToken) -> LoadHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let path = path.into();
        let (sender, receiver) = oneshot::channel();

        let worker_path = path.clone();
        let worker_cancel = cancel.clone();
        let spawned = thread::Builder::new()
            .name(format!("model-loader-{}", id))
            .spawn(move || {
                let outcome = if worker_cancel.is_cancelled() {
                    Err(LoadError::Cancelled)
                } else {
                    panic::catch_unwind(AssertUnwindSafe(|| load_model(&worker_path)))
                        .unwrap_or_else(|payload| Err(LoadError::WorkerPanicked(panic_message(&*payload))))
                };
                if sender.send(outcome).is_err() {
                    debug!("Load {} finished after its handle was dropped", id);
                }
            });

        let receiver = match spawned {
            Ok(_) => receiver,
            Err(e) => {
                // the closure and its sender are gone; report through a fresh channel
                let (sender, receiver) = oneshot::channel();
                let _ = sender.send(Err(LoadError::Spawn(e)));
                receiver
            }
        };

        LoadHandle {
            id,
            path,
            cancel,
            receiver,
        }
    }
}

/// Import, measure and freeze a model on the calling thread.
///
/// Metrics are taken from the mutable graph before it is frozen.
pub fn load_model(path: &Path) -> LoadResult {
    let started = Instant::now();
    let format = ModelFormat::from_path(path)?;
    let graph = import_model(path, format).map_err(|source| LoadError::Import {
        path: path.to_path_buf(),
        source,
    })?;
    let load_duration = started.elapsed();

    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let metrics = ModelMetrics::measure(file_name, load_duration, &graph);
    let (model, freeze_report) = freeze(graph);

    info!(
        "Imported {} on {}: tri={} frozen={}/{}",
        metrics.file_name,
        thread::current().name().unwrap_or("unnamed"),
        metrics.triangle_count,
        freeze_report.total() - freeze_report.left_mutable,
        freeze_report.total()
    );

    Ok(LoadedModel {
        model,
        metrics,
        freeze_report,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_unsupported_format_fails_future() {
        let loader = ModelLoader::new();
        match block_on(loader.load_async("scan.ply")) {
            Err(LoadError::UnsupportedFormat { extension }) => assert_eq!(extension, ".ply"),
            other => panic!("unexpected {:?}", other.map(|m| m.metrics)),
        }
    }

    #[test]
    fn test_cancel_before_start() {
        let loader = ModelLoader::new();
        let token = CancelToken::new();
        token.cancel();
        let handle = loader.load_async_with("never_read.stl", token);
        assert!(matches!(block_on(handle), Err(LoadError::Cancelled)));
    }

    #[test]
    fn test_missing_file_is_import_error() {
        let loader = ModelLoader::new();
        let result = block_on(loader.load_async("/nonexistent/dir/part.stl"));
        assert!(matches!(result, Err(LoadError::Import { .. })));
    }

    #[test]
    fn test_handle_ids_are_distinct() {
        let loader = ModelLoader::new();
        let a = loader.load_async("a.ply");
        let b = loader.load_async("b.ply");
        assert_ne!(a.id(), b.id());
        assert_eq!(b.path(), Path::new("b.ply"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
    }
}
