use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use assetforge::config::PipelineConfig;
use assetforge::errors::CompileError;
use assetforge::pipeline::{CompilationResult, CompileFuture, Pipeline};
use assetforge::types::PipelineKind;

/// Releases gated compiles of a [`FakePipeline`].
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
}

impl Gate {
    /// Let `n` waiting (or future) compiles finish.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

/// A fake pipeline that:
/// - records how many compiles started and how many ran at the same time
/// - optionally blocks every compile until its [`Gate`] releases it
/// - fails compiles on demand with a render error.
#[derive(Debug)]
pub struct FakePipeline {
    kind: PipelineKind,
    started: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
    script: Mutex<VecDeque<bool>>,
}

impl FakePipeline {
    pub fn new(kind: PipelineKind) -> Self {
        Self {
            kind,
            started: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            gate: None,
            script: Mutex::new(VecDeque::new()),
        }
    }

    /// A pipeline whose compiles wait for the returned gate.
    pub fn gated(kind: PipelineKind) -> (Self, Gate) {
        let permits = Arc::new(Semaphore::new(0));
        let mut pipeline = Self::new(kind);
        pipeline.gate = Some(Arc::clone(&permits));
        (pipeline, Gate { permits })
    }

    /// Queue outcomes for the next compiles: `false` fails, `true` succeeds.
    /// Compiles beyond the queue succeed.
    pub fn script_outcomes(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.script.lock().unwrap().extend(outcomes);
    }

    pub fn compiles_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Pipeline for FakePipeline {
    fn kind(&self) -> PipelineKind {
        self.kind
    }

    fn compile(&self, config: PipelineConfig) -> CompileFuture<'_> {
        let succeed = self.script.lock().unwrap().pop_front().unwrap_or(true);

        Box::pin(async move {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if !succeed {
                return Err(CompileError::Render {
                    message: "scripted failure".to_string(),
                });
            }
            Ok(CompilationResult {
                pipeline: self.kind,
                path: config.path.clone(),
                file: config.file.clone(),
                output_path: PathBuf::from(&config.output),
                source_map_path: None,
            })
        })
    }
}
