//! Mutation runtime: admits biome, border and merge requests through the
//! plot lock table and runs them on a worker pool.
#![forbid(unsafe_code)]

mod config;
mod report;
pub mod tasks;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use plotworld_blocks::{BiomeCatalog, MaterialPalette};
use plotworld_chunk::{VoxelBackend, VoxelError};
use plotworld_plots::{LockManager, MergePlan, PlotLockGuard, PlotRegistry, PlotSet};
use plotworld_world::WorldLayout;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

pub use config::RuntimeConfig;
pub use report::{
    MutationData, MutationError, MutationReport, MutationRequest, format_elapsed,
};

use crate::tasks::TaskFailure;

/// Everything a mutation needs to reach one world.
#[derive(Clone)]
pub struct MutationWorld {
    pub name: Arc<str>,
    pub layout: WorldLayout,
    pub backend: Arc<dyn VoxelBackend>,
    pub registry: Arc<RwLock<PlotRegistry>>,
    pub locks: Arc<LockManager>,
    pub palette: Arc<MaterialPalette>,
    pub biomes: Arc<BiomeCatalog>,
}

impl MutationWorld {
    pub fn new(
        layout: WorldLayout,
        backend: Arc<dyn VoxelBackend>,
        registry: Arc<RwLock<PlotRegistry>>,
        locks: Arc<LockManager>,
    ) -> Self {
        let name: Arc<str> = Arc::from(
            registry
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .world(),
        );
        Self {
            name,
            layout,
            backend,
            registry,
            locks,
            palette: Arc::new(MaterialPalette::default()),
            biomes: Arc::new(BiomeCatalog::vanilla()),
        }
    }

    pub fn with_palette(mut self, palette: Arc<MaterialPalette>) -> Self {
        self.palette = palette;
        self
    }
}

enum TaskPlan {
    Biome(PlotSet, plotworld_blocks::BiomeId),
    Border(PlotSet, plotworld_blocks::Material),
    Merge(MergePlan),
}

type Callback = Box<dyn FnOnce(MutationReport) + Send + 'static>;

enum Reply {
    Channel(Sender<MutationReport>),
    Callback(Callback),
}

impl Reply {
    fn deliver(self, report: MutationReport) {
        match self {
            // The caller may have dropped its handle; the report is then discarded.
            Reply::Channel(tx) => {
                let _ = tx.send(report);
            }
            Reply::Callback(cb) => cb(report),
        }
    }
}

struct MutationJob {
    plan: TaskPlan,
    guard: PlotLockGuard,
    reply: Reply,
}

/// Pending result of a request. Waiting blocks only the waiting thread.
pub struct MutationHandle {
    kind: plotworld_plots::LockKind,
    rx: Receiver<MutationReport>,
}

impl MutationHandle {
    pub fn wait(self) -> MutationReport {
        self.rx
            .recv()
            .unwrap_or_else(|_| MutationReport::rejected(self.kind, MutationError::WorkerLost))
    }

    pub fn try_result(&self) -> Option<MutationReport> {
        self.rx.try_recv().ok()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<MutationReport> {
        match self.rx.recv_timeout(timeout) {
            Ok(r) => Some(r),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(MutationReport::rejected(
                self.kind,
                MutationError::WorkerLost,
            )),
        }
    }
}

pub struct MutationRuntime {
    world: Arc<MutationWorld>,
    max_group_size: usize,
    job_tx: Sender<MutationJob>,
    _pool: Arc<ThreadPool>,
    queued: Arc<AtomicUsize>,
    inflight: Arc<AtomicUsize>,
}

impl MutationRuntime {
    pub fn new(world: MutationWorld, config: &RuntimeConfig) -> Result<Self, ThreadPoolBuildError> {
        let (job_tx, job_rx) = unbounded::<MutationJob>();
        let workers = config.worker_count();
        let world = Arc::new(world);
        let queued = Arc::new(AtomicUsize::new(0));
        let inflight = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("plotworld-mutation-{i}"))
                .build()?,
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let world = Arc::clone(&world);
            let queued = Arc::clone(&queued);
            let inflight = Arc::clone(&inflight);
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    queued.fetch_sub(1, Ordering::Relaxed);
                    inflight.fetch_add(1, Ordering::Relaxed);
                    process_job(job, world.as_ref());
                    inflight.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }
        log::info!(
            "mutation runtime for world {} started with {} worker(s)",
            world.name,
            workers
        );
        Ok(Self {
            world,
            max_group_size: config.max_group_size,
            job_tx,
            _pool: pool,
            queued,
            inflight,
        })
    }

    pub fn world(&self) -> &MutationWorld {
        &self.world
    }

    /// Lock the request's plot set and queue it. A busy or invalid request
    /// resolves the handle immediately.
    pub fn request(&self, request: MutationRequest) -> MutationHandle {
        let (tx, rx) = bounded(1);
        self.submit(request, Reply::Channel(tx));
        MutationHandle {
            kind: request.kind(),
            rx,
        }
    }

    /// Like [`request`](Self::request) but calls `callback` with the report.
    /// Rejections run the callback on the calling thread.
    pub fn request_with<F>(&self, request: MutationRequest, callback: F)
    where
        F: FnOnce(MutationReport) + Send + 'static,
    {
        self.submit(request, Reply::Callback(Box::new(callback)));
    }

    fn submit(&self, request: MutationRequest, reply: Reply) {
        let (plan, guard) = match self.admit(request) {
            Ok(admitted) => admitted,
            Err(err) => {
                log::debug!("{} request on {} rejected: {}", request.kind(), request.plot(), err);
                reply.deliver(MutationReport::rejected(request.kind(), err));
                return;
            }
        };
        self.queued.fetch_add(1, Ordering::Relaxed);
        let job = MutationJob { plan, guard, reply };
        if let Err(err) = self.job_tx.send(job) {
            self.queued.fetch_sub(1, Ordering::Relaxed);
            let MutationJob { guard, reply, .. } = err.into_inner();
            let lock = guard.id();
            drop(guard);
            let mut report = MutationReport::rejected(request.kind(), MutationError::WorkerLost);
            report.lock = Some(lock);
            reply.deliver(report);
        }
    }

    // Resolve and lock under the registry read lock so no merge can change
    // the closures between resolution and acquisition.
    fn admit(&self, request: MutationRequest) -> Result<(TaskPlan, PlotLockGuard), MutationError> {
        let registry = self
            .world
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let kind = request.kind();
        match request {
            MutationRequest::Biome { plot, biome } => {
                let set = registry.plot_set(plot);
                let guard = self.world.locks.acquire(kind, &[&set])?;
                Ok((TaskPlan::Biome(set, biome), guard))
            }
            MutationRequest::Border { plot, material } => {
                let set = registry.plot_set(plot);
                let guard = self.world.locks.acquire(kind, &[&set])?;
                Ok((TaskPlan::Border(set, material), guard))
            }
            MutationRequest::Merge { plot, direction } => {
                let plan = registry.plan_merge(plot, direction, self.max_group_size)?;
                let guard = self
                    .world
                    .locks
                    .acquire(kind, &[&plan.source, &plan.target])?;
                Ok((TaskPlan::Merge(plan), guard))
            }
        }
    }

    /// (queued, in flight)
    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.queued.load(Ordering::Relaxed),
            self.inflight.load(Ordering::Relaxed),
        )
    }
}

fn process_job(job: MutationJob, world: &MutationWorld) {
    let MutationJob { plan, guard, reply } = job;
    let kind = guard.id().kind();
    let lock = guard.id();
    let t0 = Instant::now();
    let result = match panic::catch_unwind(AssertUnwindSafe(|| run_task(&plan, world))) {
        Ok(result) => result,
        Err(_) => {
            log::error!("mutation {} panicked; releasing its plots", lock);
            Err(MutationError::WorkerPanicked)
        }
    };
    let elapsed = t0.elapsed();
    // Plots are free again before anyone can observe the report.
    drop(guard);
    let report = MutationReport {
        kind,
        lock: Some(lock),
        elapsed,
        result,
    };
    log_report(world, &report);
    reply.deliver(report);
}

fn voxel_failure(f: TaskFailure) -> MutationError {
    MutationError::Voxel {
        source: f.source,
        written: f.written,
    }
}

fn run_task(plan: &TaskPlan, world: &MutationWorld) -> Result<MutationData, MutationError> {
    let backend = world.backend.as_ref();
    match plan {
        TaskPlan::Biome(set, biome) => {
            tasks::change_biome(backend, &world.layout, set, *biome).map_err(voxel_failure)?;
            Ok(MutationData::Biome {
                biome: *biome,
                plots: set.clone(),
            })
        }
        TaskPlan::Border(set, material) => {
            tasks::change_border(backend, &world.layout, set, *material)
                .map_err(voxel_failure)?;
            Ok(MutationData::Border {
                material: *material,
                plots: set.clone(),
            })
        }
        TaskPlan::Merge(plan) => {
            tasks::merge_plots(backend, &world.layout, plan).map_err(voxel_failure)?;
            let plots = world
                .registry
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .commit_merge(plan)?;
            Ok(MutationData::Merge { plots })
        }
    }
}

fn log_report(world: &MutationWorld, report: &MutationReport) {
    let data = match &report.result {
        Ok(data) => data,
        Err(MutationError::Voxel { source, written }) => {
            log_voxel_failure(world, report, source, *written);
            return;
        }
        Err(err) => {
            log::warn!("{} in world {} failed: {}", report.kind, world.name, err);
            return;
        }
    };
    let plots = data.plots();
    let what = match data {
        MutationData::Biome { biome, .. } => format!(
            "Changing plot biome to {} (ID: {}) in world {}",
            world.biomes.name_of(*biome),
            biome.0,
            world.name
        ),
        MutationData::Border { material, .. } => format!(
            "Changing plot border to {} in world {}",
            world.palette.name(*material).unwrap_or("unknown"),
            world.name
        ),
        MutationData::Merge { .. } => format!("Merging plots in world {}", world.name),
    };
    log::debug!(
        "{} took {} ({}ms) for {} plot(s): {}.",
        what,
        report.elapsed_string(),
        report.elapsed_millis(),
        plots.len(),
        plots.describe()
    );
}

fn log_voxel_failure(world: &MutationWorld, report: &MutationReport, source: &VoxelError, written: u64) {
    log::warn!(
        "{} in world {} stopped after {} write(s) and {}: {}",
        report.kind,
        world.name,
        written,
        report.elapsed_string(),
        source
    );
}
