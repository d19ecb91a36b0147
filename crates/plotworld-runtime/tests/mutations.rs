use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crossbeam_channel::unbounded;
use plotworld_blocks::{BiomeCatalog, BiomeId, Material, MaterialPalette};
use plotworld_chunk::{
    ChunkBuf, MemoryBackend, PlotGenerator, VoxelBackend, VoxelError,
};
use plotworld_geom::{Direction, PlotCoord};
use plotworld_plots::{LockKind, LockManager, PlotRegistry};
use plotworld_runtime::{
    MutationData, MutationError, MutationRequest, MutationRuntime, MutationWorld, RuntimeConfig,
};
use plotworld_world::{ChunkCoord, WorldLayout};

/// Passes through to a memory backend until its write budget runs out.
struct FailingBackend {
    inner: Arc<MemoryBackend>,
    budget: AtomicU64,
}

impl FailingBackend {
    fn spend(&self) -> Result<(), VoxelError> {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(1))
            .map(|_| ())
            .map_err(|_| VoxelError::Io("injected failure".into()))
    }
}

impl VoxelBackend for FailingBackend {
    fn min_y(&self) -> i32 {
        self.inner.min_y()
    }

    fn max_y(&self) -> i32 {
        self.inner.max_y()
    }

    fn set_voxel(
        &self,
        chunk: ChunkCoord,
        x: usize,
        y: i32,
        z: usize,
        material: Material,
    ) -> Result<(), VoxelError> {
        self.spend()?;
        self.inner.set_voxel(chunk, x, y, z, material)
    }

    fn voxel(&self, chunk: ChunkCoord, x: usize, y: i32, z: usize) -> Result<Material, VoxelError> {
        self.inner.voxel(chunk, x, y, z)
    }

    fn set_biome(&self, chunk: ChunkCoord, x: usize, z: usize, biome: BiomeId) -> Result<(), VoxelError> {
        self.spend()?;
        self.inner.set_biome(chunk, x, z, biome)
    }

    fn biome(&self, chunk: ChunkCoord, x: usize, z: usize) -> Result<BiomeId, VoxelError> {
        self.inner.biome(chunk, x, z)
    }

    fn store_chunk(&self, buf: ChunkBuf) -> Result<(), VoxelError> {
        self.inner.store_chunk(buf)
    }
}

struct Fixture {
    layout: WorldLayout,
    memory: Arc<MemoryBackend>,
    registry: Arc<RwLock<PlotRegistry>>,
    locks: Arc<LockManager>,
    runtime: MutationRuntime,
}

fn generated_memory(layout: &WorldLayout) -> Arc<MemoryBackend> {
    let memory = Arc::new(MemoryBackend::for_layout(layout));
    let generator = PlotGenerator::new(*layout);
    memory
        .ensure_generated(&generator, ChunkCoord::new(-1, -1), ChunkCoord::new(5, 5))
        .unwrap();
    memory
}

fn fixture_with(claims: &[(i32, i32)], budget: Option<u64>, config: RuntimeConfig) -> Fixture {
    let layout = WorldLayout::with_defaults().unwrap();
    let memory = generated_memory(&layout);
    let backend: Arc<dyn VoxelBackend> = match budget {
        Some(b) => Arc::new(FailingBackend {
            inner: Arc::clone(&memory),
            budget: AtomicU64::new(b),
        }),
        None => Arc::clone(&memory) as Arc<dyn VoxelBackend>,
    };
    let mut registry = PlotRegistry::new("plots");
    for (x, z) in claims {
        registry.claim(PlotCoord::new(*x, *z), Some("steve"));
    }
    let registry = Arc::new(RwLock::new(registry));
    let locks = Arc::new(LockManager::new());
    let world = MutationWorld::new(layout, backend, Arc::clone(&registry), Arc::clone(&locks));
    let runtime = MutationRuntime::new(world, &config).unwrap();
    Fixture {
        layout,
        memory,
        registry,
        locks,
        runtime,
    }
}

fn fixture(claims: &[(i32, i32)]) -> Fixture {
    fixture_with(
        claims,
        None,
        RuntimeConfig {
            workers: 2,
            ..RuntimeConfig::default()
        },
    )
}

fn desert() -> BiomeId {
    BiomeCatalog::vanilla().get("DESERT").unwrap()
}

fn cobblestone() -> Material {
    MaterialPalette::default().get_id("cobblestone").unwrap()
}

#[test]
fn biome_change_covers_the_plot_and_frees_the_lock() {
    let f = fixture(&[(0, 0)]);
    let report = f
        .runtime
        .request(MutationRequest::Biome {
            plot: PlotCoord::new(0, 0),
            biome: desert(),
        })
        .wait();
    assert!(report.success(), "{:?}", report.result);
    assert_eq!(report.kind, LockKind::Biome);
    assert!(report.lock.is_some());
    assert_eq!(f.memory.biome_at(0, 0).unwrap(), desert());
    assert_eq!(f.memory.biome_at(31, 31).unwrap(), desert());
    assert_eq!(f.memory.biome_at(32, 0).unwrap(), f.layout.biome);
    assert_eq!(f.memory.biome_at(-1, 5).unwrap(), f.layout.biome);
    assert_eq!(f.locks.locked_plots(), 0);
}

#[test]
fn border_change_rewrites_only_the_seam_around_the_plot() {
    let f = fixture(&[(1, 0)]);
    let y = f.layout.border_y();
    let report = f
        .runtime
        .request(MutationRequest::Border {
            plot: PlotCoord::new(1, 0),
            material: cobblestone(),
        })
        .wait();
    assert!(report.success(), "{:?}", report.result);
    // plot (1, 0) spans x 39..=70, z 0..=31
    assert_eq!(f.memory.voxel_at(38, y, 10).unwrap(), cobblestone());
    assert_eq!(f.memory.voxel_at(50, y, -1).unwrap(), cobblestone());
    assert_eq!(f.memory.voxel_at(38, y, -1).unwrap(), cobblestone());
    assert_eq!(f.memory.voxel_at(71, y, 10).unwrap(), Material::AIR);
    // neighbouring plot's seam is untouched
    assert_eq!(f.memory.voxel_at(-1, y, 10).unwrap(), f.layout.border);
    assert_eq!(f.memory.voxel_at(77, y, 10).unwrap(), f.layout.border);
    assert_eq!(f.locks.locked_plots(), 0);
}

#[test]
fn merge_turns_the_shared_road_into_plot_terrain() {
    let f = fixture(&[(0, 0), (1, 0)]);
    let y = f.layout.border_y();
    let report = f
        .runtime
        .request(MutationRequest::Merge {
            plot: PlotCoord::new(0, 0),
            direction: Direction::East,
        })
        .wait();
    let Ok(MutationData::Merge { plots }) = &report.result else {
        panic!("merge failed: {:?}", report.result);
    };
    assert_eq!(plots.len(), 2);
    assert!(
        f.registry
            .read()
            .unwrap()
            .are_merged(PlotCoord::new(0, 0), PlotCoord::new(1, 0))
    );

    assert_eq!(f.memory.voxel_at(35, f.layout.ground_height, 10).unwrap(), f.layout.plot_floor);
    assert_eq!(f.memory.voxel_at(35, f.layout.min_y, 10).unwrap(), f.layout.plot_bottom);
    assert_eq!(f.memory.voxel_at(35, 30, 10).unwrap(), f.layout.plot_fill);
    assert_eq!(f.memory.voxel_at(38, y, 10).unwrap(), Material::AIR);
    // road outside the merged strip keeps its seam
    assert_eq!(f.memory.voxel_at(38, y, -1).unwrap(), f.layout.border);
    assert_eq!(f.memory.voxel_at(35, f.layout.ground_height, 35).unwrap(), f.layout.road);

    let report = f
        .runtime
        .request(MutationRequest::Biome {
            plot: PlotCoord::new(1, 0),
            biome: desert(),
        })
        .wait();
    assert!(report.success());
    assert_eq!(report.result.unwrap().plots().len(), 2);
    assert_eq!(f.memory.biome_at(35, 10).unwrap(), desert());
    assert_eq!(f.memory.biome_at(5, 5).unwrap(), desert());

    let report = f
        .runtime
        .request(MutationRequest::Border {
            plot: PlotCoord::new(0, 0),
            material: cobblestone(),
        })
        .wait();
    assert!(report.success());
    assert_eq!(f.memory.voxel_at(38, y, 10).unwrap(), Material::AIR);
    assert_eq!(f.memory.voxel_at(-1, y, 10).unwrap(), cobblestone());
    assert_eq!(f.memory.voxel_at(60, y, -1).unwrap(), cobblestone());
}

#[test]
fn merging_two_rows_fills_the_junction() {
    let f = fixture(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
    let y = f.layout.border_y();
    let merge = |plot: (i32, i32), direction| {
        let report = f
            .runtime
            .request(MutationRequest::Merge {
                plot: PlotCoord::new(plot.0, plot.1),
                direction,
            })
            .wait();
        assert!(report.success(), "{:?}", report.result);
        report
    };
    merge((0, 0), Direction::East);
    merge((0, 1), Direction::East);
    // junction stays road until both rows join
    assert_eq!(f.memory.voxel_at(35, f.layout.ground_height, 35).unwrap(), f.layout.road);

    let report = merge((0, 0), Direction::South);
    assert_eq!(report.result.unwrap().plots().len(), 4);
    assert!(
        f.registry
            .read()
            .unwrap()
            .are_merged(PlotCoord::new(0, 0), PlotCoord::new(1, 1))
    );
    // crossing square between x 32..=38 and z 32..=38
    for (x, z) in [(35, 35), (38, 38), (32, 32)] {
        assert_eq!(f.memory.voxel_at(x, y, z).unwrap(), Material::AIR, "{x},{z}");
        assert_eq!(
            f.memory.voxel_at(x, f.layout.ground_height, z).unwrap(),
            f.layout.plot_floor,
            "{x},{z}"
        );
    }
    // strips between the rows are plot floor as well
    assert_eq!(f.memory.voxel_at(10, f.layout.ground_height, 35).unwrap(), f.layout.plot_floor);
    assert_eq!(f.memory.voxel_at(50, f.layout.ground_height, 35).unwrap(), f.layout.plot_floor);
    assert_eq!(f.locks.locked_plots(), 0);
}

#[test]
fn merge_reports_reason_tags() {
    let f = fixture(&[(0, 0), (1, 0)]);
    let merge = |plot: (i32, i32), direction| {
        f.runtime
            .request(MutationRequest::Merge {
                plot: PlotCoord::new(plot.0, plot.1),
                direction,
            })
            .wait()
    };
    assert!(matches!(
        merge((0, 0), Direction::North).result,
        Err(MutationError::InvalidAdjacency { .. })
    ));
    assert!(matches!(
        merge((4, 4), Direction::North).result,
        Err(MutationError::NotClaimed(_))
    ));
    assert!(merge((0, 0), Direction::East).success());
    let again = merge((1, 0), Direction::West);
    assert!(matches!(again.result, Err(MutationError::AlreadyMerged { .. })));
    assert!(again.lock.is_none());
    assert_eq!(f.locks.locked_plots(), 0);
}

#[test]
fn group_limit_rejects_before_locking() {
    let f = fixture_with(
        &[(0, 0), (1, 0)],
        None,
        RuntimeConfig {
            workers: 1,
            max_group_size: 1,
        },
    );
    let report = f
        .runtime
        .request(MutationRequest::Merge {
            plot: PlotCoord::new(0, 0),
            direction: Direction::East,
        })
        .wait();
    assert_eq!(
        report.result,
        Err(MutationError::GroupTooLarge { size: 2, limit: 1 })
    );
}

#[test]
fn busy_plot_set_is_rejected_immediately() {
    let f = fixture(&[(0, 0)]);
    let set = f.registry.read().unwrap().plot_set(PlotCoord::new(0, 0));
    let guard = f.locks.acquire(LockKind::Merge, &[&set]).unwrap();
    let request = MutationRequest::Biome {
        plot: PlotCoord::new(0, 0),
        biome: desert(),
    };
    let handle = f.runtime.request(request);
    let report = handle.try_result().expect("rejection is synchronous");
    assert!(matches!(report.result, Err(MutationError::PlotSetLocked(_))));
    assert_eq!(report.elapsed_millis(), 0);
    assert_eq!(f.memory.biome_at(0, 0).unwrap(), f.layout.biome);

    drop(guard);
    assert!(f.runtime.request(request).wait().success());
}

#[test]
fn backend_failure_releases_the_lock_and_reports_progress() {
    let f = fixture_with(&[(0, 0)], Some(10), RuntimeConfig::default());
    let request = MutationRequest::Biome {
        plot: PlotCoord::new(0, 0),
        biome: desert(),
    };
    let report = f.runtime.request(request).wait();
    match report.result {
        Err(MutationError::Voxel { written, .. }) => assert_eq!(written, 10),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(f.locks.locked_plots(), 0);
    // Admitted again rather than rejected as locked.
    let report = f.runtime.request(request).wait();
    assert!(matches!(report.result, Err(MutationError::Voxel { written: 0, .. })));
}

#[test]
fn failed_merge_leaves_groups_untouched() {
    let f = fixture_with(&[(0, 0), (0, 1)], Some(100), RuntimeConfig::default());
    let report = f
        .runtime
        .request(MutationRequest::Merge {
            plot: PlotCoord::new(0, 0),
            direction: Direction::South,
        })
        .wait();
    assert!(matches!(report.result, Err(MutationError::Voxel { .. })));
    let registry = f.registry.read().unwrap();
    assert!(!registry.are_merged(PlotCoord::new(0, 0), PlotCoord::new(0, 1)));
    assert_eq!(f.locks.locked_plots(), 0);
}

#[test]
fn disjoint_requests_all_complete_through_callbacks() {
    let claims: Vec<(i32, i32)> = (0..4).flat_map(|x| (0..2).map(move |z| (x, z))).collect();
    let f = fixture_with(
        &claims,
        None,
        RuntimeConfig {
            workers: 4,
            ..RuntimeConfig::default()
        },
    );
    let (tx, rx) = unbounded();
    for (x, z) in &claims {
        let tx = tx.clone();
        f.runtime.request_with(
            MutationRequest::Border {
                plot: PlotCoord::new(*x, *z),
                material: cobblestone(),
            },
            move |report| {
                let _ = tx.send(report);
            },
        );
    }
    drop(tx);
    let reports: Vec<_> = rx.iter().collect();
    assert_eq!(reports.len(), claims.len());
    assert!(reports.iter().all(|r| r.success()));
    assert_eq!(f.locks.locked_plots(), 0);
}

#[test]
fn handle_wait_timeout_returns_the_report() {
    let f = fixture(&[(2, 2)]);
    let handle = f.runtime.request(MutationRequest::Biome {
        plot: PlotCoord::new(2, 2),
        biome: BiomeId::OCEAN,
    });
    let report = handle
        .wait_timeout(Duration::from_secs(30))
        .expect("finished in time");
    assert!(report.success());
    assert!(!report.elapsed_string().is_empty());
}
