// Copyright @yucwang 2026

use crate::capture::heatmap::{ allocate_budgets, Heatmap, HeatmapSnapshot, NO_TRIANGLE };
use crate::capture::path_data::{ AuxValue, PathSample };
use crate::capture::registry::ShapeRegistry;
use crate::core::interface::{ ShapeDescriptor, ShapeId };
use crate::math::constants::{ Float, Vector2f, Vector3f };

use log::{ debug, error, info, warn };
use parking_lot::RwLock;

use std::cell::RefCell;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{ AtomicBool, AtomicPtr, Ordering };

/// Receives completed path samples for relay to the debugging client.
pub trait SampleSink: Send + Sync {
    fn push(&self, sample: PathSample);
}

thread_local! {
    static PATH_CONTEXT: RefCell<PathContext> = RefCell::new(PathContext::default());
}

// The in-flight sample of the calling worker thread. Thread-local so
// concurrent workers can never interleave writes into one logical sample.
#[derive(Default)]
struct PathContext {
    sample: PathSample,
    active: bool,
}

fn with_context<F: FnOnce(&mut PathSample)>(f: F) {
    PATH_CONTEXT.with(|context| {
        let mut context = context.borrow_mut();
        context.active = true;
        f(&mut context.sample);
    });
}

#[derive(Default)]
struct CaptureState {
    registry: Option<ShapeRegistry>,
    heatmap: Option<Heatmap>,
}

static INSTANCE: AtomicPtr<DataBridge> = AtomicPtr::new(ptr::null_mut());

/// Process-wide capture point for per-sample telemetry. Every render
/// worker thread reports through the unique instance; the remote client
/// reads aggregated state back out of it. Steady-state operations touch an
/// atomic flag, a thread-local context and lock-free heatmap bins; the
/// capture state lock is only ever write-held during scene load.
pub struct DataBridge {
    collecting: AtomicBool,
    precondition_reported: AtomicBool,
    state: RwLock<CaptureState>,
    sink: RwLock<Option<Arc<dyn SampleSink>>>,
}

impl DataBridge {
    fn new() -> Self {
        Self {
            collecting: AtomicBool::new(false),
            precondition_reported: AtomicBool::new(false),
            state: RwLock::new(CaptureState::default()),
            sink: RwLock::new(None),
        }
    }

    /// The unique instance, created exactly once even under concurrent
    /// first access: read the published pointer, construct a candidate
    /// only on miss, publish with a single compare-and-swap and discard
    /// the losing candidate. No lock on the steady-state read.
    pub fn instance() -> &'static DataBridge {
        let existing = INSTANCE.load(Ordering::Acquire);
        if !existing.is_null() {
            return unsafe { &*existing };
        }

        let candidate = Box::into_raw(Box::new(DataBridge::new()));
        match INSTANCE.compare_exchange(ptr::null_mut(), candidate, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => unsafe { &*candidate },
            Err(winner) => {
                // another thread published first
                unsafe { drop(Box::from_raw(candidate)); }
                unsafe { &*winner }
            }
        }
    }

    /* per-thread path context */

    /// Begin capturing sample `path_index` on the calling thread. A still
    /// active previous sample is committed first.
    pub fn set_path_idx(&self, path_index: u32) {
        // the sink runs outside the context borrow
        let completed = PATH_CONTEXT.with(|context| {
            let mut context = context.borrow_mut();
            let completed = if context.active {
                Some(std::mem::take(&mut context.sample))
            } else {
                None
            };
            context.sample = PathSample::new(path_index);
            context.active = true;
            completed
        });

        if let Some(sample) = completed {
            self.forward(sample);
        }
    }

    /// Commit the calling thread's sample to the client sink.
    pub fn commit_path(&self) {
        let completed = PATH_CONTEXT.with(|context| {
            let mut context = context.borrow_mut();
            if context.active {
                context.active = false;
                Some(std::mem::take(&mut context.sample))
            } else {
                None
            }
        });

        if let Some(sample) = completed {
            self.forward(sample);
        }
    }

    fn forward(&self, sample: PathSample) {
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink.push(sample);
        }
    }

    pub fn set_path_origin(&self, p: Vector3f) {
        with_context(|sample| sample.origin = Some(p));
    }

    pub fn set_intersection_pos(&self, p: Vector3f) {
        with_context(|sample| sample.intersection_pos = Some(p));
    }

    pub fn set_next_event_estimation_pos(&self, p: Vector3f, visible: bool) {
        with_context(|sample| {
            sample.nee_pos = Some(p);
            sample.nee_visible = visible;
        });
    }

    pub fn set_intersection_estimate(&self, c: Vector3f) {
        with_context(|sample| sample.intersection_estimate = Some(c));
    }

    pub fn set_intersection_emission(&self, c: Vector3f) {
        with_context(|sample| sample.intersection_emission = Some(c));
    }

    pub fn set_final_estimate(&self, c: Vector3f) {
        with_context(|sample| sample.final_estimate = Some(c));
    }

    /* named aux values, normalized to the closed tagged payload set */

    pub fn add_intersection_data(&self, name: &str, value: AuxValue) {
        with_context(|sample| upsert(&mut sample.intersection_data, name, value));
    }

    pub fn add_intersection_vec2(&self, name: &str, v: Vector2f) {
        self.add_intersection_data(name, AuxValue::from_vec2(v));
    }

    pub fn add_intersection_vec3(&self, name: &str, v: Vector3f) {
        self.add_intersection_data(name, AuxValue::from_vec3(v));
    }

    pub fn add_intersection_color(&self, name: &str, c: Vector3f) {
        self.add_intersection_data(name, AuxValue::from_color(c));
    }

    pub fn add_path_data(&self, name: &str, value: AuxValue) {
        with_context(|sample| upsert(&mut sample.path_data, name, value));
    }

    pub fn add_path_vec2(&self, name: &str, v: Vector2f) {
        self.add_path_data(name, AuxValue::from_vec2(v));
    }

    pub fn add_path_vec3(&self, name: &str, v: Vector3f) {
        self.add_path_data(name, AuxValue::from_vec3(v));
    }

    pub fn add_path_color(&self, name: &str, c: Vector3f) {
        self.add_path_data(name, AuxValue::from_color(c));
    }

    /* client sink */

    pub fn set_client_sink(&self, sink: Option<Arc<dyn SampleSink>>) {
        *self.sink.write() = sink;
    }

    /* heatmap capture */

    pub fn set_collecting(&self, collecting: bool) {
        self.collecting.store(collecting, Ordering::Relaxed);
    }

    pub fn is_collecting(&self) -> bool {
        self.collecting.load(Ordering::Relaxed)
    }

    /// Build the shape registry for a freshly loaded scene. Idempotent per
    /// scene load; replaces any previous mapping.
    pub fn configure_shape_mapping(&self, shapes: &[ShapeDescriptor]) {
        let mut state = self.state.write();
        state.registry = Some(ShapeRegistry::build(shapes));
        self.precondition_reported.store(false, Ordering::Relaxed);
    }

    /// Build the shape registry and allocate heatmap bins proportional to
    /// each mesh's share of the total scene surface area.
    pub fn init_heatmap(&self, shapes: &[ShapeDescriptor], subdivision_budget: u32) {
        let areas: Vec<Float> = shapes.iter().map(|s| s.surface_area).collect();
        let budgets = allocate_budgets(&areas, subdivision_budget);
        let total_bins: u32 = budgets.iter().sum();

        let mut state = self.state.write();
        state.registry = Some(ShapeRegistry::build(shapes));
        state.heatmap = Some(Heatmap::initialize(&budgets));
        self.precondition_reported.store(false, Ordering::Relaxed);

        info!("heatmap initialized: {} meshes, {} of {} bins allocated",
              shapes.len(), total_bins, subdivision_budget);
    }

    pub fn has_shape_mapping(&self) -> bool {
        self.state.read().registry.is_some()
    }

    /// Route one observation into the heatmap. Soft-fails (log and
    /// discard) on a missing shape, an unknown shape or a sample without a
    /// triangle id; reports a configuration error once if no mapping was
    /// ever built, since that means the capture pipeline was never wired
    /// up at scene load.
    pub fn add_heatmap_data(&self,
                            shape: Option<ShapeId>,
                            primitive_index: u32,
                            p: Vector3f,
                            value: Vector3f,
                            weight: Float) {
        if !self.collecting.load(Ordering::Relaxed) {
            return;
        }

        let shape = match shape {
            Some(shape) => shape,
            None => {
                warn!("discarding heatmap sample without shape");
                return;
            }
        };

        let state = self.state.read();
        let registry = match state.registry.as_ref() {
            Some(registry) => registry,
            None => {
                if !self.precondition_reported.swap(true, Ordering::Relaxed) {
                    error!("heatmap sample received before any shape mapping was configured");
                }
                return;
            }
        };

        let mesh_id = match registry.mesh_id(shape) {
            Some(mesh_id) => mesh_id,
            None => {
                warn!("discarding heatmap sample with unknown shape");
                return;
            }
        };

        if primitive_index == NO_TRIANGLE {
            debug!("discarding heatmap sample without triangle id");
            return;
        }

        let primitive_count = registry.primitive_count(mesh_id).unwrap_or(0);
        if primitive_index >= primitive_count {
            debug!("discarding heatmap sample with stale triangle index {}", primitive_index);
            return;
        }

        if let Some(heatmap) = state.heatmap.as_ref() {
            heatmap.add_sample(mesh_id, p, primitive_index, value, weight);
        }
    }

    /// Per-bin averaged values for transfer, or `None` when the heatmap
    /// was never initialized.
    pub fn heatmap_snapshot(&self) -> Option<HeatmapSnapshot> {
        self.state.read().heatmap.as_ref().map(|heatmap| heatmap.snapshot())
    }
}

fn upsert(values: &mut Vec<(String, AuxValue)>, name: &str, value: AuxValue) {
    for entry in values.iter_mut() {
        if entry.0 == name {
            entry.1 = value;
            return;
        }
    }
    values.push((name.to_string(), value));
}
