// Copyright @yucwang 2026

use crate::math::constants::{ Float, Vector3f };
use crate::wire::stream::{ WireError, WireWriter };

use std::sync::atomic::{ AtomicU32, Ordering };

/// Sentinel triangle index for intersections that carry no triangle id
/// (analytic shapes, proxy geometry).
pub const NO_TRIANGLE: u32 = u32::MAX;

// Accumulate a float into an atomic bit pattern. Retries until the
// compare-and-swap lands; total order of additions does not matter for the
// weighted mean read back later.
fn atomic_add(cell: &AtomicU32, delta: Float) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = Float::from_bits(current) + delta;
        match cell.compare_exchange_weak(current, next.to_bits(), Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// One accumulation bin: a weighted running sum of RGB observations.
pub struct HeatmapBin {
    weight_sum: AtomicU32,
    value_sum: [AtomicU32; 3],
}

impl HeatmapBin {
    fn new() -> Self {
        Self {
            weight_sum: AtomicU32::new(0.0f32.to_bits()),
            value_sum: [
                AtomicU32::new(0.0f32.to_bits()),
                AtomicU32::new(0.0f32.to_bits()),
                AtomicU32::new(0.0f32.to_bits()),
            ],
        }
    }

    fn add(&self, value: &Vector3f, weight: Float) {
        atomic_add(&self.weight_sum, weight);
        for channel in 0..3 {
            atomic_add(&self.value_sum[channel], value[channel] * weight);
        }
    }

    /// Weighted mean, or `None` while no weight has accumulated. A bin
    /// without data is distinct from a bin averaging to zero.
    fn mean(&self) -> Option<Vector3f> {
        let weight = Float::from_bits(self.weight_sum.load(Ordering::Relaxed));
        if weight <= 0.0 {
            return None;
        }

        let inv_weight = 1.0 / weight;
        Some(Vector3f::new(
            Float::from_bits(self.value_sum[0].load(Ordering::Relaxed)) * inv_weight,
            Float::from_bits(self.value_sum[1].load(Ordering::Relaxed)) * inv_weight,
            Float::from_bits(self.value_sum[2].load(Ordering::Relaxed)) * inv_weight,
        ))
    }
}

/// Distribute the global bin budget over meshes proportional to surface
/// area: mesh i receives floor(budget * area_i / total_area) bins. The sum
/// never exceeds the budget; larger meshes trade resolution for the fixed
/// memory ceiling.
pub fn allocate_budgets(surface_areas: &[Float], subdivision_budget: u32) -> Vec<u32> {
    let total_area: Float = surface_areas.iter().sum();
    if total_area <= 0.0 {
        return vec![0; surface_areas.len()];
    }

    let inv_total_area = 1.0 / total_area;
    surface_areas
        .iter()
        .map(|area| (subdivision_budget as Float * (area * inv_total_area)) as u32)
        .collect()
}

struct MeshBins {
    bins: Vec<HeatmapBin>,
}

/// Bounded-memory spatial accumulator. Bins are addressed by
/// (mesh id, triangle index); all writers go through lock-free atomic
/// accumulation, so concurrent render workers never serialize here.
pub struct Heatmap {
    meshes: Vec<MeshBins>,
}

impl Heatmap {
    pub fn initialize(budgets: &[u32]) -> Self {
        let meshes = budgets
            .iter()
            .map(|count| {
                let mut bins = Vec::with_capacity(*count as usize);
                for _ in 0..*count {
                    bins.push(HeatmapBin::new());
                }
                MeshBins { bins }
            })
            .collect();

        Self { meshes }
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn bin_count(&self, mesh_id: u32) -> usize {
        self.meshes.get(mesh_id as usize).map(|m| m.bins.len()).unwrap_or(0)
    }

    /// Accumulate one observation. Returns false when the sample was
    /// dropped: unknown mesh, or a triangle index outside the mesh's
    /// allocated bins (stale topology, or a budget coarser than the mesh).
    /// No re-binning onto neighboring bins is attempted; dropped samples
    /// are a known limitation of triangle-granularity binning.
    pub fn add_sample(&self,
                      mesh_id: u32,
                      _p: Vector3f,
                      triangle_index: u32,
                      value: Vector3f,
                      weight: Float) -> bool {
        let mesh = match self.meshes.get(mesh_id as usize) {
            Some(mesh) => mesh,
            None => return false,
        };

        let bin = match mesh.bins.get(triangle_index as usize) {
            Some(bin) => bin,
            None => return false,
        };

        bin.add(&value, weight);
        true
    }

    pub fn bin_mean(&self, mesh_id: u32, triangle_index: u32) -> Option<Vector3f> {
        self.meshes
            .get(mesh_id as usize)
            .and_then(|mesh| mesh.bins.get(triangle_index as usize))
            .and_then(|bin| bin.mean())
    }

    /// Per-bin averaged values for transfer to the client. Concurrent
    /// writers may land between channel reads; the snapshot is best effort
    /// by design.
    pub fn snapshot(&self) -> HeatmapSnapshot {
        let meshes = self.meshes
            .iter()
            .map(|mesh| mesh.bins.iter().map(|bin| bin.mean()).collect())
            .collect();

        HeatmapSnapshot { meshes }
    }
}

pub struct HeatmapSnapshot {
    pub meshes: Vec<Vec<Option<Vector3f>>>,
}

impl HeatmapSnapshot {
    /// Wire layout: mesh count, then per mesh the bin count and per bin a
    /// has-data flag followed by three floats (zeros when absent).
    pub fn write(&self, stream: &mut WireWriter) -> Result<(), WireError> {
        stream.write_u32(self.meshes.len() as u32)?;
        for bins in self.meshes.iter() {
            stream.write_u32(bins.len() as u32)?;
            for bin in bins.iter() {
                match bin {
                    Some(mean) => {
                        stream.write_bool(true)?;
                        stream.write_f32(mean.x)?;
                        stream.write_f32(mean.y)?;
                        stream.write_f32(mean.z)?;
                    }
                    None => {
                        stream.write_bool(false)?;
                        stream.write_f32(0.0)?;
                        stream.write_f32(0.0)?;
                        stream.write_f32(0.0)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_budget_allocation_proportional_to_area() {
        let budgets = allocate_budgets(&[30.0, 70.0], 1024);
        assert_eq!(budgets, vec![307, 716]);
        assert!(budgets.iter().sum::<u32>() <= 1024);
    }

    #[test]
    fn test_budget_allocation_degenerate_area() {
        let budgets = allocate_budgets(&[0.0, 0.0], 512);
        assert_eq!(budgets, vec![0, 0]);
    }

    #[test]
    fn test_weighted_mean_accumulation() {
        let heatmap = Heatmap::initialize(&[8]);
        let p = Vector3f::zeros();

        assert!(heatmap.add_sample(0, p, 5, Vector3f::new(1.0, 1.0, 1.0), 2.0));
        assert!(heatmap.add_sample(0, p, 5, Vector3f::new(0.0, 0.0, 0.0), 2.0));

        let mean = heatmap.bin_mean(0, 5).expect("bin has data");
        assert!((mean - Vector3f::new(0.5, 0.5, 0.5)).norm() < 1e-6);
    }

    #[test]
    fn test_empty_bin_reports_no_data() {
        let heatmap = Heatmap::initialize(&[4]);
        assert_eq!(heatmap.bin_mean(0, 0), None);

        let snapshot = heatmap.snapshot();
        assert_eq!(snapshot.meshes.len(), 1);
        assert!(snapshot.meshes[0].iter().all(|bin| bin.is_none()));
    }

    #[test]
    fn test_out_of_range_samples_are_dropped() {
        let heatmap = Heatmap::initialize(&[4]);
        let p = Vector3f::zeros();
        let v = Vector3f::new(1.0, 0.0, 0.0);

        assert!(!heatmap.add_sample(3, p, 0, v, 1.0));
        assert!(!heatmap.add_sample(0, p, 4, v, 1.0));
        assert!(!heatmap.add_sample(0, p, NO_TRIANGLE, v, 1.0));
        assert!(heatmap.snapshot().meshes[0].iter().all(|bin| bin.is_none()));
    }

    #[test]
    fn test_concurrent_accumulation_is_order_independent() {
        let heatmap = Heatmap::initialize(&[1]);
        let thread_count = 8;
        let adds_per_thread = 1000;

        thread::scope(|scope| {
            for t in 0..thread_count {
                let heatmap = &heatmap;
                scope.spawn(move || {
                    let value = Vector3f::new(t as Float, 1.0, 0.0);
                    for _ in 0..adds_per_thread {
                        heatmap.add_sample(0, Vector3f::zeros(), 0, value, 1.0);
                    }
                });
            }
        });

        let mean = heatmap.bin_mean(0, 0).expect("bin has data");
        // mean of 0..thread_count, each contributing equally
        let expected = (0..thread_count).sum::<i32>() as Float / thread_count as Float;
        assert!((mean.x - expected).abs() < 1e-2);
        assert!((mean.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_snapshot_wire_layout() {
        let heatmap = Heatmap::initialize(&[2]);
        heatmap.add_sample(0, Vector3f::zeros(), 1, Vector3f::new(0.5, 0.5, 0.5), 1.0);

        let mut buffer = Vec::new();
        {
            let mut writer = WireWriter::new(&mut buffer);
            heatmap.snapshot().write(&mut writer).unwrap();
        }

        // mesh count + bin count + 2 * (flag + 3 floats)
        assert_eq!(buffer.len(), 4 + 4 + 2 * 13);
        assert_eq!(buffer[8], 0); // first bin carries no data
        assert_eq!(buffer[21], 1); // second bin does
    }
}
