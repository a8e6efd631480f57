// Copyright @yucwang 2026

// Standalone smoke server: serves the introspection protocol over a tiny
// synthetic scene so a client can be exercised without a full renderer.

use tiramisu::capture::bridge::DataBridge;
use tiramisu::core::camera::CameraData;
use tiramisu::core::cancel::CancelToken;
use tiramisu::core::interface::{ RenderInterface, ShapeDescriptor, ShapeId };
use tiramisu::core::mesh::{ MeshData, SurfaceRole };
use tiramisu::core::pipeline::{ PipelineError, ProbeScene, ScenePipeline };
use tiramisu::core::properties::Properties;
use tiramisu::math::bitmap::Bitmap;
use tiramisu::math::constants::{ Float, Vector2f, Vector3f, Vector3i };
use tiramisu::math::transform::Transform;
use tiramisu::probes::spherical_view::SphericalView;
use tiramisu::server::{ DebugServer, ServerConfig };

use std::env;
use std::sync::Arc;

const FLOOR_SHAPE: ShapeId = ShapeId(1);
const LIGHT_SHAPE: ShapeId = ShapeId(2);

struct DemoRenderer {
    sample_count: u32,
}

impl DemoRenderer {
    fn new() -> Self {
        Self { sample_count: 4 }
    }

    fn floor_mesh() -> MeshData {
        let vertices = vec![
            Vector3f::new(-2.0, -2.0, 0.0),
            Vector3f::new(2.0, -2.0, 0.0),
            Vector3f::new(2.0, 2.0, 0.0),
            Vector3f::new(-2.0, 2.0, 0.0),
        ];
        let triangles = vec![Vector3i::new(0, 1, 2), Vector3i::new(0, 2, 3)];
        let role = SurfaceRole::Bsdf {
            diffuse: Vector3f::new(0.6, 0.6, 0.6),
            specular: Vector3f::zeros(),
        };
        MeshData::new(vertices, triangles, role)
    }

    fn light_mesh() -> MeshData {
        let vertices = vec![
            Vector3f::new(-0.5, -0.5, 3.0),
            Vector3f::new(0.5, -0.5, 3.0),
            Vector3f::new(0.5, 0.5, 3.0),
            Vector3f::new(-0.5, 0.5, 3.0),
        ];
        let triangles = vec![Vector3i::new(0, 1, 2), Vector3i::new(0, 2, 3)];
        MeshData::new(vertices, triangles, SurfaceRole::Emitter)
    }
}

impl RenderInterface for DemoRenderer {
    fn renderer_name(&self) -> String {
        String::from("tiramisu demo renderer")
    }

    fn scene_name(&self) -> String {
        String::from("two_quads")
    }

    fn output_path(&self) -> String {
        String::from("two_quads.exr")
    }

    fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn set_sample_count(&mut self, sample_count: u32) {
        self.sample_count = sample_count.max(1);
    }

    fn worker_count(&self) -> usize {
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }

    fn render_image(&mut self) {
        log::info!("demo renderer has no primary render pass");
    }

    fn render_pixel(&mut self, x: u32, y: u32) {
        // fabricate one captured path per sample so the client sees a
        // plausible stream for any pixel
        let bridge = DataBridge::instance();
        let origin = Vector3f::new(0.0, -4.0, 1.0);

        for sample in 0..self.sample_count {
            let u = (x as Float + 0.5) / 64.0;
            let v = (y as Float + 0.5) / 64.0;
            let hit = Vector3f::new(4.0 * u - 2.0, 4.0 * v - 2.0, 0.0);
            let estimate = Vector3f::new(u, v, 0.5);

            bridge.set_path_idx(sample);
            bridge.set_path_origin(origin);
            bridge.set_intersection_pos(hit);
            bridge.set_next_event_estimation_pos(Vector3f::new(0.0, 0.0, 3.0), true);
            bridge.set_intersection_estimate(estimate);
            bridge.set_intersection_emission(Vector3f::zeros());
            bridge.set_final_estimate(estimate);
            bridge.add_path_vec2("pixel", Vector2f::new(x as Float, y as Float));
            bridge.add_intersection_color("albedo", Vector3f::new(0.6, 0.6, 0.6));

            let triangle = if u + v < 1.0 { 0 } else { 1 };
            bridge.add_heatmap_data(Some(FLOOR_SHAPE), triangle, hit, estimate, 1.0);
            bridge.commit_path();
        }
    }

    fn camera_data(&self) -> CameraData {
        let to_world = Transform::look_at(Vector3f::new(0.0, -4.0, 1.0),
                                          Vector3f::new(0.0, 0.0, 1.0),
                                          Vector3f::new(0.0, 0.0, 1.0));
        CameraData::from_transform(0.1, 100.0, 10.0, 40.0, &to_world)
    }

    fn mesh_data(&self) -> Vec<MeshData> {
        vec![Self::floor_mesh(), Self::light_mesh()]
    }

    fn shape_descriptors(&self) -> Vec<ShapeDescriptor> {
        vec![
            ShapeDescriptor { id: FLOOR_SHAPE, surface_area: 16.0, primitive_count: 2 },
            ShapeDescriptor { id: LIGHT_SHAPE, surface_area: 1.0, primitive_count: 2 },
        ]
    }
}

struct DemoPipeline;

struct DemoProbeScene {
    width: usize,
    height: usize,
}

impl ScenePipeline for DemoPipeline {
    fn clone_scene(&self) -> Result<Box<dyn ProbeScene>, PipelineError> {
        Ok(Box::new(DemoProbeScene { width: 0, height: 0 }))
    }
}

impl ProbeScene for DemoProbeScene {
    fn set_filter(&mut self, _props: &Properties) -> Result<(), PipelineError> {
        Ok(())
    }

    fn set_sensor(&mut self, _props: &Properties) -> Result<(), PipelineError> {
        Ok(())
    }

    fn set_film(&mut self, props: &Properties) -> Result<(), PipelineError> {
        self.width = props.get_int("width", 0) as usize;
        self.height = props.get_int("height", 0) as usize;
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::Construction("film resolution missing".to_string()));
        }
        Ok(())
    }

    fn set_sampler(&mut self, _props: &Properties) -> Result<(), PipelineError> {
        Ok(())
    }

    fn set_integrator(&mut self, _props: &Properties) -> Result<(), PipelineError> {
        Ok(())
    }

    fn render_blocking(&mut self, cancel: &CancelToken) -> Result<Bitmap, PipelineError> {
        let mut bitmap = Bitmap::new(self.width, self.height);
        for y in 0..self.height {
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            for x in 0..self.width {
                // latitude-longitude gradient standing in for the probe view
                let u = x as Float / self.width as Float;
                let v = y as Float / self.height as Float;
                bitmap[(x, y)] = Vector3f::new(u, 1.0 - v, 0.25);
            }
        }
        Ok(bitmap)
    }
}

fn main() {
    env::set_var("RUST_LOG", "info");
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = ServerConfig::default();
    let mut budget: u32 = 1 << 16;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                config.port = args.get(i).and_then(|v| v.parse::<u16>().ok()).unwrap_or(config.port);
            }
            "--budget" => {
                i += 1;
                budget = args.get(i).and_then(|v| v.parse::<u32>().ok()).unwrap_or(budget);
            }
            _ => {}
        }
        i += 1;
    }

    let backend = DemoRenderer::new();

    let bridge = DataBridge::instance();
    bridge.init_heatmap(&backend.shape_descriptors(), budget);
    bridge.set_collecting(true);

    let cancel = CancelToken::new();
    let mut server = DebugServer::new(Box::new(backend), cancel.clone());
    bridge.set_client_sink(Some(server.sample_log()));

    let mut view = SphericalView::new("spherical_view", 66);
    view.set_pipeline(Arc::new(DemoPipeline));
    view.set_cancel_token(cancel.clone());
    server.add_plugin(Box::new(view));

    if let Err(err) = server.run(&config) {
        eprintln!("introspection server failed: {}", err);
        std::process::exit(1);
    }
}
