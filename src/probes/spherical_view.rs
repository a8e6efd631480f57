// Copyright @yucwang 2026

use crate::core::cancel::CancelToken;
use crate::core::pipeline::{ PipelineError, ScenePipeline };
use crate::core::plugin::Plugin;
use crate::core::properties::Properties;
use crate::io::exr_utils::encode_exr_to_memory;
use crate::math::bitmap::Bitmap;
use crate::math::constants::Vector3f;
use crate::math::transform::Transform;
use crate::wire::stream::{ WireError, WireReader, WireWriter };

use log::{ info, warn };

use std::sync::Arc;

/// Request payload of a probe render: where to place the omnidirectional
/// sensor, how many samples, the output resolution and the integrator to
/// run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub point: Vector3f,
    pub sample_count: i32,
    pub width: i32,
    pub height: i32,
    pub integrator: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            point: Vector3f::zeros(),
            sample_count: 16,
            width: 256,
            height: 128,
            integrator: String::new(),
        }
    }
}

impl ProbeConfig {
    pub fn read(stream: &mut WireReader) -> Result<Self, WireError> {
        let x = stream.read_f32()?;
        let y = stream.read_f32()?;
        let z = stream.read_f32()?;
        let sample_count = stream.read_i32()?;
        let width = stream.read_i32()?;
        let height = stream.read_i32()?;
        let integrator = stream.read_string()?;

        Ok(Self { point: Vector3f::new(x, y, z), sample_count, width, height, integrator })
    }

    pub fn write(&self, stream: &mut WireWriter) -> Result<(), WireError> {
        stream.write_f32(self.point.x)?;
        stream.write_f32(self.point.y)?;
        stream.write_f32(self.point.z)?;
        stream.write_i32(self.sample_count)?;
        stream.write_i32(self.width)?;
        stream.write_i32(self.height)?;
        stream.write_string(&self.integrator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JobState {
    Idle,
    Configured,
    Rendering,
    Completed,
}

/// A remotely triggered secondary render: an omnidirectional view from a
/// probe point, run on an isolated copy of the host scene. Reusable; any
/// failure degrades to "no result" and returns the job to `Idle` so the
/// client can reconfigure and retry.
pub struct SphericalView {
    name: String,
    id: i16,
    state: JobState,
    config: ProbeConfig,
    pipeline: Option<Arc<dyn ScenePipeline>>,
    bitmap: Option<Bitmap>,
    cancel: CancelToken,
}

impl SphericalView {
    pub fn new(name: &str, id: i16) -> Self {
        Self {
            name: name.to_string(),
            id,
            state: JobState::Idle,
            config: ProbeConfig::default(),
            pipeline: None,
            bitmap: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn set_pipeline(&mut self, pipeline: Arc<dyn ScenePipeline>) {
        self.pipeline = Some(pipeline);
    }

    pub fn set_cancel_token(&mut self, cancel: CancelToken) {
        self.cancel = cancel;
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    fn build_and_render(&self) -> Result<Bitmap, PipelineError> {
        let pipeline = self.pipeline.as_ref().ok_or_else(|| {
            PipelineError::Construction("no scene pipeline attached".to_string())
        })?;

        let mut scene = pipeline.clone_scene()?;

        let filter_props = Properties::new("box");
        scene.set_filter(&filter_props)?;

        let mut sensor_props = Properties::new("spherical");
        let look = Transform::look_at(self.config.point,
                                      self.config.point + Vector3f::new(1.0, 0.0, 0.0),
                                      Vector3f::new(0.0, 0.0, 1.0));
        sensor_props.set_transform("to_world", look);
        scene.set_sensor(&sensor_props)?;

        let mut film_props = Properties::new("hdrfilm");
        film_props.set_int("width", self.config.width);
        film_props.set_int("height", self.config.height);
        film_props.set_bool("banner", false);
        scene.set_film(&film_props)?;

        let mut sampler_props = Properties::new("independent");
        sampler_props.set_int("sample_count", self.config.sample_count);
        scene.set_sampler(&sampler_props)?;

        // strategies incompatible with a point probe sensor are forced off
        let mut integrator_props = Properties::new(&self.config.integrator);
        integrator_props.set_bool("lens_perturbation", false);
        integrator_props.set_bool("multi_chain_perturbation", false);
        integrator_props.set_bool("caustic_perturbation", false);
        integrator_props.set_bool("bidirectional_mutation", true);
        integrator_props.set_bool("manifold_perturbation", true);
        scene.set_integrator(&integrator_props)?;

        scene.render_blocking(&self.cancel)
    }
}

impl Plugin for SphericalView {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> i16 {
        self.id
    }

    fn run(&mut self) {
        if self.state != JobState::Configured {
            warn!("{}: run requested in state {:?}, ignoring", self.name, self.state);
            return;
        }

        info!("{}: rendering probe at ({}, {}, {})",
              self.name, self.config.point.x, self.config.point.y, self.config.point.z);
        self.state = JobState::Rendering;

        match self.build_and_render() {
            Ok(bitmap) => {
                self.bitmap = Some(bitmap);
                self.state = JobState::Completed;
            }
            Err(err) => {
                warn!("{}: probe render failed: {:?}", self.name, err);
                self.bitmap = None;
                self.state = JobState::Idle;
            }
        }
    }

    fn serialize(&mut self, stream: &mut WireWriter) -> Result<(), WireError> {
        stream.write_i16(self.id)?;

        let payload = match self.bitmap.take() {
            Some(bitmap) => match encode_exr_to_memory(&bitmap) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!("{}: result encode failed: {}", self.name, err);
                    None
                }
            },
            None => None,
        };

        match payload {
            Some(bytes) => {
                stream.write_i32(bytes.len() as i32)?;
                stream.write_bytes(&bytes)?;
            }
            None => stream.write_i32(0)?,
        }

        // result consumed, the job is reusable
        self.state = JobState::Idle;
        Ok(())
    }

    fn deserialize(&mut self, stream: &mut WireReader) -> Result<(), WireError> {
        let config = ProbeConfig::read(stream)?;
        if config.width <= 0 || config.height <= 0 {
            return Err(WireError::BadLength(config.width.min(config.height)));
        }
        if config.sample_count <= 0 {
            return Err(WireError::BadLength(config.sample_count));
        }

        self.config = config;
        self.bitmap = None;
        self.state = JobState::Configured;
        Ok(())
    }
}
