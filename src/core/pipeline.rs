// Copyright @yucwang 2026

use crate::core::cancel::CancelToken;
use crate::core::properties::Properties;
use crate::math::bitmap::Bitmap;

#[derive(Debug)]
pub enum PipelineError {
    UnknownPlugin(String),
    Construction(String),
    Render(String),
    Cancelled,
}

/// Factory seam for secondary renders. The host renderer hands out
/// independent copies of the scene that a probe job can reconfigure
/// without touching the primary render state.
pub trait ScenePipeline: Send + Sync {
    /// Clone the host scene's geometry and lighting into an isolated
    /// instance ready for sensor/sampler/integrator substitution.
    fn clone_scene(&self) -> Result<Box<dyn ProbeScene>, PipelineError>;
}

/// One isolated render pipeline under construction. Setters accept the
/// same plugin-name + typed-value descriptions the host renderer uses for
/// its own components.
pub trait ProbeScene {
    fn set_filter(&mut self, props: &Properties) -> Result<(), PipelineError>;
    fn set_sensor(&mut self, props: &Properties) -> Result<(), PipelineError>;
    fn set_film(&mut self, props: &Properties) -> Result<(), PipelineError>;
    fn set_sampler(&mut self, props: &Properties) -> Result<(), PipelineError>;
    fn set_integrator(&mut self, props: &Properties) -> Result<(), PipelineError>;

    /// Run the configured pipeline to completion and develop the film.
    /// Blocks the calling thread; polls `cancel` between work units.
    fn render_blocking(&mut self, cancel: &CancelToken) -> Result<Bitmap, PipelineError>;
}
