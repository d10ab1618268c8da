#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod errors;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod settings;

pub use errors::{Diagnostics, Result, SableError};
pub use renderer::backend::{RecordingBackend, RenderBackend};
pub use renderer::{FrameStats, RenderTarget, Renderer};
pub use resources::{
    Blending, Geometry, GeometryHandle, Material, MaterialHandle, Resources, Side,
};
pub use scene::{Camera, Light, Mesh, Node, Scene};
pub use settings::{ColorSpace, RendererSettings, ToneMapping};
