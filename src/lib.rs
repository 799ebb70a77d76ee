//! # Terrasphere
//!
//! **An interactive Earth globe with scripted transitions.**
//!
//! A green sphere grows in at startup. Dragging across the window recolors it
//! from the pointer position while the camera slowly orbits. Two scripted
//! transitions replace the globe:
//!
//! - **Explore** shrinks the current globe away and grows a textured Earth in
//!   its place.
//! - **Create** swaps in a spinning Earth that turns red and burns out, then
//!   fades in a burnt globe.
//!
//! ## Quick Start
//!
//! ```no_run
//! use terrasphere::{AppConfig, run};
//!
//! fn main() {
//!     env_logger::init();
//!     run(AppConfig::new().title("Globe")).unwrap();
//! }
//! ```
//!
//! Everything except the window and the GPU lives in [`Globe`], which can be
//! driven headless with a [`TextureLoader`] of your choice.

mod animation;
mod app;
mod camera;
mod color;
mod config;
mod globe;
mod gpu;
mod input;
mod loader;
mod mesh;
mod mesh_pass;
mod orbit_camera;
mod renderer;
pub mod scene;
mod texture;

pub use animation::{
    DEFAULT_DURATION, Easing, Property, Repeat, Tween, TweenBuilder, TweenError, TweenValue,
    Tweener, ValueKind,
};
pub use app::{AppError, run};
pub use camera::Camera;
pub use color::Color;
pub use config::{AppConfig, CONFIG_FILE, ConfigError, Timings};
pub use globe::Globe;
pub use gpu::{GpuContext, GpuError};
pub use input::{Input, drag_color, drag_rgb};
pub use loader::{
    AssetLoadError, AssetSource, LoadResult, LoadTicket, TextureLoader, ThreadedTextureLoader,
};
pub use mesh::{Mesh, SphereGeometry, Transform, Vertex3d};
pub use mesh_pass::{DrawCall, FrameUniforms, LightUniform, MeshPass, ModelUniforms};
pub use orbit_camera::OrbitControls;
pub use renderer::{SceneItem, SceneRenderer, collect_items};
pub use texture::{Texture, TextureId, TextureImage};
