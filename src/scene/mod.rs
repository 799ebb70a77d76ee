//! The scene the globe lives in, and the scripted transitions that rebuild it.
//!
//! # Overview
//!
//! - [`Scene`] stores entities in a `hecs` world and keeps the ordered render
//!   list plus the camera.
//! - [`node`] holds the components: [`Sphere`], [`Material`] and [`Light`].
//! - [`Choreographer`] plays the explore and create [`Flow`]s against a scene.
//!
//! # Example
//!
//! ```ignore
//! use terrasphere::scene::*;
//!
//! let mut scene = Scene::new(Camera::default());
//! let globe = scene.spawn_mesh(
//!     Sphere::GLOBE,
//!     Transform::new(),
//!     Material::colored(Color::SPRING_GREEN).roughness(0.5),
//! );
//! scene.add(globe);
//! ```

mod graph;
pub mod node;
mod transition;

pub use graph::Scene;
pub use node::{Blending, Light, LightKind, Material, Sphere};
pub use transition::{
    ActiveTransition, Choreographer, Cue, Flow, RunId, StageContext, TransitionStage,
};
