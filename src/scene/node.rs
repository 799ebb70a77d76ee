//! Components attached to scene entities.
//!
//! A mesh entity carries a [`Transform`](crate::Transform), a [`Sphere`] and a
//! [`Material`]. A light entity carries a single [`Light`].

use glam::Vec3;

use crate::color::Color;
use crate::texture::TextureImage;

/// Sphere geometry description.
///
/// The GPU mesh is generated from this on first draw and shared by every
/// entity with the same parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sphere {
    /// Radius in world units, stored as bits so the shape can key a cache.
    radius_bits: u32,
    /// Divisions around the equator.
    pub width_segments: u32,
    /// Divisions from pole to pole.
    pub height_segments: u32,
}

impl Sphere {
    /// The globe used everywhere in the scene: radius 3, 64x64 segments.
    pub const GLOBE: Sphere = Sphere::new(3.0, 64, 64);

    pub const fn new(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        Self {
            radius_bits: radius.to_bits(),
            width_segments,
            height_segments,
        }
    }

    pub fn radius(&self) -> f32 {
        f32::from_bits(self.radius_bits)
    }
}

/// How a material combines with what is already on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Blending {
    /// Standard alpha blending.
    #[default]
    Normal,
    /// Source color is added to the destination, scaled by alpha.
    Additive,
}

/// Surface description of a mesh.
///
/// Every field is mutable in place; tweens write `color` and `opacity`, the
/// choreography attaches `map` once a texture arrives.
#[derive(Clone, Debug)]
pub struct Material {
    /// Base color, multiplied with the texture when one is attached.
    pub color: Color,
    /// Optional color texture.
    pub map: Option<TextureImage>,
    /// Opacity in `[0, 1]`. Only honoured when `transparent` is set.
    pub opacity: f32,
    /// Whether the material is drawn with its opacity.
    pub transparent: bool,
    pub blending: Blending,
    /// Surface roughness in `[0, 1]`; lower values give a tighter highlight.
    pub roughness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            map: None,
            opacity: 1.0,
            transparent: false,
            blending: Blending::Normal,
            roughness: 1.0,
        }
    }
}

impl Material {
    /// Plain colored, opaque material.
    pub fn colored(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn transparent(mut self, opacity: f32) -> Self {
        self.transparent = true;
        self.opacity = opacity;
        self
    }

    pub fn blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    pub fn map(mut self, texture: TextureImage) -> Self {
        self.map = Some(texture);
        self
    }

    /// Alpha the renderer should use.
    pub fn effective_opacity(&self) -> f32 {
        if self.transparent {
            self.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// The kind of a light and its placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    /// Uniform light from every direction.
    Ambient,
    /// Omni light at a position. `distance` is where its contribution reaches zero.
    Point { position: Vec3, distance: f32 },
    /// Parallel light shining from `position` towards the origin.
    Directional { position: Vec3 },
}

/// A light source in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
}

impl Light {
    pub fn ambient(color: Color, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color,
            intensity,
        }
    }

    pub fn point(color: Color, intensity: f32, position: Vec3, distance: f32) -> Self {
        Self {
            kind: LightKind::Point { position, distance },
            color,
            intensity,
        }
    }

    pub fn directional(color: Color, intensity: f32, position: Vec3) -> Self {
        Self {
            kind: LightKind::Directional { position },
            color,
            intensity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globe_shape() {
        assert_eq!(Sphere::GLOBE.radius(), 3.0);
        assert_eq!(Sphere::GLOBE.width_segments, 64);
        assert_eq!(Sphere::GLOBE, Sphere::new(3.0, 64, 64));
    }

    #[test]
    fn opacity_only_counts_when_transparent() {
        let mut material = Material::colored(Color::WHITE);
        material.opacity = 0.2;
        assert_eq!(material.effective_opacity(), 1.0);

        let faded = Material::colored(Color::WHITE).transparent(0.2);
        assert_eq!(faded.effective_opacity(), 0.2);
    }
}
