//! The scene graph host: object storage plus the ordered render list.

use hecs::{Entity, World};

use super::node::{Light, Material, Sphere};
use crate::animation::Tweener;
use crate::camera::Camera;
use crate::mesh::Transform;

/// Everything that gets drawn, and everything that could be.
///
/// Entities live in a [`World`]; the render list (`children`) decides which
/// of them are drawn. Removing an entity from the render list does not
/// destroy it: a tween may still be animating it, exactly as an object
/// removed from a scene keeps existing while something refers to it.
/// [`Scene::collect_orphans`] destroys the ones nothing refers to any more.
pub struct Scene {
    world: World,
    children: Vec<Entity>,
    /// The camera the scene is drawn from.
    pub camera: Camera,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            world: World::new(),
            children: Vec::new(),
            camera,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Create a sphere mesh entity. It is not drawn until [`add`](Self::add)ed.
    pub fn spawn_mesh(&mut self, sphere: Sphere, transform: Transform, material: Material) -> Entity {
        self.world.spawn((sphere, transform, material))
    }

    /// Create a light entity. It is not lit until [`add`](Self::add)ed.
    pub fn spawn_light(&mut self, light: Light) -> Entity {
        self.world.spawn((light,))
    }

    /// Append `entity` to the render list. Adding twice is a no-op.
    pub fn add(&mut self, entity: Entity) {
        if !self.children.contains(&entity) {
            self.children.push(entity);
        }
    }

    /// Drop `entity` from the render list.
    pub fn remove(&mut self, entity: Entity) {
        self.children.retain(|&child| child != entity);
    }

    /// Empty the render list. Lights go too.
    pub fn clear(&mut self) {
        self.children.clear();
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.children.contains(&entity)
    }

    /// The render list, in insertion order.
    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    /// Drawn mesh entities, in render-list order.
    pub fn meshes(&self) -> Vec<Entity> {
        self.children
            .iter()
            .copied()
            .filter(|&e| self.world.get::<&Material>(e).is_ok())
            .collect()
    }

    /// Lights in the render list.
    pub fn lights(&self) -> Vec<Light> {
        self.children
            .iter()
            .filter_map(|&e| self.world.get::<&Light>(e).ok().map(|light| *light))
            .collect()
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<&Transform>(entity).ok().map(|t| *t)
    }

    pub fn material(&self, entity: Entity) -> Option<Material> {
        self.world.get::<&Material>(entity).ok().map(|m| (*m).clone())
    }

    pub fn sphere(&self, entity: Entity) -> Option<Sphere> {
        self.world.get::<&Sphere>(entity).ok().map(|s| *s)
    }

    /// Mutable access to a material, for attaching textures and the like.
    pub fn material_mut(&mut self, entity: Entity) -> Option<&mut Material> {
        self.world.query_one_mut::<&mut Material>(entity).ok()
    }

    /// Whether the entity still exists, drawn or not.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    /// Destroy entities that are neither drawn nor going anywhere.
    ///
    /// An entity outside the render list survives while a finite tween still
    /// targets it, since that tween may complete and report back. An entity
    /// outside the render list whose only tweens repeat forever can never be
    /// seen again; those tweens are dropped along with it.
    pub fn collect_orphans<C>(&mut self, tweens: &mut Tweener<C>) -> usize {
        let orphans: Vec<Entity> = self
            .world
            .iter()
            .map(|entity_ref| entity_ref.entity())
            .filter(|e| !self.children.contains(e))
            .filter(|&e| tweens.only_endless_on(e))
            .collect();

        for &entity in &orphans {
            tweens.drop_target(entity);
            // Just listed from this world.
            let _ = self.world.despawn(entity);
            log::trace!("Despawned detached entity {:?}", entity);
        }
        orphans.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Easing, Property, Repeat, Tween};
    use crate::color::Color;
    use glam::Vec3;

    fn scene() -> Scene {
        Scene::new(Camera::default())
    }

    fn globe(scene: &mut Scene) -> Entity {
        scene.spawn_mesh(
            Sphere::GLOBE,
            Transform::new(),
            Material::colored(Color::WHITE),
        )
    }

    #[test]
    fn add_remove_clear() {
        let mut scene = scene();
        let mesh = globe(&mut scene);
        let light = scene.spawn_light(Light::ambient(Color::WHITE, 0.5));

        assert!(scene.children().is_empty());
        scene.add(mesh);
        scene.add(light);
        scene.add(mesh);
        assert_eq!(scene.children(), &[mesh, light]);
        assert_eq!(scene.meshes(), vec![mesh]);
        assert_eq!(scene.lights().len(), 1);

        scene.remove(mesh);
        assert!(!scene.contains(mesh));
        assert!(scene.is_alive(mesh));

        scene.clear();
        assert!(scene.children().is_empty());
        assert!(scene.lights().is_empty());
    }

    #[test]
    fn orphans_without_tweens_are_despawned() {
        let mut scene = scene();
        let drawn = globe(&mut scene);
        let detached = globe(&mut scene);
        let light = scene.spawn_light(Light::ambient(Color::WHITE, 1.0));
        scene.add(drawn);

        let mut tweens: Tweener<()> = Tweener::new();
        assert_eq!(scene.collect_orphans(&mut tweens), 2);
        assert!(scene.is_alive(drawn));
        assert!(!scene.is_alive(detached));
        assert!(!scene.is_alive(light));
    }

    #[test]
    fn finite_tweens_keep_detached_entities_alive() {
        let mut scene = scene();
        let mesh = globe(&mut scene);

        let mut tweens = Tweener::new();
        let shrink = Tween::to(mesh, Property::Scale, Vec3::ZERO)
            .duration(1.0)
            .easing(Easing::CubicIn)
            .on_complete(())
            .build()
            .unwrap();
        tweens.add(shrink, scene.world_mut(), 0.0);

        assert_eq!(scene.collect_orphans(&mut tweens), 0);
        assert!(scene.is_alive(mesh));

        assert_eq!(tweens.update(1.0, scene.world_mut()), vec![()]);
        assert_eq!(scene.collect_orphans(&mut tweens), 1);
    }

    #[test]
    fn endless_tweens_do_not_keep_detached_entities_alive() {
        let mut scene = scene();
        let mesh = globe(&mut scene);

        let mut tweens: Tweener<()> = Tweener::new();
        let spin = Tween::to(mesh, Property::RotationY, 10.0)
            .duration(7.0)
            .repeat(Repeat::Forever)
            .build()
            .unwrap();
        tweens.add(spin, scene.world_mut(), 0.0);

        scene.add(mesh);
        assert_eq!(scene.collect_orphans(&mut tweens), 0);
        assert_eq!(tweens.len(), 1);

        scene.remove(mesh);
        assert_eq!(scene.collect_orphans(&mut tweens), 1);
        assert!(tweens.is_empty());
    }
}
