//! The globe: all application state behind the window.
//!
//! [`Globe`] owns the scene, the running tweens, the texture loader and the
//! transition [`Choreographer`]. The app feeds it window events and calls
//! [`Globe::update`] once per frame; the renderer draws whatever
//! [`Globe::scene`] holds afterwards. Nothing here touches the GPU, so the
//! whole interactive behavior runs headless in tests.

use glam::{Vec2, Vec3};
use hecs::Entity;

use crate::animation::{Easing, Property, Tween, Tweener};
use crate::camera::Camera;
use crate::color::Color;
use crate::config::AppConfig;
use crate::input::drag_color;
use crate::loader::TextureLoader;
use crate::mesh::Transform;
use crate::scene::{
    Choreographer, Cue, Flow, Light, Material, RunId, Scene, Sphere, StageContext,
};

pub struct Globe<L: TextureLoader> {
    config: AppConfig,
    scene: Scene,
    tweens: Tweener<Cue>,
    loader: L,
    choreographer: Choreographer,
    /// The globe drags recolor and triggers shrink.
    primary: Entity,
    dragging: bool,
    viewport: (u32, u32),
    intro_done: bool,
    /// Time of the latest update, in seconds since startup.
    now: f32,
}

impl<L: TextureLoader> Globe<L> {
    /// Build the initial scene and start the entry animation at time zero.
    pub fn new(config: AppConfig, loader: L, width: u32, height: u32) -> Self {
        let camera = Camera::new()
            .at(Vec3::new(0.0, 0.0, config.camera_distance))
            .with_fov(config.fov)
            .with_clip(0.1, 100.0);
        let mut scene = Scene::new(camera);

        let primary = scene.spawn_mesh(
            Sphere::GLOBE,
            Transform::new(),
            Material::colored(Color::SPRING_GREEN).roughness(0.5),
        );
        let point = scene.spawn_light(Light::point(
            Color::WHITE,
            1.25,
            Vec3::new(0.0, 10.0, 10.0),
            100.0,
        ));
        let ambient = scene.spawn_light(Light::ambient(Color::WHITE, 0.5));
        scene.add(primary);
        scene.add(point);
        scene.add(ambient);

        let mut globe = Self {
            choreographer: Choreographer::new(config.serialize_transitions),
            config,
            scene,
            tweens: Tweener::new(),
            loader,
            primary,
            dragging: false,
            viewport: (0, 0),
            intro_done: false,
            now: 0.0,
        };
        globe.resize(width, height);
        globe.start_intro();
        globe
    }

    fn start_intro(&mut self) {
        let intro = Tween::to(self.primary, Property::Scale, Vec3::ONE)
            .from(Vec3::ZERO)
            .duration(self.config.timings.intro)
            .easing(Easing::QuadOut)
            .on_complete(Cue::IntroDone)
            .build();
        match intro {
            Ok(tween) => self.tweens.add(tween, self.scene.world_mut(), self.now),
            Err(e) => {
                log::warn!("Skipping entry animation: {}", e);
                self.intro_done = true;
            }
        }
    }

    /// Track a new viewport size. Zero sizes (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.scene.camera.set_viewport(width, height);
    }

    pub fn pointer_down(&mut self) {
        self.dragging = true;
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    /// Recolor the primary globe from the pointer position while dragging.
    ///
    /// Each move starts a new color tween. Earlier ones keep running, and the
    /// latest one wins because it is applied last.
    pub fn pointer_moved(&mut self, position: Vec2) {
        if !self.dragging {
            return;
        }
        let (width, height) = self.viewport;
        let color = drag_color(position, width, height);

        let tween = Tween::to(self.primary, Property::Color, color)
            .duration(self.config.timings.drag)
            .build();
        match tween {
            Ok(tween) => self.tweens.add(tween, self.scene.world_mut(), self.now),
            Err(e) => log::warn!("Ignoring drag: {}", e),
        }
    }

    /// Start a scripted transition. Returns `None` when it was ignored.
    pub fn trigger(&mut self, flow: Flow) -> Option<RunId> {
        let (choreographer, mut ctx) = self.stage_context();
        choreographer.trigger(flow, &mut ctx)
    }

    /// Advance everything to `now` (seconds since startup).
    pub fn update(&mut self, now: f32) {
        self.now = now;

        let loaded = self.loader.poll();
        for result in loaded {
            let ticket = result.ticket;
            let (choreographer, mut ctx) = self.stage_context();
            if !choreographer.on_loaded(result, &mut ctx) {
                log::debug!("Discarding texture for {:?}: nothing is waiting for it", ticket);
            }
        }

        let cues = self.tweens.update(now, self.scene.world_mut());
        for cue in cues {
            if cue == Cue::IntroDone {
                log::debug!("Entry animation finished");
                self.intro_done = true;
                continue;
            }
            let (choreographer, mut ctx) = self.stage_context();
            choreographer.on_cue(cue, &mut ctx);
        }

        self.scene.collect_orphans(&mut self.tweens);
        self.choreographer.retire_superseded(&self.scene);
    }

    fn stage_context(&mut self) -> (&mut Choreographer, StageContext<'_>) {
        let Self {
            config,
            scene,
            tweens,
            loader,
            choreographer,
            primary,
            now,
            ..
        } = self;
        (
            choreographer,
            StageContext {
                scene,
                tweens,
                loader,
                config,
                primary,
                now: *now,
            },
        )
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.scene.camera
    }

    pub fn primary(&self) -> Entity {
        self.primary
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn intro_done(&self) -> bool {
        self.intro_done
    }

    pub fn choreographer(&self) -> &Choreographer {
        &self.choreographer
    }

    pub fn tweens(&self) -> &Tweener<Cue> {
        &self.tweens
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }
}
