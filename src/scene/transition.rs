//! Scripted scene transitions.
//!
//! Two flows replace the globe with a textured one:
//!
//! - [`Flow::Explore`]: shrink the globe away, load the surface texture onto a
//!   fresh sphere and grow it back in.
//! - [`Flow::Create`]: shrink the globe away, show the textured sphere spinning
//!   while it burns to red and fades out, then fade in a sphere wearing the
//!   rebirth texture.
//!
//! Each triggered flow is an [`ActiveTransition`] moving through
//! [`TransitionStage`]s. Stages advance on two kinds of event: a tween
//! finishing (reported as a [`Cue`] from the [`Tweener`]) and a texture load
//! finishing (a [`LoadResult`] carrying the ticket the stage waits on).
//!
//! ```text
//! ShrinkingOut → SceneCleared → TextureLoading ┬→ GrowingIn → Settled              (explore)
//!                                              └→ Burning → RebirthLoading
//!                                                           → FadingIn → Settled  (create)
//! ```
//!
//! A failed load logs the error and leaves the run [`Halted`](TransitionStage::Halted)
//! with the scene as it was at that point.

use glam::Vec3;
use hecs::Entity;

use super::graph::Scene;
use super::node::{Blending, Light, Material, Sphere};
use crate::animation::{Easing, Property, Repeat, Tween, TweenError, Tweener};
use crate::color::Color;
use crate::config::AppConfig;
use crate::loader::{AssetSource, LoadResult, LoadTicket, TextureLoader};
use crate::mesh::Transform;
use crate::texture::TextureImage;

/// Which scripted transition to play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Shrink out, grow the textured globe back in.
    Explore,
    /// Shrink out, burn the textured globe, fade in the rebirth globe.
    Create,
}

impl Flow {
    pub fn name(self) -> &'static str {
        match self {
            Flow::Explore => "explore",
            Flow::Create => "create",
        }
    }
}

/// Identifies one triggered flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RunId(u64);

/// Tween completion events the globe reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// The entry animation finished.
    IntroDone,
    /// The outgoing globe reached scale zero.
    Shrunk(RunId),
    /// The explore globe reached full size.
    Grown(RunId),
    /// The burning globe faded out completely.
    Burned(RunId),
    /// The rebirth globe is fully opaque.
    Reborn(RunId),
}

impl Cue {
    /// The run this cue belongs to, if any.
    pub fn run(self) -> Option<RunId> {
        match self {
            Cue::IntroDone => None,
            Cue::Shrunk(id) | Cue::Grown(id) | Cue::Burned(id) | Cue::Reborn(id) => Some(id),
        }
    }
}

/// Where a run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionStage {
    /// Waiting for the outgoing globe to shrink to nothing.
    ShrinkingOut { mesh: Entity },
    /// The scene was just emptied. Passed through within a single update.
    SceneCleared,
    /// Waiting for the surface texture; `mesh` is the placeholder sphere.
    TextureLoading { ticket: LoadTicket, mesh: Entity },
    /// Waiting for the explore globe to reach full size.
    GrowingIn { mesh: Entity },
    /// The create globe is spinning, reddening and fading out.
    Burning { mesh: Entity },
    /// Waiting for the rebirth texture. Nothing is drawn but the lights.
    RebirthLoading { ticket: LoadTicket },
    /// Waiting for the rebirth globe to become opaque.
    FadingIn { mesh: Entity },
    /// Finished normally.
    Settled,
    /// Stopped early: a texture failed to load, a tween could not be built,
    /// or a later run destroyed this run's globe.
    Halted,
}

impl TransitionStage {
    pub fn is_finished(&self) -> bool {
        matches!(self, TransitionStage::Settled | TransitionStage::Halted)
    }

    /// The globe this stage is animating or waiting on.
    pub fn mesh(&self) -> Option<Entity> {
        match *self {
            TransitionStage::ShrinkingOut { mesh }
            | TransitionStage::TextureLoading { mesh, .. }
            | TransitionStage::GrowingIn { mesh }
            | TransitionStage::Burning { mesh }
            | TransitionStage::FadingIn { mesh } => Some(mesh),
            _ => None,
        }
    }

    fn ticket(&self) -> Option<LoadTicket> {
        match *self {
            TransitionStage::TextureLoading { ticket, .. }
            | TransitionStage::RebirthLoading { ticket } => Some(ticket),
            _ => None,
        }
    }
}

/// State of one triggered flow.
#[derive(Clone, Debug)]
pub struct ActiveTransition {
    pub id: RunId,
    pub flow: Flow,
    pub stage: TransitionStage,
    /// Time the flow was triggered.
    pub start_time: f32,
}

/// Everything a stage is allowed to touch.
pub struct StageContext<'a> {
    pub scene: &'a mut Scene,
    pub tweens: &'a mut Tweener<Cue>,
    pub loader: &'a mut dyn TextureLoader,
    pub config: &'a AppConfig,
    /// The globe that drags recolor and the next trigger shrinks.
    pub primary: &'a mut Entity,
    pub now: f32,
}

/// Drives the explore and create flows.
pub struct Choreographer {
    serialize: bool,
    next_run: u64,
    active: Vec<ActiveTransition>,
    last_finished: Option<ActiveTransition>,
}

impl Choreographer {
    /// With `serialize` set, triggers are ignored while a flow is running.
    pub fn new(serialize: bool) -> Self {
        Self {
            serialize,
            next_run: 0,
            active: Vec::new(),
            last_finished: None,
        }
    }

    /// Whether any flow is still in progress.
    pub fn is_busy(&self) -> bool {
        !self.active.is_empty()
    }

    /// Flows in progress, oldest first.
    pub fn active(&self) -> &[ActiveTransition] {
        &self.active
    }

    /// The most recently finished flow.
    pub fn last_finished(&self) -> Option<&ActiveTransition> {
        self.last_finished.as_ref()
    }

    /// Current stage of a run that is in progress or finished last.
    pub fn stage(&self, id: RunId) -> Option<TransitionStage> {
        self.active
            .iter()
            .chain(self.last_finished.iter())
            .find(|run| run.id == id)
            .map(|run| run.stage)
    }

    /// Start `flow`. Returns `None` when the trigger was ignored.
    pub fn trigger(&mut self, flow: Flow, ctx: &mut StageContext<'_>) -> Option<RunId> {
        if self.serialize && self.is_busy() {
            log::info!("Ignoring {} trigger: a transition is in progress", flow.name());
            return None;
        }

        let id = RunId(self.next_run);
        self.next_run += 1;
        log::info!("Starting {} transition ({:?})", flow.name(), id);

        let stage = shrink_out(flow, id, ctx).unwrap_or_else(halt);
        let run = ActiveTransition {
            id,
            flow,
            stage,
            start_time: ctx.now,
        };
        if stage.is_finished() {
            self.last_finished = Some(run);
        } else {
            self.active.push(run);
        }
        Some(id)
    }

    /// React to a tween completion.
    pub fn on_cue(&mut self, cue: Cue, ctx: &mut StageContext<'_>) {
        let Some(id) = cue.run() else {
            return;
        };
        let Some(index) = self.index_of(id) else {
            log::debug!("Ignoring {:?}: run is no longer active", cue);
            return;
        };
        let flow = self.active[index].flow;

        let next = match (cue, self.active[index].stage) {
            (Cue::Shrunk(_), TransitionStage::ShrinkingOut { .. }) => {
                self.set_stage(index, TransitionStage::SceneCleared);
                Ok(clear_and_spawn(flow, ctx))
            }
            (Cue::Grown(_), TransitionStage::GrowingIn { .. })
            | (Cue::Reborn(_), TransitionStage::FadingIn { .. }) => Ok(TransitionStage::Settled),
            (Cue::Burned(_), TransitionStage::Burning { mesh }) => Ok(load_rebirth(mesh, ctx)),
            (cue, stage) => {
                log::warn!("Unexpected {:?} while {:?}", cue, stage);
                return;
            }
        };
        self.advance(index, next);
    }

    /// React to a finished texture load.
    ///
    /// Returns `false` when no run was waiting for this ticket.
    pub fn on_loaded(&mut self, loaded: LoadResult, ctx: &mut StageContext<'_>) -> bool {
        let Some(index) = self
            .active
            .iter()
            .position(|run| run.stage.ticket() == Some(loaded.ticket))
        else {
            return false;
        };
        let ActiveTransition { id, flow, stage, .. } = self.active[index];

        let image = match loaded.result {
            Ok(image) => image,
            Err(e) => {
                log::error!("Failed to load texture: {}", e);
                self.advance(index, Ok(TransitionStage::Halted));
                return true;
            }
        };

        let next = match stage {
            TransitionStage::TextureLoading { mesh, .. } => reveal(flow, id, mesh, image, ctx),
            TransitionStage::RebirthLoading { .. } => rebirth(id, image, ctx),
            _ => return false,
        };
        self.advance(index, next);
        true
    }

    /// Halt runs whose globe no longer exists.
    ///
    /// Only happens when runs overlap: a later run clears the scene and the
    /// earlier run's globe is collected while it still waits on it.
    pub fn retire_superseded(&mut self, scene: &Scene) {
        let mut index = 0;
        while index < self.active.len() {
            match self.active[index].stage.mesh() {
                Some(mesh) if !scene.is_alive(mesh) => {
                    log::info!(
                        "{} transition {:?} superseded by a later one",
                        self.active[index].flow.name(),
                        self.active[index].id
                    );
                    self.advance(index, Ok(TransitionStage::Halted));
                }
                _ => index += 1,
            }
        }
    }

    fn index_of(&self, id: RunId) -> Option<usize> {
        self.active.iter().position(|run| run.id == id)
    }

    fn set_stage(&mut self, index: usize, stage: TransitionStage) {
        let run = &mut self.active[index];
        log::debug!("{} {:?}: {:?} -> {:?}", run.flow.name(), run.id, run.stage, stage);
        run.stage = stage;
    }

    fn advance(&mut self, index: usize, next: Result<TransitionStage, TweenError>) {
        let stage = next.unwrap_or_else(halt);
        self.set_stage(index, stage);

        if stage.is_finished() {
            let run = self.active.remove(index);
            log::info!("{} transition {:?} finished: {:?}", run.flow.name(), run.id, stage);
            self.last_finished = Some(run);
        }
    }
}

fn halt(e: TweenError) -> TransitionStage {
    log::error!("Transition stopped: {}", e);
    TransitionStage::Halted
}

fn shrink_out(
    flow: Flow,
    id: RunId,
    ctx: &mut StageContext<'_>,
) -> Result<TransitionStage, TweenError> {
    let mesh = *ctx.primary;
    if !ctx.scene.is_alive(mesh) {
        // Nothing left to shrink.
        return Ok(clear_and_spawn(flow, ctx));
    }

    let shrink = Tween::to(mesh, Property::Scale, Vec3::ZERO)
        .duration(ctx.config.timings.shrink)
        .easing(Easing::CubicIn)
        .on_complete(Cue::Shrunk(id))
        .build()?;
    ctx.tweens.add(shrink, ctx.scene.world_mut(), ctx.now);
    Ok(TransitionStage::ShrinkingOut { mesh })
}

fn clear_and_spawn(flow: Flow, ctx: &mut StageContext<'_>) -> TransitionStage {
    ctx.scene.clear();

    let (scale, material) = match flow {
        Flow::Explore => (0.0, Material::colored(Color::WHITE)),
        Flow::Create => (
            1.0,
            Material::colored(Color::WHITE)
                .transparent(1.0)
                .blending(Blending::Additive),
        ),
    };
    let mesh = ctx.scene.spawn_mesh(
        Sphere::GLOBE,
        Transform::new().uniform_scale(scale),
        material,
    );
    ctx.scene.add(mesh);
    *ctx.primary = mesh;

    let ticket = ctx
        .loader
        .load(&AssetSource::parse(&ctx.config.surface_texture));
    TransitionStage::TextureLoading { ticket, mesh }
}

fn light_up(ctx: &mut StageContext<'_>) {
    let ambient = ctx.scene.spawn_light(Light::ambient(Color::WHITE, 1.0));
    let sun = ctx
        .scene
        .spawn_light(Light::directional(Color::WHITE, 1.0, Vec3::Y));
    ctx.scene.add(ambient);
    ctx.scene.add(sun);
    ctx.scene.camera.position.z = ctx.config.camera_distance;
}

fn reveal(
    flow: Flow,
    id: RunId,
    mesh: Entity,
    image: TextureImage,
    ctx: &mut StageContext<'_>,
) -> Result<TransitionStage, TweenError> {
    let timings = &ctx.config.timings;

    let tweens = match flow {
        Flow::Explore => vec![
            Tween::to(mesh, Property::Scale, Vec3::ONE)
                .duration(timings.grow)
                .easing(Easing::CubicOut)
                .on_complete(Cue::Grown(id))
                .build()?,
        ],
        Flow::Create => vec![
            Tween::to(
                mesh,
                Property::RotationY,
                timings.spin_turns * std::f32::consts::TAU,
            )
            .duration(timings.spin_period)
            .easing(Easing::Linear)
            .repeat(Repeat::Forever)
            .build()?,
            Tween::to(mesh, Property::Color, Color::RED)
                .duration(timings.redden)
                .build()?,
            Tween::to(mesh, Property::Opacity, 0.0)
                .duration(timings.fade)
                .delay(timings.fade_delay)
                .easing(Easing::CubicOut)
                .on_complete(Cue::Burned(id))
                .build()?,
        ],
    };

    if let Some(material) = ctx.scene.material_mut(mesh) {
        material.map = Some(image);
    }
    light_up(ctx);
    for tween in tweens {
        ctx.tweens.add(tween, ctx.scene.world_mut(), ctx.now);
    }

    Ok(match flow {
        Flow::Explore => TransitionStage::GrowingIn { mesh },
        Flow::Create => TransitionStage::Burning { mesh },
    })
}

fn load_rebirth(burnt: Entity, ctx: &mut StageContext<'_>) -> TransitionStage {
    ctx.scene.remove(burnt);
    let ticket = ctx
        .loader
        .load(&AssetSource::parse(&ctx.config.rebirth_texture));
    TransitionStage::RebirthLoading { ticket }
}

fn rebirth(
    id: RunId,
    image: TextureImage,
    ctx: &mut StageContext<'_>,
) -> Result<TransitionStage, TweenError> {
    let mesh = ctx.scene.spawn_mesh(
        Sphere::GLOBE,
        Transform::new(),
        Material::colored(Color::WHITE).transparent(0.0).map(image),
    );
    let fade_in = Tween::to(mesh, Property::Opacity, 1.0)
        .from(0.0)
        .duration(ctx.config.timings.rebirth_fade)
        .easing(Easing::CubicOut)
        .on_complete(Cue::Reborn(id))
        .build();
    let fade_in = match fade_in {
        Ok(tween) => tween,
        Err(e) => {
            let _ = ctx.scene.world_mut().despawn(mesh);
            return Err(e);
        }
    };

    ctx.scene.add(mesh);
    *ctx.primary = mesh;
    ctx.tweens.add(fade_in, ctx.scene.world_mut(), ctx.now);
    Ok(TransitionStage::FadingIn { mesh })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::loader::testing::ScriptedLoader;

    struct Harness {
        scene: Scene,
        tweens: Tweener<Cue>,
        loader: ScriptedLoader,
        config: AppConfig,
        primary: Entity,
        choreographer: Choreographer,
    }

    impl Harness {
        fn new(config: AppConfig) -> Self {
            let mut scene = Scene::new(Camera::default());
            let primary = scene.spawn_mesh(
                Sphere::GLOBE,
                Transform::new(),
                Material::colored(Color::SPRING_GREEN),
            );
            scene.add(primary);
            Self {
                scene,
                tweens: Tweener::new(),
                loader: ScriptedLoader::default(),
                choreographer: Choreographer::new(config.serialize_transitions),
                config,
                primary,
            }
        }

        fn with<R>(&mut self, now: f32, f: impl FnOnce(&mut Choreographer, &mut StageContext<'_>) -> R) -> R {
            let mut ctx = StageContext {
                scene: &mut self.scene,
                tweens: &mut self.tweens,
                loader: &mut self.loader,
                config: &self.config,
                primary: &mut self.primary,
                now,
            };
            f(&mut self.choreographer, &mut ctx)
        }

        fn step(&mut self, now: f32) {
            let cues = self.tweens.update(now, self.scene.world_mut());
            let loaded = self.loader.poll();
            self.with(now, |choreographer, ctx| {
                for result in loaded {
                    choreographer.on_loaded(result, ctx);
                }
                for cue in cues {
                    choreographer.on_cue(cue, ctx);
                }
            });
        }
    }

    #[test]
    fn shrink_completion_clears_and_requests_texture() {
        let mut h = Harness::new(AppConfig::default());
        let old = h.primary;
        let run = h.with(0.0, |c, ctx| c.trigger(Flow::Explore, ctx)).unwrap();
        assert_eq!(
            h.choreographer.stage(run),
            Some(TransitionStage::ShrinkingOut { mesh: old })
        );

        h.step(1.0);
        let Some(TransitionStage::TextureLoading { mesh, ticket }) = h.choreographer.stage(run)
        else {
            panic!("expected a pending load");
        };
        assert_eq!(h.scene.children(), &[mesh]);
        assert_eq!(h.primary, mesh);
        assert_eq!(h.loader.last_request().map(|r| r.0), Some(ticket));
        assert_eq!(
            h.loader.last_request().map(|r| r.1.clone()),
            Some(AssetSource::parse(&h.config.surface_texture))
        );
    }

    #[test]
    fn stale_tickets_are_not_claimed() {
        let mut h = Harness::new(AppConfig::default());
        let stray = h.loader.load(&AssetSource::parse("stray.jpg"));
        h.loader.succeed_last();
        let result = h.loader.poll().pop().unwrap();
        assert_eq!(result.ticket, stray);
        assert!(!h.with(0.0, |c, ctx| c.on_loaded(result, ctx)));
    }

    #[test]
    fn invalid_timings_halt_the_run() {
        let mut config = AppConfig::default();
        config.timings.shrink = -1.0;
        let mut h = Harness::new(config);

        let run = h.with(0.0, |c, ctx| c.trigger(Flow::Create, ctx)).unwrap();
        assert_eq!(h.choreographer.stage(run), Some(TransitionStage::Halted));
        assert!(!h.choreographer.is_busy());
        assert!(h.scene.contains(h.primary));
    }

    #[test]
    fn overlapping_runs_when_not_serialized() {
        let mut h = Harness::new(AppConfig::default().serialize_transitions(false));
        let first = h.with(0.0, |c, ctx| c.trigger(Flow::Explore, ctx)).unwrap();
        let second = h.with(0.5, |c, ctx| c.trigger(Flow::Explore, ctx)).unwrap();
        assert_ne!(first, second);
        assert_eq!(h.choreographer.active().len(), 2);
    }

    #[test]
    fn dead_primary_skips_the_shrink() {
        let mut h = Harness::new(AppConfig::default());
        let _ = h.scene.world_mut().despawn(h.primary);
        let run = h.with(0.0, |c, ctx| c.trigger(Flow::Explore, ctx)).unwrap();
        assert!(matches!(
            h.choreographer.stage(run),
            Some(TransitionStage::TextureLoading { .. })
        ));
    }
}
