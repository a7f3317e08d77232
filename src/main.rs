use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_logger::Env;
use glam::{Affine3A, Quat, Vec3, Vec3A};
use strum::Display;

use uxt_interaction::{
    config::load_config,
    config_io::ensure_config_root,
    controls::{PinchSlider, PressableButton},
    input::{FarPointer, GraspEvent, Hand, NearPointer, PointerId, SimulatedHandTracker},
    interactions::GenericManipulator,
    math::Shape,
    scene::PrimitiveQuery,
    ActorId, InteractionConfig, InteractionSystem, PrimitiveId, Scene, TargetId,
};

/// Runs scripted hand input against a small demo scene and logs what happens.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Extra config file layered on top of the config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Which demo to play
    #[arg(short, long, value_enum, default_value_t = Scenario::All)]
    scenario: Scenario,

    /// Frames per demo
    #[arg(short, long, default_value_t = 90)]
    frames: u32,

    /// Seconds per frame
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Create the config directory before loading
    #[arg(long)]
    init_config: bool,
}

#[derive(ValueEnum, Display, Clone, Copy, Debug, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
enum Scenario {
    Button,
    Slider,
    Manipulate,
    All,
}

const BUTTON_POS: Vec3 = Vec3::new(0.0, 1.2, -0.4);
const SLIDER_POS: Vec3 = Vec3::new(0.25, 1.1, -0.4);
const CUBE_POS: Vec3 = Vec3::new(0.0, 1.5, -1.0);
const HOVER_GAP: f32 = 0.08;

struct Demo {
    scene: Scene,
    system: InteractionSystem,
    hands: SimulatedHandTracker,
    far: PointerId,
    button: (TargetId, ActorId),
    slider: TargetId,
    /// Where the pinch closed on the slider thumb.
    slider_grab: Option<Vec3A>,
    cube: (TargetId, ActorId, PrimitiveId),
}

impl Demo {
    fn new(config: &InteractionConfig) -> anyhow::Result<Self> {
        let mut scene = Scene::new();
        let mut system = InteractionSystem::new();
        let hands = SimulatedHandTracker::new(&config.grasp);

        system.add_near_pointer(NearPointer::new(Hand::Right, config.near_pointer));
        let far = system.add_far_pointer(FarPointer::new(None, config.far_pointer));

        let button = spawn_button(&mut scene, config)?;
        let slider = spawn_slider(&mut scene, config)?;
        let cube = spawn_cube(&mut scene, config)?;

        Ok(Self {
            scene,
            system,
            hands,
            far,
            button,
            slider,
            slider_grab: None,
            cube,
        })
    }

    fn step(&mut self, dt: f32) {
        for (hand, event) in [Hand::Left, Hand::Right].into_iter().zip(self.hands.poll()) {
            match event {
                Some(GraspEvent::Started) => log::debug!("{} hand pinched", hand),
                Some(GraspEvent::Ended) => log::debug!("{} hand released", hand),
                None => {}
            }
        }

        self.system
            .tick(&mut self.scene, &PrimitiveQuery, &self.hands, dt);
        self.sync_scene();
    }

    /// Copies component outputs back onto the actors and primitives they drive.
    fn sync_scene(&mut self) {
        let (button, visuals) = self.button;
        if let Some(transform) = self
            .scene
            .component::<PressableButton>(button)
            .map(PressableButton::visuals_transform)
        {
            if let Some(actor) = self.scene.actor_mut(visuals) {
                actor.transform = transform;
            }
            let prims: Vec<PrimitiveId> =
                self.scene.primitives_of(visuals).map(|(id, _)| id).collect();
            for id in prims {
                if let Some(prim) = self.scene.primitive_mut(id) {
                    prim.transform = transform;
                }
            }
        }

        let thumb = self
            .scene
            .component::<PinchSlider>(self.slider)
            .and_then(|s| Some((s.thumb_primitive()?, s.thumb_transform())));
        if let Some((id, transform)) = thumb {
            if let Some(prim) = self.scene.primitive_mut(id) {
                prim.transform = transform;
            }
        }

        let (cube, actor, prim) = self.cube;
        let Some(transform) = self
            .scene
            .component::<GenericManipulator>(cube)
            .map(GenericManipulator::transform)
        else {
            return;
        };
        if let Some(actor) = self.scene.actor_mut(actor) {
            actor.transform = transform;
        }
        if let Some(prim) = self.scene.primitive_mut(prim) {
            prim.transform = transform;
        }
    }

    /// Index tip at `tip`, thumb far enough away not to pinch.
    fn point_finger(&mut self, tip: Vec3A) {
        self.hands.set_tracked(Hand::Right, true);
        self.hands.set_grabbing(Hand::Right, Some(false));
        let center = tip - Vec3A::X * (HOVER_GAP * 0.5);
        self.hands
            .place_pinch(Hand::Right, center, Quat::IDENTITY, HOVER_GAP);
    }

    fn drop_hand(&mut self) {
        self.hands.set_tracked(Hand::Right, false);
        self.hands.set_grabbing(Hand::Right, None);
    }

    fn aim_far(&mut self, pose: Affine3A, pressed: bool) {
        if let Some(p) = self.system.pointers.far_mut(self.far) {
            p.set_pose(pose);
            p.set_pressed(pressed);
        }
    }

    fn park_far(&mut self) {
        // pointing up and away from everything
        let pose = Affine3A::from_rotation_translation(
            Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, 1.5, 0.0),
        );
        self.aim_far(pose, false);
    }

    fn play(&mut self, scenario: Scenario, frames: u32, dt: f32) {
        log::info!("Playing {} for {} frames", scenario, frames);
        self.park_far();
        let frames = frames.max(4);
        for frame in 0..frames {
            let t = frame as f32 / (frames - 1) as f32;
            match scenario {
                Scenario::Button => self.script_button(t),
                Scenario::Slider => self.script_slider(t),
                Scenario::Manipulate => self.script_manipulate(t),
                Scenario::All => {}
            }
            self.step(dt);
        }
        self.drop_hand();
        self.park_far();
        self.step(dt);
    }

    /// Pokes straight through the button and pulls back out.
    fn script_button(&mut self, t: f32) {
        let depth = 1.0 - (t * 2.0 - 1.0).abs();
        let z = BUTTON_POS.z + 0.06 - depth * 0.08;
        self.point_finger(Vec3A::new(BUTTON_POS.x, BUTTON_POS.y, z));
    }

    /// Hovers the thumb, pinches it and drags it to the far end of the track.
    fn script_slider(&mut self, t: f32) {
        let Some(slider) = self.scene.component::<PinchSlider>(self.slider) else {
            return;
        };
        let thumb = slider.thumb_transform().translation;
        let end = Vec3A::from(SLIDER_POS) + Vec3A::X * slider.end_distance();

        self.hands.set_tracked(Hand::Right, true);
        self.hands.set_grabbing(Hand::Right, None);
        if t < 0.15 {
            self.slider_grab = None;
            self.hands
                .place_pinch(Hand::Right, thumb, Quat::IDENTITY, HOVER_GAP);
        } else if t < 0.9 {
            let start = *self.slider_grab.get_or_insert(thumb);
            let along = ((t - 0.15) / 0.75).clamp(0.0, 1.0);
            self.hands
                .place_pinch(Hand::Right, start.lerp(end, along), Quat::IDENTITY, 0.0);
        } else {
            self.hands
                .place_pinch(Hand::Right, end, Quat::IDENTITY, HOVER_GAP);
        }
    }

    /// Grabs the cube with the far ray, sweeps it sideways and lets go.
    fn script_manipulate(&mut self, t: f32) {
        let sweep = (t * std::f32::consts::TAU).sin() * 0.3;
        let pose = Affine3A::from_translation(Vec3::new(sweep, CUBE_POS.y, 0.0));
        self.aim_far(pose, (0.1..0.9).contains(&t));
    }
}

fn spawn_button(
    scene: &mut Scene,
    config: &InteractionConfig,
) -> anyhow::Result<(TargetId, ActorId)> {
    let transform = Affine3A::from_translation(BUTTON_POS);
    let owner = scene.add_actor("button", transform);
    let visuals = scene.add_actor("button_visuals", transform);
    scene
        .add_primitive(
            visuals,
            Shape::Box {
                half_extents: Vec3A::new(0.016, 0.016, 0.008),
            },
            transform,
        )
        .context("visuals actor vanished")?;

    let mut button = PressableButton::new(transform, config.button)?;
    button
        .attach(scene, owner, visuals)
        .context("button has no collision box")?;
    button.events.register(|e| log::info!("button: {:?}", e));

    let id = scene
        .add_component(owner, button)
        .context("button actor vanished")?;
    Ok((id, visuals))
}

fn spawn_slider(scene: &mut Scene, config: &InteractionConfig) -> anyhow::Result<TargetId> {
    let transform = Affine3A::from_translation(SLIDER_POS);
    let owner = scene.add_actor("slider", transform);

    let mut slider = PinchSlider::new(transform, config.slider)?;
    slider
        .attach(scene, owner, Shape::Sphere { radius: 0.015 })
        .context("slider has no thumb")?;
    slider.events.register(|e| log::info!("slider: {:?}", e));

    scene
        .add_component(owner, slider)
        .context("slider actor vanished")
}

fn spawn_cube(
    scene: &mut Scene,
    config: &InteractionConfig,
) -> anyhow::Result<(TargetId, ActorId, PrimitiveId)> {
    let transform = Affine3A::from_translation(CUBE_POS);
    let owner = scene.add_actor("cube", transform);
    let prim = scene
        .add_primitive(
            owner,
            Shape::Box {
                half_extents: Vec3A::splat(0.1),
            },
            transform,
        )
        .context("cube actor vanished")?;

    let mut manipulator = GenericManipulator::new(transform, config.manipulator);
    manipulator
        .events
        .register(|e| log::info!("cube: {:?}", e));

    let id = scene
        .add_component(owner, manipulator)
        .context("cube actor vanished")?;
    Ok((id, owner, prim))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    log::info!(
        "Welcome to {} version {}!",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();
    if args.init_config {
        let root = ensure_config_root();
        log::info!("Config directory: {}", root.to_string_lossy());
    }

    let config = load_config(args.config.as_deref()).context("Failed to load config")?;
    let mut demo = Demo::new(&config)?;

    let scenarios: &[Scenario] = match args.scenario {
        Scenario::All => &[Scenario::Button, Scenario::Slider, Scenario::Manipulate],
        ref one => std::slice::from_ref(one),
    };
    for scenario in scenarios {
        demo.play(*scenario, args.frames, args.dt);
    }

    if let Some(slider) = demo.scene.component::<PinchSlider>(demo.slider) {
        log::info!("Final slider value: {:.3}", slider.value());
    }
    if let Some(cube) = demo.scene.component::<GenericManipulator>(demo.cube.0) {
        log::info!("Final cube position: {}", cube.transform().translation);
    }
    Ok(())
}
