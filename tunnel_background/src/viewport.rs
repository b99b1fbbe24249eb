//! Mounting the tunnel into its host: camera, surface size, subscriptions, teardown.
//!
//! Mount runs on `OnEnter(BackgroundState::Mounted)` and teardown on
//! `OnExit`. Everything a mount creates lives either under the
//! [`BackgroundHost`] entity or in the [`TunnelInstance`] resource, and both
//! are emptied at teardown.

use std::sync::Arc;

use bevy::prelude::*;
use bevy::render::camera::Viewport;
use bevy::state::app::StatesPlugin;
use bevy::window::{PrimaryWindow, WindowResized};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::bricks::{BrickAtlas, Pattern};
use crate::config::TunnelSettings;
use crate::error::TunnelError;
use crate::render::VolumeFactoryResource;
use crate::scene::scroll::scroll_tunnel;
use crate::scene::{brick_material, build_tunnel, ScrollAnimator, TunnelGeometry, TunnelState};

const CAMERA_FOV: f32 = std::f32::consts::FRAC_PI_3;
const CAMERA_NEAR: f32 = 0.1;
const LIGHT_INTENSITY: f32 = 4_000_000.0;

/// Whether the tunnel is currently mounted in its host.
#[derive(States, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BackgroundState {
    #[default]
    Unmounted,
    Mounted,
}

/// Per-frame work, in the order it runs.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunnelSystems {
    Resize,
    Scroll,
    Notify,
}

/// Host notifications the tunnel can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostEvent {
    Frame,
    Resize,
}

/// Handle returned by [`HostSubscriptions::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subscription {
    event: HostEvent,
    id: u64,
}

/// Live host subscriptions. At most one per event; systems listening to an
/// event only run while it is subscribed.
#[derive(Resource, Debug, Default)]
pub struct HostSubscriptions {
    next_id: u64,
    live: Vec<Subscription>,
}

impl HostSubscriptions {
    pub fn subscribe(&mut self, event: HostEvent) -> Result<Subscription, TunnelError> {
        if self.is_subscribed(event) {
            return Err(TunnelError::AlreadySubscribed(event));
        }
        self.next_id += 1;
        let subscription = Subscription {
            event,
            id: self.next_id,
        };
        self.live.push(subscription);
        Ok(subscription)
    }

    /// Cancels `subscription`, which must be the live handle for its event.
    pub fn cancel(&mut self, subscription: Subscription) -> Result<(), TunnelError> {
        let Some(index) = self.live.iter().position(|s| *s == subscription) else {
            return Err(TunnelError::StaleSubscription(subscription));
        };
        self.live.swap_remove(index);
        Ok(())
    }

    pub fn is_subscribed(&self, event: HostEvent) -> bool {
        self.live.iter().any(|s| s.event == event)
    }

    pub fn pending(&self) -> usize {
        self.live.len()
    }
}

pub type ReadyFn = Arc<dyn Fn() + Send + Sync>;

/// Called once per mount, after the tunnel has been built.
#[derive(Resource, Clone, Default)]
pub struct ReadyCallback(pub Option<ReadyFn>);

/// One-shot wrapper around the ready callback. Dropping it unfired means the
/// callback never runs.
pub struct ReadySignal {
    callback: Option<ReadyFn>,
}

impl ReadySignal {
    pub fn new(callback: Option<ReadyFn>) -> Self {
        Self { callback }
    }

    pub fn is_armed(&self) -> bool {
        self.callback.is_some()
    }

    /// Runs the callback if it has not run yet. Returns whether it ran.
    pub fn fire(&mut self) -> bool {
        match self.callback.take() {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

/// Container entity the mounted camera, light and tunnel are parented to.
#[derive(Resource, Clone, Copy, Debug)]
pub struct BackgroundHost(pub Entity);

#[derive(Component)]
pub struct BackgroundHostNode;

#[derive(Component)]
pub struct TunnelCamera;

/// Everything owned by the currently mounted tunnel.
#[derive(Resource)]
pub struct TunnelInstance {
    pub(crate) state: TunnelState,
    pub(crate) animator: ScrollAnimator,
    resize: Option<Subscription>,
    ready: ReadySignal,
    camera: Entity,
}

impl TunnelInstance {
    pub fn state(&self) -> &TunnelState {
        &self.state
    }

    pub fn animator(&self) -> &ScrollAnimator {
        &self.animator
    }

    pub fn camera(&self) -> Entity {
        self.camera
    }
}

pub fn tunnel_plugin(app: &mut App) {
    if !app.is_plugin_added::<StatesPlugin>() {
        app.add_plugins(StatesPlugin);
    }
    if !app.world().contains_resource::<BackgroundHost>() {
        let host = app
            .world_mut()
            .spawn((BackgroundHostNode, Transform::default(), Visibility::default()))
            .id();
        app.insert_resource(BackgroundHost(host));
    }

    app.init_resource::<TunnelSettings>()
        .init_resource::<VolumeFactoryResource>()
        .init_resource::<ReadyCallback>()
        .init_resource::<HostSubscriptions>()
        .add_event::<WindowResized>()
        .init_state::<BackgroundState>()
        .configure_sets(
            Update,
            (
                TunnelSystems::Resize,
                TunnelSystems::Scroll,
                TunnelSystems::Notify,
            )
                .chain(),
        )
        .add_systems(
            OnEnter(BackgroundState::Mounted),
            mount_tunnel.pipe(abandon_failed_mount),
        )
        .add_systems(
            OnExit(BackgroundState::Mounted),
            (
                unsubscribe_resize.pipe(report_teardown_error),
                stop_animator.pipe(report_teardown_error),
                clear_host,
            )
                .chain(),
        )
        .add_systems(
            Update,
            (
                apply_resize
                    .in_set(TunnelSystems::Resize)
                    .run_if(subscribed(HostEvent::Resize)),
                scroll_tunnel
                    .in_set(TunnelSystems::Scroll)
                    .run_if(subscribed(HostEvent::Frame)),
                notify_ready
                    .in_set(TunnelSystems::Notify)
                    .run_if(resource_exists::<TunnelInstance>),
            ),
        );
}

fn subscribed(event: HostEvent) -> impl FnMut(Res<HostSubscriptions>) -> bool + Clone {
    move |subscriptions: Res<HostSubscriptions>| subscriptions.is_subscribed(event)
}

fn aspect_ratio(width: f32, height: f32) -> f32 {
    if height > 0.0 {
        width / height
    } else {
        1.0
    }
}

fn surface_viewport(physical_width: u32, physical_height: u32) -> Viewport {
    Viewport {
        physical_position: UVec2::ZERO,
        physical_size: UVec2::new(physical_width.max(1), physical_height.max(1)),
        ..default()
    }
}

#[allow(clippy::too_many_arguments)]
fn mount_tunnel(
    mut commands: Commands,
    settings: Res<TunnelSettings>,
    volumes: Res<VolumeFactoryResource>,
    ready: Res<ReadyCallback>,
    host: Res<BackgroundHost>,
    time: Res<Time>,
    mut subscriptions: ResMut<HostSubscriptions>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
    windows: Query<&Window, With<PrimaryWindow>>,
) -> Result<(), TunnelError> {
    let geometry = TunnelGeometry::new(&settings)?;
    let window = windows.get_single().map_err(|_| TunnelError::NoViewport)?;

    let mut animator = ScrollAnimator::new(settings.scroll_step, settings.rotation_speed);
    animator.start(&mut subscriptions, time.elapsed())?;
    let resize = match subscriptions.subscribe(HostEvent::Resize) {
        Ok(subscription) => subscription,
        Err(err) => {
            animator.stop(&mut subscriptions)?;
            return Err(err);
        }
    };

    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let pattern = Pattern::random(&mut rng, geometry.row_count);
    let atlas = BrickAtlas::generate(&mut rng, &geometry.atlas_spec(), &pattern);
    let material = brick_material(&mut materials, &mut images, atlas);

    let camera = commands
        .spawn((
            TunnelCamera,
            Camera3d::default(),
            Camera {
                viewport: Some(surface_viewport(
                    window.physical_width(),
                    window.physical_height(),
                )),
                ..default()
            },
            Projection::Perspective(PerspectiveProjection {
                fov: CAMERA_FOV,
                aspect_ratio: aspect_ratio(window.width(), window.height()),
                near: CAMERA_NEAR,
                far: geometry.period * 2.0,
            }),
            Transform::default(),
        ))
        .set_parent(host.0)
        .id();
    commands
        .spawn((
            PointLight {
                intensity: LIGHT_INTENSITY,
                range: geometry.period,
                ..default()
            },
            Transform::default(),
        ))
        .set_parent(host.0);

    let layout = build_tunnel(
        &mut commands,
        host.0,
        &geometry,
        &pattern,
        &mut rng,
        &material,
        &mut meshes,
        volumes.0.as_ref(),
    );

    info!(
        "tunnel mounted: {} sectors x {} rows, radius {:.2}, surface {}x{}",
        geometry.sector_count,
        geometry.row_count,
        geometry.radius,
        window.physical_width(),
        window.physical_height()
    );

    commands.insert_resource(TunnelInstance {
        state: TunnelState::new(geometry, pattern, layout.root, layout.row_sections),
        animator,
        resize: Some(resize),
        ready: ReadySignal::new(ready.0.clone()),
        camera,
    });
    Ok(())
}

/// A failed mount leaves nothing behind; fall back to no background.
fn abandon_failed_mount(
    In(result): In<Result<(), TunnelError>>,
    mut next: ResMut<NextState<BackgroundState>>,
) {
    if let Err(err) = result {
        error!("tunnel mount failed: {err}");
        next.set(BackgroundState::Unmounted);
    }
}

fn apply_resize(
    instance: Option<Res<TunnelInstance>>,
    mut resized: EventReader<WindowResized>,
    windows: Query<(Entity, &Window), With<PrimaryWindow>>,
    mut cameras: Query<(&mut Camera, &mut Projection), With<TunnelCamera>>,
) {
    let (Some(instance), Ok((primary, window))) = (instance, windows.get_single()) else {
        resized.clear();
        return;
    };
    let Some(event) = resized.read().filter(|e| e.window == primary).last() else {
        return;
    };
    let Ok((mut camera, mut projection)) = cameras.get_mut(instance.camera()) else {
        return;
    };

    let scale = window.scale_factor();
    let physical_width = (event.width * scale).round() as u32;
    let physical_height = (event.height * scale).round() as u32;
    if let Projection::Perspective(perspective) = &mut *projection {
        perspective.aspect_ratio = aspect_ratio(event.width, event.height);
    }
    camera.viewport = Some(surface_viewport(physical_width, physical_height));
    debug!("tunnel surface resized to {physical_width}x{physical_height}");
}

fn notify_ready(mut instance: ResMut<TunnelInstance>) {
    if instance.ready.fire() {
        debug!("tunnel ready");
    }
}

fn unsubscribe_resize(
    instance: Option<ResMut<TunnelInstance>>,
    mut subscriptions: ResMut<HostSubscriptions>,
) -> Result<(), TunnelError> {
    let Some(mut instance) = instance else {
        return Ok(());
    };
    match instance.resize.take() {
        Some(subscription) => subscriptions.cancel(subscription),
        None => Ok(()),
    }
}

fn stop_animator(
    instance: Option<ResMut<TunnelInstance>>,
    mut subscriptions: ResMut<HostSubscriptions>,
) -> Result<(), TunnelError> {
    match instance {
        Some(mut instance) => instance.animator.stop(&mut subscriptions),
        None => Ok(()),
    }
}

fn report_teardown_error(In(result): In<Result<(), TunnelError>>) {
    if let Err(err) = result {
        warn!("tunnel teardown: {err}");
    }
}

fn clear_host(
    mut commands: Commands,
    host: Res<BackgroundHost>,
    instance: Option<Res<TunnelInstance>>,
) {
    commands.entity(host.0).despawn_descendants();
    if instance.is_some() {
        commands.remove_resource::<TunnelInstance>();
        info!("tunnel unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn duplicate_subscription_is_rejected() {
        let mut subscriptions = HostSubscriptions::default();
        subscriptions.subscribe(HostEvent::Resize).unwrap();

        assert!(matches!(
            subscriptions.subscribe(HostEvent::Resize),
            Err(TunnelError::AlreadySubscribed(HostEvent::Resize))
        ));
        assert_eq!(subscriptions.pending(), 1);
    }

    #[test]
    fn only_the_live_handle_cancels() {
        let mut subscriptions = HostSubscriptions::default();
        let first = subscriptions.subscribe(HostEvent::Frame).unwrap();
        subscriptions.cancel(first).unwrap();
        let second = subscriptions.subscribe(HostEvent::Frame).unwrap();

        assert!(matches!(
            subscriptions.cancel(first),
            Err(TunnelError::StaleSubscription(_))
        ));
        assert!(subscriptions.is_subscribed(HostEvent::Frame));

        subscriptions.cancel(second).unwrap();
        assert_eq!(subscriptions.pending(), 0);
    }

    #[test]
    fn events_are_tracked_independently() {
        let mut subscriptions = HostSubscriptions::default();
        let frame = subscriptions.subscribe(HostEvent::Frame).unwrap();
        subscriptions.subscribe(HostEvent::Resize).unwrap();

        subscriptions.cancel(frame).unwrap();

        assert!(!subscriptions.is_subscribed(HostEvent::Frame));
        assert!(subscriptions.is_subscribed(HostEvent::Resize));
    }

    #[test]
    fn ready_signal_fires_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut signal = ReadySignal::new(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        assert!(signal.fire());
        assert!(!signal.fire());
        assert!(!signal.is_armed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_ready_signal_never_fires() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let signal = ReadySignal::new(Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })));

        assert!(signal.is_armed());
        drop(signal);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn aspect_ratio_of_empty_surface_is_one() {
        assert_eq!(aspect_ratio(800.0, 600.0), 800.0 / 600.0);
        assert_eq!(aspect_ratio(800.0, 0.0), 1.0);
    }
}
