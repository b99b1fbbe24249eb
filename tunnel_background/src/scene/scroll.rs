//! Per-frame scroll along the axis plus a slow spin of the whole tunnel.

use std::time::Duration;

use bevy::prelude::*;

use crate::bricks::Pattern;
use crate::error::TunnelError;
use crate::scene::tunnel::{RowSection, TunnelGeometry, TunnelRoot};
use crate::viewport::{HostEvent, HostSubscriptions, Subscription, TunnelInstance};

/// Live axial offset, always in `[0, period)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollOffset {
    value: f32,
    period: f32,
}

impl ScrollOffset {
    pub fn new(period: f32) -> Self {
        Self { value: 0.0, period }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    pub fn advance(&mut self, step: f32) {
        self.value = (self.value + step).rem_euclid(self.period);
    }

    /// Axial position of a row section that started at `base_z`.
    pub fn axial_position(&self, base_z: f32) -> f32 {
        (base_z + self.value).rem_euclid(self.period)
    }
}

/// Everything one mounted tunnel owns.
#[derive(Debug)]
pub struct TunnelState {
    pub geometry: TunnelGeometry,
    pub pattern: Pattern,
    pub scroll: ScrollOffset,
    pub root: Entity,
    pub row_sections: Vec<Entity>,
}

impl TunnelState {
    pub fn new(
        geometry: TunnelGeometry,
        pattern: Pattern,
        root: Entity,
        row_sections: Vec<Entity>,
    ) -> Self {
        Self {
            scroll: ScrollOffset::new(geometry.period),
            geometry,
            pattern,
            root,
            row_sections,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimatorState {
    Stopped,
    Running {
        subscription: Subscription,
        started_at: Duration,
    },
}

/// Drives the scroll while it holds the frame subscription.
///
/// Starts `Stopped`; `start` moves it to `Running` and `stop` back to
/// `Stopped` for good.
#[derive(Debug)]
pub struct ScrollAnimator {
    state: AnimatorState,
    step: f32,
    rotation_speed: f32,
    retired: bool,
}

impl ScrollAnimator {
    pub fn new(step: f32, rotation_speed: f32) -> Self {
        Self {
            state: AnimatorState::Stopped,
            step,
            rotation_speed,
            retired: false,
        }
    }

    pub fn state(&self) -> AnimatorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, AnimatorState::Running { .. })
    }

    pub fn start(
        &mut self,
        subscriptions: &mut HostSubscriptions,
        now: Duration,
    ) -> Result<(), TunnelError> {
        if self.retired {
            return Err(TunnelError::AnimatorRetired);
        }
        if self.is_running() {
            return Err(TunnelError::AlreadySubscribed(HostEvent::Frame));
        }
        let subscription = subscriptions.subscribe(HostEvent::Frame)?;
        self.state = AnimatorState::Running {
            subscription,
            started_at: now,
        };
        Ok(())
    }

    /// Cancels the handle taken in `start`. A no-op when not running.
    pub fn stop(&mut self, subscriptions: &mut HostSubscriptions) -> Result<(), TunnelError> {
        let AnimatorState::Running { subscription, .. } = self.state else {
            return Ok(());
        };
        self.state = AnimatorState::Stopped;
        self.retired = true;
        subscriptions.cancel(subscription)
    }

    /// Advances the scroll by one step and returns the root's rotation for
    /// `now`, or `None` when stopped.
    pub fn tick(&self, scroll: &mut ScrollOffset, now: Duration) -> Option<Quat> {
        let AnimatorState::Running { started_at, .. } = self.state else {
            return None;
        };
        scroll.advance(self.step);
        let elapsed = now.saturating_sub(started_at).as_secs_f32();
        Some(Quat::from_rotation_z(elapsed * self.rotation_speed))
    }
}

pub(crate) fn scroll_tunnel(
    time: Res<Time>,
    instance: Option<ResMut<TunnelInstance>>,
    mut sections: Query<(&RowSection, &mut Transform), Without<TunnelRoot>>,
    mut roots: Query<&mut Transform, With<TunnelRoot>>,
) {
    let Some(mut instance) = instance else {
        return;
    };
    let instance = &mut *instance;
    let Some(rotation) = instance.animator.tick(&mut instance.state.scroll, time.elapsed()) else {
        return;
    };

    let scroll = instance.state.scroll;
    for &entity in &instance.state.row_sections {
        if let Ok((section, mut transform)) = sections.get_mut(entity) {
            transform.translation.z = scroll.axial_position(section.base_z);
        }
    }
    if let Ok(mut transform) = roots.get_mut(instance.state.root) {
        transform.rotation = rotation;
    }
}
