//! The listener of a context.
//!
//! Listener fields are write-only. There are no getters:
//!
//! ```compile_fail
//! # use alkit::prelude::*;
//! # fn main() -> alkit::AlResult<()> {
//! let device = Device::open_default()?;
//! let context = device.create_context()?;
//! let _current = context.activate()?;
//! let gain = context.listener().gain();
//! # Ok(())
//! # }
//! ```
use std::rc::Rc;

use crate::{
    audio::math::vec3::Vec3,
    context::inner::ContextInner,
    sys::ListenerProp,
    validate, AlResult,
};

/// Write-only view of the listener of a context.
pub struct Listener<'a> {
    ctx: &'a Rc<ContextInner>,
}

impl<'a> Listener<'a> {
    pub(crate) fn new(ctx: &'a Rc<ContextInner>) -> Self {
        Self { ctx }
    }

    /// Context check first, then `valid`, then the engine write.
    fn set(&self, valid: AlResult<()>, prop: ListenerProp) -> AlResult<()> {
        self.ctx.require_current()?;
        valid?;
        self.ctx.engine(|d, c| d.set_listener(c, prop))
    }

    /// Master gain, `>= 0`.
    pub fn set_gain(&self, gain: f32) -> AlResult<()> {
        self.set(
            validate::non_negative("listener gain", gain),
            ListenerProp::Gain(gain),
        )
    }

    pub fn set_position(&self, position: Vec3) -> AlResult<()> {
        self.set(
            validate::vector("listener position", position),
            ListenerProp::Position(position.into()),
        )
    }

    pub fn set_velocity(&self, velocity: Vec3) -> AlResult<()> {
        self.set(
            validate::vector("listener velocity", velocity),
            ListenerProp::Velocity(velocity.into()),
        )
    }

    /// Facing direction and up vector.
    pub fn set_orientation(&self, at: Vec3, up: Vec3) -> AlResult<()> {
        self.set(
            validate::vector("listener orientation", at)
                .and_then(|_| validate::vector("listener orientation", up)),
            ListenerProp::Orientation(at.into(), up.into()),
        )
    }

    /// World units per meter, `> 0`. Scales air absorption and effect
    /// distances.
    pub fn set_meters_per_unit(&self, meters_per_unit: f32) -> AlResult<()> {
        self.set(
            validate::positive("meters per unit", meters_per_unit),
            ListenerProp::MetersPerUnit(meters_per_unit),
        )
    }

    #[cfg(test)]
    pub(crate) fn engine_props(&self) -> crate::sys::ListenerProps {
        self.ctx
            .engine(|d, c| d.listener(c))
            .expect("listener props")
    }
}

#[cfg(test)]
mod test {
    use crate::{
        audio::math::vec3::Vec3,
        context::ContextOps,
        test_util::{assert_f32_eq, with_context},
        AlError,
    };

    #[test]
    fn test_listener_gain() {
        with_context(|_, ctx| {
            let listener = ctx.listener();
            listener.set_gain(0.0)?;
            listener.set_gain(f32::INFINITY)?;
            listener.set_gain(5.0 / 7.0)?;
            assert!(matches!(
                listener.set_gain(-1.0),
                Err(AlError::Validation { .. })
            ));
            assert_f32_eq(listener.engine_props().gain, 5.0 / 7.0);
            Ok(())
        });
    }

    #[test]
    fn test_listener_meters_per_unit() {
        with_context(|_, ctx| {
            let listener = ctx.listener();
            listener.set_meters_per_unit(f32::INFINITY)?;
            listener.set_meters_per_unit(4.2)?;
            assert!(listener.set_meters_per_unit(0.0).is_err());
            assert!(listener.set_meters_per_unit(-420.0).is_err());
            assert_f32_eq(listener.engine_props().meters_per_unit, 4.2);
            Ok(())
        });
    }

    #[test]
    fn test_listener_vectors() {
        with_context(|_, ctx| {
            let listener = ctx.listener();
            listener.set_position(Vec3::new(1.0, 0.0, 1.0))?;
            listener.set_velocity(Vec3::new(420.0, 0.0, 0.0))?;
            listener.set_orientation(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0))?;
            assert!(listener
                .set_position(Vec3::new(f32::NAN, 0.0, 0.0))
                .is_err());
            assert_eq!(listener.engine_props().position, [1.0, 0.0, 1.0]);
            Ok(())
        });
    }
}
