//! Environmental effects.
//!
//! An [`Effect`] holds a validated parameter set, either a reverb
//! ([`ReverbProperties`]) or a chorus ([`ChorusProperties`]). It does nothing
//! on its own: applying it to an
//! [`AuxiliaryEffectSlot`](slot::AuxiliaryEffectSlot) copies the parameters
//! into the slot, and sources feed the slot through their
//! [sends](crate::source::SourceOps::send).
//!
//! ```
//! # use alkit::prelude::*;
//! # fn main() -> alkit::AlResult<()> {
//! # let device = Device::open_default()?;
//! # let context = device.create_context()?;
//! # let _current = context.activate()?;
//! let reverb = Effect::new()?;
//! reverb.set_reverb_preset("CAVE")?;
//! let slot = AuxiliaryEffectSlot::new()?;
//! slot.apply_effect(Some(&reverb))?;
//!
//! let source = Source::new()?;
//! source.send(0)?.set_effect(Some(&slot))?;
//! assert_eq!(slot.use_count()?, 1);
//! # Ok(())
//! # }
//! ```
use crate::{
    audio::math::vec3::Vec3,
    context::inner::Handle,
    sys, AlResult,
};

pub mod presets;
pub mod slot;

/// What an effect or slot currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectType {
    Null,
    Reverb,
    Chorus,
}

impl EffectType {
    pub(crate) fn from_raw(kind: sys::ALenum) -> Self {
        match kind {
            sys::AL_EFFECT_EAXREVERB => EffectType::Reverb,
            sys::AL_EFFECT_CHORUS => EffectType::Chorus,
            _ => EffectType::Null,
        }
    }
}

/// EAX reverb parameters with the EFX ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbProperties {
    /// `[0, 1]`
    pub density: f32,
    /// `[0, 1]`
    pub diffusion: f32,
    /// `[0, 1]`
    pub gain: f32,
    /// `[0, 1]`
    pub gain_hf: f32,
    /// `[0, 1]`
    pub gain_lf: f32,
    /// `[0.1, 20]` seconds
    pub decay_time: f32,
    /// `[0.1, 2]`
    pub decay_hf_ratio: f32,
    /// `[0.1, 2]`
    pub decay_lf_ratio: f32,
    /// `[0, 3.16]`
    pub reflections_gain: f32,
    /// `[0, 0.3]` seconds
    pub reflections_delay: f32,
    pub reflections_pan: Vec3,
    /// `[0, 10]`
    pub late_reverb_gain: f32,
    /// `[0, 0.1]` seconds
    pub late_reverb_delay: f32,
    pub late_reverb_pan: Vec3,
    /// `[0.075, 0.25]` seconds
    pub echo_time: f32,
    /// `[0, 1]`
    pub echo_depth: f32,
    /// `[0.04, 4]` seconds
    pub modulation_time: f32,
    /// `[0, 1]`
    pub modulation_depth: f32,
    /// `[0.892, 1]`
    pub air_absorption_gain_hf: f32,
    /// `[1000, 20000]` Hz
    pub hf_reference: f32,
    /// `[20, 1000]` Hz
    pub lf_reference: f32,
    /// `[0, 10]`
    pub room_rolloff_factor: f32,
    pub decay_hf_limit: bool,
}

impl Default for ReverbProperties {
    /// The `GENERIC` preset.
    fn default() -> Self {
        Self {
            density: 1.0,
            diffusion: 1.0,
            gain: 0.3162,
            gain_hf: 0.8913,
            gain_lf: 1.0,
            decay_time: 1.49,
            decay_hf_ratio: 0.83,
            decay_lf_ratio: 1.0,
            reflections_gain: 0.05,
            reflections_delay: 0.007,
            reflections_pan: Vec3::ZERO,
            late_reverb_gain: 1.2589,
            late_reverb_delay: 0.011,
            late_reverb_pan: Vec3::ZERO,
            echo_time: 0.25,
            echo_depth: 0.0,
            modulation_time: 0.25,
            modulation_depth: 0.0,
            air_absorption_gain_hf: 0.9943,
            hf_reference: 5000.0,
            lf_reference: 250.0,
            room_rolloff_factor: 0.0,
            decay_hf_limit: true,
        }
    }
}

impl ReverbProperties {
    /// A named preset such as `"GENERIC"`, `"CAVE"` or `"UNDERWATER"`. See
    /// [`presets::names`].
    pub fn preset(name: &str) -> AlResult<Self> {
        presets::reverb(name)
    }

    pub fn validate(&self) -> AlResult<()> {
        use crate::validate::{in_range, vector};

        in_range("reverb density", self.density, 0.0, 1.0)?;
        in_range("reverb diffusion", self.diffusion, 0.0, 1.0)?;
        in_range("reverb gain", self.gain, 0.0, 1.0)?;
        in_range("reverb gain_hf", self.gain_hf, 0.0, 1.0)?;
        in_range("reverb gain_lf", self.gain_lf, 0.0, 1.0)?;
        in_range("reverb decay_time", self.decay_time, 0.1, 20.0)?;
        in_range("reverb decay_hf_ratio", self.decay_hf_ratio, 0.1, 2.0)?;
        in_range("reverb decay_lf_ratio", self.decay_lf_ratio, 0.1, 2.0)?;
        in_range("reverb reflections_gain", self.reflections_gain, 0.0, 3.16)?;
        in_range("reverb reflections_delay", self.reflections_delay, 0.0, 0.3)?;
        vector("reverb reflections_pan", self.reflections_pan)?;
        in_range("reverb late_reverb_gain", self.late_reverb_gain, 0.0, 10.0)?;
        in_range("reverb late_reverb_delay", self.late_reverb_delay, 0.0, 0.1)?;
        vector("reverb late_reverb_pan", self.late_reverb_pan)?;
        in_range("reverb echo_time", self.echo_time, 0.075, 0.25)?;
        in_range("reverb echo_depth", self.echo_depth, 0.0, 1.0)?;
        in_range("reverb modulation_time", self.modulation_time, 0.04, 4.0)?;
        in_range("reverb modulation_depth", self.modulation_depth, 0.0, 1.0)?;
        in_range(
            "reverb air_absorption_gain_hf",
            self.air_absorption_gain_hf,
            0.892,
            1.0,
        )?;
        in_range("reverb hf_reference", self.hf_reference, 1000.0, 20000.0)?;
        in_range("reverb lf_reference", self.lf_reference, 20.0, 1000.0)?;
        in_range("reverb room_rolloff_factor", self.room_rolloff_factor, 0.0, 10.0)
    }

    fn params(&self) -> [(sys::ALenum, [f32; 3]); 23] {
        let s = |v: f32| [v, 0.0, 0.0];
        [
            (sys::AL_EAXREVERB_DENSITY, s(self.density)),
            (sys::AL_EAXREVERB_DIFFUSION, s(self.diffusion)),
            (sys::AL_EAXREVERB_GAIN, s(self.gain)),
            (sys::AL_EAXREVERB_GAINHF, s(self.gain_hf)),
            (sys::AL_EAXREVERB_GAINLF, s(self.gain_lf)),
            (sys::AL_EAXREVERB_DECAY_TIME, s(self.decay_time)),
            (sys::AL_EAXREVERB_DECAY_HFRATIO, s(self.decay_hf_ratio)),
            (sys::AL_EAXREVERB_DECAY_LFRATIO, s(self.decay_lf_ratio)),
            (sys::AL_EAXREVERB_REFLECTIONS_GAIN, s(self.reflections_gain)),
            (sys::AL_EAXREVERB_REFLECTIONS_DELAY, s(self.reflections_delay)),
            (sys::AL_EAXREVERB_REFLECTIONS_PAN, self.reflections_pan.into()),
            (sys::AL_EAXREVERB_LATE_REVERB_GAIN, s(self.late_reverb_gain)),
            (sys::AL_EAXREVERB_LATE_REVERB_DELAY, s(self.late_reverb_delay)),
            (sys::AL_EAXREVERB_LATE_REVERB_PAN, self.late_reverb_pan.into()),
            (sys::AL_EAXREVERB_ECHO_TIME, s(self.echo_time)),
            (sys::AL_EAXREVERB_ECHO_DEPTH, s(self.echo_depth)),
            (sys::AL_EAXREVERB_MODULATION_TIME, s(self.modulation_time)),
            (sys::AL_EAXREVERB_MODULATION_DEPTH, s(self.modulation_depth)),
            (
                sys::AL_EAXREVERB_AIR_ABSORPTION_GAINHF,
                s(self.air_absorption_gain_hf),
            ),
            (sys::AL_EAXREVERB_HFREFERENCE, s(self.hf_reference)),
            (sys::AL_EAXREVERB_LFREFERENCE, s(self.lf_reference)),
            (sys::AL_EAXREVERB_ROOM_ROLLOFF_FACTOR, s(self.room_rolloff_factor)),
            (
                sys::AL_EAXREVERB_DECAY_HFLIMIT,
                s(if self.decay_hf_limit { 1.0 } else { 0.0 }),
            ),
        ]
    }

    fn from_params(get: impl Fn(sys::ALenum) -> AlResult<[f32; 3]>) -> AlResult<Self> {
        let s = |p| get(p).map(|v| v[0]);
        Ok(Self {
            density: s(sys::AL_EAXREVERB_DENSITY)?,
            diffusion: s(sys::AL_EAXREVERB_DIFFUSION)?,
            gain: s(sys::AL_EAXREVERB_GAIN)?,
            gain_hf: s(sys::AL_EAXREVERB_GAINHF)?,
            gain_lf: s(sys::AL_EAXREVERB_GAINLF)?,
            decay_time: s(sys::AL_EAXREVERB_DECAY_TIME)?,
            decay_hf_ratio: s(sys::AL_EAXREVERB_DECAY_HFRATIO)?,
            decay_lf_ratio: s(sys::AL_EAXREVERB_DECAY_LFRATIO)?,
            reflections_gain: s(sys::AL_EAXREVERB_REFLECTIONS_GAIN)?,
            reflections_delay: s(sys::AL_EAXREVERB_REFLECTIONS_DELAY)?,
            reflections_pan: get(sys::AL_EAXREVERB_REFLECTIONS_PAN)?.into(),
            late_reverb_gain: s(sys::AL_EAXREVERB_LATE_REVERB_GAIN)?,
            late_reverb_delay: s(sys::AL_EAXREVERB_LATE_REVERB_DELAY)?,
            late_reverb_pan: get(sys::AL_EAXREVERB_LATE_REVERB_PAN)?.into(),
            echo_time: s(sys::AL_EAXREVERB_ECHO_TIME)?,
            echo_depth: s(sys::AL_EAXREVERB_ECHO_DEPTH)?,
            modulation_time: s(sys::AL_EAXREVERB_MODULATION_TIME)?,
            modulation_depth: s(sys::AL_EAXREVERB_MODULATION_DEPTH)?,
            air_absorption_gain_hf: s(sys::AL_EAXREVERB_AIR_ABSORPTION_GAINHF)?,
            hf_reference: s(sys::AL_EAXREVERB_HFREFERENCE)?,
            lf_reference: s(sys::AL_EAXREVERB_LFREFERENCE)?,
            room_rolloff_factor: s(sys::AL_EAXREVERB_ROOM_ROLLOFF_FACTOR)?,
            decay_hf_limit: s(sys::AL_EAXREVERB_DECAY_HFLIMIT)? != 0.0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChorusWaveform {
    Sine,
    Triangle,
}

/// Chorus parameters with the EFX ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChorusProperties {
    pub waveform: ChorusWaveform,
    /// `[-180, 180]` degrees
    pub phase: i32,
    /// `[0, 10]` Hz
    pub rate: f32,
    /// `[0, 1]`
    pub depth: f32,
    /// `[-1, 1]`
    pub feedback: f32,
    /// `[0, 0.016]` seconds
    pub delay: f32,
}

impl Default for ChorusProperties {
    fn default() -> Self {
        Self {
            waveform: ChorusWaveform::Triangle,
            phase: 90,
            rate: 1.1,
            depth: 0.1,
            feedback: 0.25,
            delay: 0.016,
        }
    }
}

impl ChorusProperties {
    pub fn validate(&self) -> AlResult<()> {
        use crate::{validate::in_range, AlError};

        if !(-180..=180).contains(&self.phase) {
            return Err(AlError::validation("chorus phase", self.phase));
        }
        in_range("chorus rate", self.rate, 0.0, 10.0)?;
        in_range("chorus depth", self.depth, 0.0, 1.0)?;
        in_range("chorus feedback", self.feedback, -1.0, 1.0)?;
        in_range("chorus delay", self.delay, 0.0, 0.016)
    }

    fn params(&self) -> [(sys::ALenum, [f32; 3]); 6] {
        let waveform = match self.waveform {
            ChorusWaveform::Sine => sys::AL_CHORUS_WAVEFORM_SINUSOID,
            ChorusWaveform::Triangle => sys::AL_CHORUS_WAVEFORM_TRIANGLE,
        };
        [
            (sys::AL_CHORUS_WAVEFORM, [waveform as f32, 0.0, 0.0]),
            (sys::AL_CHORUS_PHASE, [self.phase as f32, 0.0, 0.0]),
            (sys::AL_CHORUS_RATE, [self.rate, 0.0, 0.0]),
            (sys::AL_CHORUS_DEPTH, [self.depth, 0.0, 0.0]),
            (sys::AL_CHORUS_FEEDBACK, [self.feedback, 0.0, 0.0]),
            (sys::AL_CHORUS_DELAY, [self.delay, 0.0, 0.0]),
        ]
    }

    fn from_params(get: impl Fn(sys::ALenum) -> AlResult<[f32; 3]>) -> AlResult<Self> {
        let s = |p| get(p).map(|v| v[0]);
        let waveform = if s(sys::AL_CHORUS_WAVEFORM)? as sys::ALenum == sys::AL_CHORUS_WAVEFORM_SINUSOID {
            ChorusWaveform::Sine
        } else {
            ChorusWaveform::Triangle
        };
        Ok(Self {
            waveform,
            phase: s(sys::AL_CHORUS_PHASE)? as i32,
            rate: s(sys::AL_CHORUS_RATE)?,
            depth: s(sys::AL_CHORUS_DEPTH)?,
            feedback: s(sys::AL_CHORUS_FEEDBACK)?,
            delay: s(sys::AL_CHORUS_DELAY)?,
        })
    }
}

/// An owned effect object. Dropping it destroys the effect; slots it was
/// applied to keep their copy of the parameters.
pub struct Effect {
    handle: Handle,
}

impl Effect {
    /// Creates a null effect in the current context.
    pub fn new() -> AlResult<Self> {
        Ok(Self {
            handle: effect_ffi::effect_init()?,
        })
    }

    pub fn effect_type(&self) -> AlResult<EffectType> {
        effect_ffi::check(&self.handle)?;
        self.handle
            .engine(|d, c, e| d.effect_type(c, e))
            .map(EffectType::from_raw)
    }

    /// Turns the effect into a reverb with `props`. Nothing changes if any
    /// field is out of range.
    pub fn set_reverb_properties(&self, props: &ReverbProperties) -> AlResult<()> {
        effect_ffi::check(&self.handle)?;
        props.validate()?;
        effect_ffi::load(&self.handle, sys::AL_EFFECT_EAXREVERB, &props.params())
    }

    /// Loads a named reverb preset.
    pub fn set_reverb_preset(&self, name: &str) -> AlResult<()> {
        effect_ffi::check(&self.handle)?;
        let props = presets::reverb(name)?;
        self.set_reverb_properties(&props)
    }

    /// Fails with [`AlError::State`](crate::AlError::State) unless the effect
    /// is a reverb.
    pub fn reverb_properties(&self) -> AlResult<ReverbProperties> {
        effect_ffi::expect_type(&self.handle, EffectType::Reverb)?;
        ReverbProperties::from_params(|p| self.handle.engine(|d, c, e| d.effect_param(c, e, p)))
    }

    pub fn set_chorus_properties(&self, props: &ChorusProperties) -> AlResult<()> {
        effect_ffi::check(&self.handle)?;
        props.validate()?;
        effect_ffi::load(&self.handle, sys::AL_EFFECT_CHORUS, &props.params())
    }

    pub fn chorus_properties(&self) -> AlResult<ChorusProperties> {
        effect_ffi::expect_type(&self.handle, EffectType::Chorus)?;
        ChorusProperties::from_params(|p| self.handle.engine(|d, c, e| d.effect_param(c, e, p)))
    }

    /// Back to the null effect.
    pub fn clear(&self) -> AlResult<()> {
        effect_ffi::check(&self.handle)?;
        effect_ffi::load(&self.handle, sys::AL_EFFECT_NULL, &[])
    }

    pub fn destroy(&mut self) -> AlResult<()> {
        effect_ffi::effect_destroy(&self.handle, true)
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        if let Err(e) = effect_ffi::effect_destroy(&self.handle, false) {
            tracing::warn!(effect = self.handle.name, error = %e, "effect drop failed");
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Effect").field(&self.handle).finish()
    }
}

pub(crate) mod effect_ffi {
    use crate::{
        context::{
            inner::{ContextState, Handle},
            registry,
        },
        effect::{Effect, EffectType},
        sys, AlError, AlResult, ContextError,
    };

    pub fn handle(effect: &Effect) -> &Handle {
        &effect.handle
    }

    pub fn alive(state: &ContextState, name: sys::ALuint) -> bool {
        state.effects.contains(&name)
    }

    #[inline]
    pub fn check(h: &Handle) -> AlResult<()> {
        h.check("effect", alive)
    }

    pub fn effect_init() -> AlResult<Handle> {
        let ctx = registry::current_inner().ok_or(ContextError::NoCurrent)?;
        ctx.require_current()?;
        let name = ctx.engine(|d, c| d.create_effect(c))?;
        ctx.state.borrow_mut().effects.insert(name);
        tracing::trace!(context = ctx.name, effect = name, "effect created");
        Ok(Handle::new(ctx, name))
    }

    pub fn effect_destroy(h: &Handle, checked: bool) -> AlResult<()> {
        if checked {
            check(h)?;
        } else if h.ctx.destroyed.get() || !alive(&h.ctx.state.borrow(), h.name) {
            return Ok(());
        }
        h.ctx.state.borrow_mut().effects.remove(&h.name);
        tracing::trace!(context = h.ctx.name, effect = h.name, "effect destroyed");
        h.engine(|d, c, e| d.delete_effect(c, e))
    }

    /// Switches the effect to `kind` and writes `params`.
    pub fn load(h: &Handle, kind: sys::ALenum, params: &[(sys::ALenum, [f32; 3])]) -> AlResult<()> {
        h.engine(|d, c, e| {
            d.set_effect_type(c, e, kind)?;
            params
                .iter()
                .try_for_each(|(param, value)| d.set_effect_param(c, e, *param, *value))
        })
    }

    pub fn expect_type(h: &Handle, expected: EffectType) -> AlResult<()> {
        check(h)?;
        let actual = EffectType::from_raw(h.engine(|d, c, e| d.effect_type(c, e))?);
        if actual == expected {
            Ok(())
        } else {
            Err(AlError::state(format!(
                "effect holds {actual:?}, not {expected:?}"
            )))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        context::ContextOps,
        test_util::{test_device, with_context},
        AlError, ContextError,
    };

    #[test]
    fn test_effect_requires_current_context() {
        let device = test_device();
        let _context = device.create_context().unwrap();
        assert_eq!(
            Effect::new().err(),
            Some(AlError::Context(ContextError::NoCurrent))
        );
    }

    #[test]
    fn test_new_effect_is_null() {
        with_context(|_, _| {
            let effect = Effect::new()?;
            assert_eq!(effect.effect_type()?, EffectType::Null);
            assert!(matches!(effect.reverb_properties(), Err(AlError::State(_))));
            Ok(())
        });
    }

    #[test]
    fn test_reverb_round_trip_and_rejection() {
        with_context(|_, _| {
            let effect = Effect::new()?;
            let props = ReverbProperties {
                decay_time: 3.5,
                reflections_pan: Vec3::new(0.0, 0.5, -0.5),
                decay_hf_limit: false,
                ..Default::default()
            };
            effect.set_reverb_properties(&props)?;
            assert_eq!(effect.effect_type()?, EffectType::Reverb);
            assert_eq!(effect.reverb_properties()?, props);

            let bad = ReverbProperties {
                decay_time: 25.0,
                ..props
            };
            assert_eq!(
                effect.set_reverb_properties(&bad),
                Err(AlError::validation("reverb decay_time", 25.0f32))
            );
            assert_eq!(effect.reverb_properties()?, props);
            Ok(())
        });
    }

    #[test]
    fn test_reverb_boundaries() {
        let mut props = ReverbProperties {
            decay_time: 0.1,
            echo_time: 0.25,
            air_absorption_gain_hf: 0.892,
            ..Default::default()
        };
        assert!(props.validate().is_ok());
        props.air_absorption_gain_hf = 0.89;
        assert!(props.validate().is_err());
        props.air_absorption_gain_hf = 1.0;
        props.late_reverb_pan = Vec3::new(f32::NAN, 0.0, 0.0);
        assert!(props.validate().is_err());
    }

    #[test]
    fn test_chorus_round_trip_and_rejection() {
        with_context(|_, _| {
            let effect = Effect::new()?;
            let props = ChorusProperties {
                waveform: ChorusWaveform::Sine,
                phase: -180,
                feedback: -1.0,
                ..Default::default()
            };
            effect.set_chorus_properties(&props)?;
            assert_eq!(effect.chorus_properties()?, props);
            assert!(effect
                .set_chorus_properties(&ChorusProperties {
                    phase: 181,
                    ..props
                })
                .is_err());
            assert!(effect
                .set_chorus_properties(&ChorusProperties {
                    delay: 0.02,
                    ..props
                })
                .is_err());
            assert_eq!(effect.chorus_properties()?, props);

            effect.clear()?;
            assert_eq!(effect.effect_type()?, EffectType::Null);
            Ok(())
        });
    }

    #[test]
    fn test_reverb_preset_by_name() {
        with_context(|_, _| {
            let effect = Effect::new()?;
            effect.set_reverb_preset("GENERIC")?;
            assert_eq!(effect.reverb_properties()?, ReverbProperties::default());
            assert!(matches!(
                effect.set_reverb_preset("NOT_AN_EFFECT"),
                Err(AlError::Validation { .. })
            ));
            Ok(())
        });
    }

    #[test]
    fn test_effect_requires_its_context() {
        let device = test_device();
        let a = device.create_context().unwrap();
        let b = device.create_context().unwrap();
        let effect = {
            let _guard = a.activate().unwrap();
            Effect::new().unwrap()
        };
        let _guard = b.activate().unwrap();
        assert_eq!(
            effect.set_chorus_properties(&ChorusProperties::default()),
            Err(AlError::Context(ContextError::Mismatch))
        );
    }

    #[test]
    fn test_destroyed_effect() {
        with_context(|_, _| {
            let mut effect = Effect::new()?;
            effect.destroy()?;
            assert_eq!(effect.effect_type(), Err(AlError::Destroyed("effect")));
            assert_eq!(effect.destroy(), Err(AlError::Destroyed("effect")));
            Ok(())
        });
    }
}
