//! Playback voices.
//!
//! A [`Source`] plays a [`Buffer`](crate::buffer::Buffer) or streams from a
//! [`Decoder`](crate::decoder::Decoder). It is created against the current
//! context and every later call requires that context to be current again.
//!
//! [`SourceRef`] is a clonable, non-owning view. Message handlers receive
//! them, and [`SourceOps::to_source_ref`] makes one from any source.
//!
//! ## Properties
//! Every property has a getter and a setter, validated before the engine sees
//! it. A rejected write keeps the previous value. The playback state is
//! read-only and the direct filter is write-only:
//!
//! ```compile_fail
//! # use alkit::prelude::*;
//! # fn main() -> alkit::AlResult<()> {
//! # let device = Device::open_default()?;
//! # let context = device.create_context()?;
//! # let _current = context.activate()?;
//! let source = Source::new()?;
//! source.set_playing(true)?;
//! # Ok(())
//! # }
//! ```
//!
//! ```compile_fail
//! # use alkit::prelude::*;
//! # fn main() -> alkit::AlResult<()> {
//! # let device = Device::open_default()?;
//! # let context = device.create_context()?;
//! # let _current = context.activate()?;
//! let source = Source::new()?;
//! let filter = source.filter()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Voices and priority
//! A context plays at most `max_voices` sources at once. Starting another one
//! force-stops the active source with the lowest priority, provided that
//! priority is strictly lower than the new source's. Otherwise `play` fails
//! with [`AlError::Resource`](crate::AlError::Resource).
use std::{rc::Rc, time::Duration};

use crate::{
    audio::{math::vec3::Vec3, spatial::Spatialize},
    buffer::Buffer,
    context::inner::{ContextInner, Handle},
    decoder::Decoder,
    source::{
        sends::{FilterParams, SourceSend},
        source_group::SourceGroupRef,
        stream::StreamState,
    },
    sys::{self, SourceProp},
    validate, AlResult,
};

pub mod sends;
pub mod source_group;
pub(crate) mod stream;

/// Engine-reported playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayState {
    Initial,
    Playing,
    Paused,
    Stopped,
}

impl From<sys::PlayState> for PlayState {
    fn from(v: sys::PlayState) -> Self {
        match v {
            sys::PlayState::Initial => PlayState::Initial,
            sys::PlayState::Playing => PlayState::Playing,
            sys::PlayState::Paused => PlayState::Paused,
            sys::PlayState::Stopped => PlayState::Stopped,
        }
    }
}

/// Per-source bookkeeping kept next to the engine voice.
pub(crate) struct SourceRecord {
    pub(crate) priority: u32,
    pub(crate) group: Option<sys::ALuint>,
    pub(crate) buffer: Option<String>,
    pub(crate) stream: Option<StreamState>,
    pub(crate) sends: Vec<Option<sys::ALuint>>,
}

impl SourceRecord {
    fn new(max_sends: u32) -> Self {
        Self {
            priority: 0,
            group: None,
            buffer: None,
            stream: None,
            sends: vec![None; max_sends as usize],
        }
    }
}

/// An owned playback voice. Dropping it destroys the voice.
pub struct Source {
    handle: SourceRef,
}

/// A non-owning view of a source.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SourceRef {
    pub(crate) handle: Handle,
}

impl SourceRef {
    pub(crate) fn from_name(ctx: Rc<ContextInner>, name: sys::ALuint) -> Self {
        Self {
            handle: Handle::new(ctx, name),
        }
    }
}

impl Source {
    /// Creates a source in the current context.
    pub fn new() -> AlResult<Self> {
        let handle = source_ffi::source_init()?;
        Ok(Self {
            handle: SourceRef { handle },
        })
    }

    pub fn as_source_ref(&self) -> &SourceRef {
        &self.handle
    }

    /// Stops the source, releases its buffer or stream, detaches its sends
    /// and leaves its group.
    pub fn destroy(&mut self) -> AlResult<()> {
        source_ffi::source_destroy(&self.handle.handle, true)
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        if let Err(e) = source_ffi::source_destroy(&self.handle.handle, false) {
            tracing::warn!(source = self.handle.handle.name, error = %e, "source drop failed");
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Source").field(&self.handle.handle).finish()
    }
}

impl PartialEq<SourceRef> for Source {
    fn eq(&self, other: &SourceRef) -> bool {
        self.handle == *other
    }
}

impl PartialEq<Source> for SourceRef {
    fn eq(&self, other: &Source) -> bool {
        *self == other.handle
    }
}

pub(crate) mod private_source {
    use super::*;

    pub trait SourceHandleProvider<T: ?Sized> {
        fn handle(t: &T) -> &Handle;
    }

    pub struct SourceProvider;
    pub struct SourceRefProvider;

    impl SourceHandleProvider<Source> for SourceProvider {
        #[inline]
        fn handle(t: &Source) -> &Handle {
            &t.handle.handle
        }
    }

    impl SourceHandleProvider<SourceRef> for SourceRefProvider {
        #[inline]
        fn handle(t: &SourceRef) -> &Handle {
            &t.handle
        }
    }

    pub fn handle<T: AsSourceHandle + ?Sized>(t: &T) -> &Handle {
        <T as AsSourceHandle>::__HandleProvider::handle(t)
    }
}

#[doc(hidden)]
pub trait AsSourceHandle {
    type __HandleProvider: private_source::SourceHandleProvider<Self>;
}

#[doc(hidden)]
impl AsSourceHandle for Source {
    type __HandleProvider = private_source::SourceProvider;
}

#[doc(hidden)]
impl AsSourceHandle for SourceRef {
    type __HandleProvider = private_source::SourceRefProvider;
}

impl<T: AsSourceHandle + ?Sized> SourceOps for T {}

/// Playback control and properties shared by [`Source`] and [`SourceRef`].
pub trait SourceOps: AsSourceHandle {
    fn to_source_ref(&self) -> SourceRef {
        SourceRef {
            handle: private_source::handle(self).clone(),
        }
    }

    /// Plays `buffer` from its start, replacing whatever the source played
    /// before.
    fn play(&self, buffer: &Buffer) -> AlResult<()> {
        source_ffi::play(self, buffer)
    }

    /// Streams from `decoder`, keeping up to `queue_size` chunks of
    /// `chunk_len` frames queued. [`update`](crate::context::ContextOps::update)
    /// refills the queue; a queue that runs dry stops the source.
    fn play_stream(
        &self,
        decoder: Box<dyn Decoder>,
        chunk_len: usize,
        queue_size: usize,
    ) -> AlResult<()> {
        stream::play_stream(private_source::handle(self), decoder, chunk_len, queue_size)
    }

    /// Stops playback and releases the buffer or stream.
    fn stop(&self) -> AlResult<()> {
        source_ffi::stop(self)
    }

    /// Pauses a playing source. Other states are left alone.
    fn pause(&self) -> AlResult<()> {
        source_ffi::pause(self)
    }

    /// Resumes a paused source. Other states are left alone.
    fn resume(&self) -> AlResult<()> {
        source_ffi::resume(self)
    }

    /// Ramps the gain linearly down to `gain` (in `[0, 1]`) over `duration`,
    /// then stops. The source must be playing.
    fn fade_out_to_stop(&self, gain: f32, duration: Duration) -> AlResult<()> {
        source_ffi::fade_out_to_stop(self, gain, duration)
    }

    fn state(&self) -> AlResult<PlayState> {
        source_ffi::state(self)
    }

    fn playing(&self) -> AlResult<bool> {
        Ok(self.state()? == PlayState::Playing)
    }

    fn paused(&self) -> AlResult<bool> {
        Ok(self.state()? == PlayState::Paused)
    }

    /// Voice-stealing priority. Higher wins.
    fn priority(&self) -> AlResult<u32> {
        source_ffi::priority(self)
    }

    fn set_priority(&self, priority: u32) -> AlResult<()> {
        source_ffi::set_priority(self, priority)
    }

    /// Playback position in frames.
    fn offset(&self) -> AlResult<u64> {
        source_ffi::offset(self)
    }

    /// Seeks to `frames`. Fails with [`AlError::State`](crate::AlError::State)
    /// when nothing is attached or `frames` is past the end.
    fn set_offset(&self, frames: u64) -> AlResult<()> {
        source_ffi::set_offset(self, frames)
    }

    fn offset_seconds(&self) -> AlResult<f64> {
        source_ffi::offset_seconds(self)
    }

    /// Delay between the playback position and what reaches the output.
    fn latency(&self) -> AlResult<Duration> {
        let h = private_source::handle(self);
        source_ffi::check(h)?;
        h.engine(|d, c, s| d.source_latency(c, s))
            .map(Duration::from_nanos)
    }

    fn latency_seconds(&self) -> AlResult<f64> {
        self.latency().map(|l| l.as_secs_f64())
    }

    fn looping(&self) -> AlResult<bool> {
        source_ffi::props(self).map(|p| p.looping)
    }

    fn set_looping(&self, looping: bool) -> AlResult<()> {
        source_ffi::set(self, Ok(()), SourceProp::Looping(looping))
    }

    fn pitch(&self) -> AlResult<f32> {
        source_ffi::props(self).map(|p| p.pitch)
    }

    /// Playback speed multiplier, `> 0`.
    fn set_pitch(&self, pitch: f32) -> AlResult<()> {
        source_ffi::set(self, validate::positive("pitch", pitch), SourceProp::Pitch(pitch))
    }

    fn gain(&self) -> AlResult<f32> {
        source_ffi::props(self).map(|p| p.gain)
    }

    /// Linear gain, `>= 0`.
    fn set_gain(&self, gain: f32) -> AlResult<()> {
        source_ffi::set(self, validate::non_negative("gain", gain), SourceProp::Gain(gain))
    }

    fn gain_range(&self) -> AlResult<(f32, f32)> {
        source_ffi::props(self).map(|p| p.gain_range)
    }

    /// Clamp applied to the final gain. `min <= max`, both in `[0, 1]`.
    fn set_gain_range(&self, range: (f32, f32)) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::ordered_pair("gain range", range, 0.0, 1.0),
            SourceProp::GainRange(range.0, range.1),
        )
    }

    fn distance_range(&self) -> AlResult<(f32, f32)> {
        source_ffi::props(self).map(|p| p.distance_range)
    }

    /// Reference and maximum distance. `0 <= reference <= max`; `max` must
    /// be finite (`f32::MAX` means unbounded).
    fn set_distance_range(&self, range: (f32, f32)) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::distance_range("distance range", range),
            SourceProp::DistanceRange(range.0, range.1),
        )
    }

    fn position(&self) -> AlResult<Vec3> {
        source_ffi::props(self).map(|p| p.position.into())
    }

    fn set_position(&self, position: Vec3) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::vector("position", position),
            SourceProp::Position(position.into()),
        )
    }

    fn velocity(&self) -> AlResult<Vec3> {
        source_ffi::props(self).map(|p| p.velocity.into())
    }

    fn set_velocity(&self, velocity: Vec3) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::vector("velocity", velocity),
            SourceProp::Velocity(velocity.into()),
        )
    }

    /// `(at, up)` vectors.
    fn orientation(&self) -> AlResult<(Vec3, Vec3)> {
        source_ffi::props(self).map(|p| (p.orientation.0.into(), p.orientation.1.into()))
    }

    fn set_orientation(&self, orientation: (Vec3, Vec3)) -> AlResult<()> {
        let (at, up) = orientation;
        source_ffi::set(
            self,
            validate::vector("orientation", at).and(validate::vector("orientation", up)),
            SourceProp::Orientation(at.into(), up.into()),
        )
    }

    fn cone_angles(&self) -> AlResult<(f32, f32)> {
        source_ffi::props(self).map(|p| p.cone_angles)
    }

    /// Inner and outer cone angles in degrees, each in `[0, 360]`.
    fn set_cone_angles(&self, angles: (f32, f32)) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::pair_in_range("cone angles", angles, 0.0, 360.0),
            SourceProp::ConeAngles(angles.0, angles.1),
        )
    }

    fn outer_cone_gains(&self) -> AlResult<(f32, f32)> {
        source_ffi::props(self).map(|p| p.outer_cone_gains)
    }

    /// Gain and high-frequency gain outside the cone. `gain <= gain_hf`, both
    /// in `[0, 1]`.
    fn set_outer_cone_gains(&self, gains: (f32, f32)) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::ordered_pair("outer cone gains", gains, 0.0, 1.0),
            SourceProp::OuterConeGains(gains.0, gains.1),
        )
    }

    fn rolloff_factors(&self) -> AlResult<(f32, f32)> {
        source_ffi::props(self).map(|p| p.rolloff_factors)
    }

    /// Distance and room rolloff, both `>= 0`.
    fn set_rolloff_factors(&self, factors: (f32, f32)) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::pair_non_negative("rolloff factors", factors),
            SourceProp::RolloffFactors(factors.0, factors.1),
        )
    }

    fn doppler_factor(&self) -> AlResult<f32> {
        source_ffi::props(self).map(|p| p.doppler_factor)
    }

    /// In `[0, 1]`.
    fn set_doppler_factor(&self, factor: f32) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::in_range("doppler factor", factor, 0.0, 1.0),
            SourceProp::DopplerFactor(factor),
        )
    }

    fn relative(&self) -> AlResult<bool> {
        source_ffi::props(self).map(|p| p.relative)
    }

    /// Whether position and velocity are relative to the listener.
    fn set_relative(&self, relative: bool) -> AlResult<()> {
        source_ffi::set(self, Ok(()), SourceProp::Relative(relative))
    }

    fn radius(&self) -> AlResult<f32> {
        source_ffi::props(self).map(|p| p.radius)
    }

    fn set_radius(&self, radius: f32) -> AlResult<()> {
        source_ffi::set(self, validate::non_negative("radius", radius), SourceProp::Radius(radius))
    }

    fn stereo_angles(&self) -> AlResult<(f32, f32)> {
        source_ffi::props(self).map(|p| p.stereo_angles)
    }

    /// Left and right channel angles in radians for stereo sources.
    fn set_stereo_angles(&self, angles: (f32, f32)) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::pair_not_nan("stereo angles", angles),
            SourceProp::StereoAngles(angles.0, angles.1),
        )
    }

    fn spatialize(&self) -> AlResult<Spatialize> {
        source_ffi::props(self).and_then(|p| Spatialize::try_from(p.spatialize))
    }

    fn set_spatialize(&self, spatialize: Spatialize) -> AlResult<()> {
        source_ffi::set(self, Ok(()), SourceProp::Spatialize(spatialize.into()))
    }

    fn resampler_index(&self) -> AlResult<usize> {
        source_ffi::props(self).map(|p| p.resampler as usize)
    }

    /// Index into [`available_resamplers`](crate::context::ContextOps::available_resamplers).
    fn set_resampler_index(&self, index: usize) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::resampler_index(index),
            SourceProp::Resampler(index as i32),
        )
    }

    fn air_absorption_factor(&self) -> AlResult<f32> {
        source_ffi::props(self).map(|p| p.air_absorption)
    }

    /// In `[0, 10]`.
    fn set_air_absorption_factor(&self, factor: f32) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::in_range("air absorption factor", factor, 0.0, 10.0),
            SourceProp::AirAbsorption(factor),
        )
    }

    /// Automatic `(direct, send, send_hf)` gain adjustments.
    fn gain_auto(&self) -> AlResult<(bool, bool, bool)> {
        source_ffi::props(self).map(|p| p.gain_auto)
    }

    fn set_gain_auto(&self, gain_auto: (bool, bool, bool)) -> AlResult<()> {
        let (direct, send, send_hf) = gain_auto;
        source_ffi::set(self, Ok(()), SourceProp::GainAuto(direct, send, send_hf))
    }

    /// Filter on the direct (dry) path. Write-only.
    fn set_filter(&self, filter: FilterParams) -> AlResult<()> {
        source_ffi::set(
            self,
            validate::direct_filter_gains("direct filter", filter.into()),
            SourceProp::DirectFilter(filter.into()),
        )
    }

    fn group(&self) -> AlResult<Option<SourceGroupRef>> {
        source_group::group_ffi::source_group(private_source::handle(self))
    }

    /// Moves the source into `group`, or out of any group with `None`.
    fn set_group(&self, group: Option<&SourceGroupRef>) -> AlResult<()> {
        source_group::group_ffi::set_source_group(private_source::handle(self), group)
    }

    /// Auxiliary send `index`, in `0..max_auxiliary_sends`.
    fn send(&self, index: usize) -> AlResult<SourceSend<'_>> {
        sends::send_ffi::send(private_source::handle(self), index)
    }
}

pub(crate) mod source_ffi {
    use std::{rc::Rc, time::Duration};

    use crate::{
        buffer::{buffer_ffi, Buffer},
        context::{
            inner::{ContextInner, ContextState, Handle},
            message, registry,
        },
        source::{private_source, source_group::group_ffi, stream, AsSourceHandle, PlayState, SourceRecord, SourceRef},
        sys::{self, SourceProp},
        validate, AlError, AlResult, ContextError,
    };

    pub fn alive(state: &ContextState, name: sys::ALuint) -> bool {
        state.sources.contains_key(&name)
    }

    #[inline]
    pub fn check(h: &Handle) -> AlResult<()> {
        h.check("source", alive)
    }

    pub fn source_init() -> AlResult<Handle> {
        let ctx = registry::current_inner().ok_or(ContextError::NoCurrent)?;
        ctx.require_current()?;
        let name = ctx.engine(|d, c| d.create_source(c))?;
        ctx.state
            .borrow_mut()
            .sources
            .insert(name, SourceRecord::new(ctx.max_sends));
        tracing::trace!(context = ctx.name, source = name, "source created");
        Ok(Handle::new(ctx, name))
    }

    /// With `checked == false` (drop path) a dead source or context is not an
    /// error and the current context is not required.
    pub fn source_destroy(h: &Handle, checked: bool) -> AlResult<()> {
        if checked {
            check(h)?;
        } else if h.ctx.destroyed.get() || !alive(&h.ctx.state.borrow(), h.name) {
            return Ok(());
        }
        h.engine(|d, c, s| d.stop_source(c, s))?;
        release(&h.ctx, h.name)?;
        group_ffi::detach_source(&h.ctx, h.name)?;
        let record = h.ctx.state.borrow_mut().sources.remove(&h.name);
        if let Some(record) = record {
            let mut state = h.ctx.state.borrow_mut();
            for (index, slot) in record.sends.iter().enumerate() {
                if let Some(slot) = slot.and_then(|s| state.slots.get_mut(&s)) {
                    slot.sends.remove(&(h.name, index as u32));
                }
            }
        }
        tracing::trace!(context = h.ctx.name, source = h.name, "source destroyed");
        h.engine(|d, c, s| d.delete_source(c, s))
    }

    pub fn props<S: AsSourceHandle + ?Sized>(source: &S) -> AlResult<sys::SourceProps> {
        let h = private_source::handle(source);
        check(h)?;
        h.engine(|d, c, s| d.source_props(c, s))
    }

    /// Context checks first, then `valid`, then the engine write.
    pub fn set<S: AsSourceHandle + ?Sized>(
        source: &S,
        valid: AlResult<()>,
        prop: SourceProp,
    ) -> AlResult<()> {
        let h = private_source::handle(source);
        check(h)?;
        valid?;
        h.engine(|d, c, s| d.set_source(c, s, prop))
    }

    pub fn engine_state(ctx: &ContextInner, name: sys::ALuint) -> AlResult<PlayState> {
        ctx.engine(|d, c| d.source_state(c, name)).map(PlayState::from)
    }

    fn is_active(ctx: &ContextInner, name: sys::ALuint) -> AlResult<bool> {
        Ok(matches!(
            engine_state(ctx, name)?,
            PlayState::Playing | PlayState::Paused
        ))
    }

    /// Makes sure `h` can take a voice, preempting a lower-priority source
    /// when the context is full.
    pub fn reserve_voice(h: &Handle) -> AlResult<()> {
        let ctx = &h.ctx;
        if is_active(ctx, h.name)? {
            return Ok(());
        }
        let (priority, others) = {
            let state = ctx.state.borrow();
            let priority = state.sources.get(&h.name).map_or(0, |r| r.priority);
            let others: Vec<(sys::ALuint, u32)> = state
                .sources
                .iter()
                .filter(|(name, _)| **name != h.name)
                .map(|(name, r)| (*name, r.priority))
                .collect();
            (priority, others)
        };
        let mut active = Vec::new();
        for (name, p) in others {
            if is_active(ctx, name)? {
                active.push((name, p));
            }
        }
        if active.len() < ctx.max_voices {
            return Ok(());
        }
        let victim = active
            .iter()
            .filter(|(_, p)| *p < priority)
            .min_by_key(|(name, p)| (*p, *name))
            .copied();
        match victim {
            Some((name, victim_priority)) => {
                tracing::debug!(
                    context = ctx.name,
                    source = h.name,
                    priority,
                    victim = name,
                    victim_priority,
                    "voice preempted"
                );
                force_stop(ctx, name)
            }
            None => Err(AlError::resource(format!(
                "all {} voices are taken by sources of priority {priority} or higher",
                ctx.max_voices
            ))),
        }
    }

    /// Stops `name`, releases its data and reports it as force-stopped.
    pub fn force_stop(ctx: &Rc<ContextInner>, name: sys::ALuint) -> AlResult<()> {
        ctx.engine(|d, c| d.stop_source(c, name))?;
        release(ctx, name)?;
        let source = SourceRef::from_name(ctx.clone(), name);
        message::dispatch(ctx, |h| h.source_force_stopped(&source));
        Ok(())
    }

    /// Detaches the buffer or stream of a stopped source.
    pub fn release(ctx: &ContextInner, name: sys::ALuint) -> AlResult<()> {
        let (buffer, stream) = {
            let mut guard = ctx.state.borrow_mut();
            let state = &mut *guard;
            let Some(record) = state.sources.get_mut(&name) else {
                return Ok(());
            };
            let buffer = record.buffer.take();
            let stream = record.stream.take();
            if let Some(entry) = buffer.as_ref().and_then(|b| state.buffers.get_mut(b)) {
                entry.sources.remove(&name);
            }
            (buffer, stream)
        };
        if buffer.is_some() {
            ctx.engine(|d, c| d.set_source_buffer(c, name, None))?;
        }
        if stream.is_some() {
            ctx.engine(|d, c| d.clear_source_queue(c, name))?;
        }
        Ok(())
    }

    /// Handles an engine stop event. Returns `false` for stale events (the
    /// source is gone or was restarted since).
    pub fn on_engine_stop(ctx: &Rc<ContextInner>, name: sys::ALuint) -> AlResult<bool> {
        if !alive(&ctx.state.borrow(), name) {
            return Ok(false);
        }
        if engine_state(ctx, name)? != PlayState::Stopped {
            return Ok(false);
        }
        release(ctx, name)?;
        Ok(true)
    }

    /// Releases every attached buffer and stream, after a device loss.
    pub fn release_all(ctx: &Rc<ContextInner>) -> AlResult<()> {
        let names: Vec<sys::ALuint> = ctx
            .state
            .borrow()
            .sources
            .iter()
            .filter(|(_, r)| r.buffer.is_some() || r.stream.is_some())
            .map(|(name, _)| *name)
            .collect();
        for name in names {
            release(ctx, name)?;
        }
        Ok(())
    }

    pub fn play<S: AsSourceHandle + ?Sized>(source: &S, buffer: &Buffer) -> AlResult<()> {
        let h = private_source::handle(source);
        check(h)?;
        buffer_ffi::check(buffer)?;
        if !Rc::ptr_eq(&h.ctx, buffer.context()) {
            return Err(ContextError::Mismatch.into());
        }
        reserve_voice(h)?;
        h.engine(|d, c, s| d.stop_source(c, s))?;
        release(&h.ctx, h.name)?;
        let engine_buffer = buffer_ffi::engine_name(buffer)?;
        h.engine(|d, c, s| d.set_source_buffer(c, s, Some(engine_buffer)))?;
        {
            let mut guard = h.ctx.state.borrow_mut();
            let state = &mut *guard;
            if let Some(entry) = state.buffers.get_mut(buffer.name()) {
                entry.sources.insert(h.name);
            }
            if let Some(record) = state.sources.get_mut(&h.name) {
                record.buffer = Some(buffer.name().to_string());
            }
        }
        h.engine(|d, c, s| d.play_source(c, s))
    }

    pub fn stop<S: AsSourceHandle + ?Sized>(source: &S) -> AlResult<()> {
        let h = private_source::handle(source);
        check(h)?;
        h.engine(|d, c, s| d.stop_source(c, s))?;
        release(&h.ctx, h.name)
    }

    pub fn pause<S: AsSourceHandle + ?Sized>(source: &S) -> AlResult<()> {
        let h = private_source::handle(source);
        check(h)?;
        h.engine(|d, c, s| d.pause_source(c, s))
    }

    pub fn resume<S: AsSourceHandle + ?Sized>(source: &S) -> AlResult<()> {
        let h = private_source::handle(source);
        check(h)?;
        h.engine(|d, c, s| d.resume_source(c, s))
    }

    pub fn fade_out_to_stop<S: AsSourceHandle + ?Sized>(
        source: &S,
        gain: f32,
        duration: Duration,
    ) -> AlResult<()> {
        let h = private_source::handle(source);
        check(h)?;
        validate::in_range("fade gain", gain, 0.0, 1.0)?;
        if engine_state(&h.ctx, h.name)? != PlayState::Playing {
            return Err(AlError::state("only a playing source can fade out"));
        }
        let frames = (duration.as_secs_f64() * h.ctx.frequency as f64).round() as u64;
        h.engine(|d, c, s| d.fade_source(c, s, gain, frames))
    }

    pub fn state<S: AsSourceHandle + ?Sized>(source: &S) -> AlResult<PlayState> {
        let h = private_source::handle(source);
        check(h)?;
        engine_state(&h.ctx, h.name)
    }

    pub fn priority<S: AsSourceHandle + ?Sized>(source: &S) -> AlResult<u32> {
        let h = private_source::handle(source);
        check(h)?;
        let state = h.ctx.state.borrow();
        Ok(state.sources.get(&h.name).map_or(0, |r| r.priority))
    }

    pub fn set_priority<S: AsSourceHandle + ?Sized>(source: &S, priority: u32) -> AlResult<()> {
        let h = private_source::handle(source);
        check(h)?;
        if let Some(record) = h.ctx.state.borrow_mut().sources.get_mut(&h.name) {
            record.priority = priority;
        }
        Ok(())
    }

    /// What the source is attached to, for offset math.
    enum Attached {
        Nothing,
        Buffer { frequency: u32 },
        Stream { frequency: u32 },
    }

    fn attached(h: &Handle) -> Attached {
        let state = h.ctx.state.borrow();
        let Some(record) = state.sources.get(&h.name) else {
            return Attached::Nothing;
        };
        if let Some(stream) = &record.stream {
            return Attached::Stream {
                frequency: stream.frequency,
            };
        }
        match record.buffer.as_ref().and_then(|b| state.buffers.get(b)) {
            Some(entry) => Attached::Buffer {
                frequency: entry.frequency,
            },
            None => Attached::Nothing,
        }
    }

    pub fn offset<S: AsSourceHandle + ?Sized>(source: &S) -> AlResult<u64> {
        let h = private_source::handle(source);
        check(h)?;
        let engine_offset = h.engine(|d, c, s| d.source_offset(c, s))?;
        match attached(h) {
            Attached::Stream { .. } => stream::offset(h, engine_offset),
            _ => Ok(engine_offset),
        }
    }

    pub fn set_offset<S: AsSourceHandle + ?Sized>(source: &S, frames: u64) -> AlResult<()> {
        let h = private_source::handle(source);
        check(h)?;
        match attached(h) {
            Attached::Nothing => Err(AlError::state("no buffer or stream is attached")),
            Attached::Stream { .. } => stream::seek(h, frames),
            Attached::Buffer { .. } => h
                .engine(|d, c, s| d.set_source_offset(c, s, frames))
                .map_err(|e| match e {
                    AlError::Engine(status) if status.0 == sys::AL_INVALID_VALUE => {
                        AlError::state(format!("offset {frames} is past the end of the buffer"))
                    }
                    other => other,
                }),
        }
    }

    pub fn offset_seconds<S: AsSourceHandle + ?Sized>(source: &S) -> AlResult<f64> {
        let frames = offset(source)?;
        let h = private_source::handle(source);
        Ok(match attached(h) {
            Attached::Buffer { frequency } | Attached::Stream { frequency } => {
                frames as f64 / frequency as f64
            }
            Attached::Nothing => 0.0,
        })
    }
}
