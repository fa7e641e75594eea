use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};

use parking_lot::{Mutex, MutexGuard};

use crate::{
    context::{is_distance_model, ContextParams, ContextState, EngineEvent, ListenerProp, ListenerProps},
    effect::{EffectState, SlotState},
    next_name,
    voice::{BufferData, Chunk, Fade, PlayState, SourceProp, SourceProps, Voice, VoiceData},
    *,
};

pub const DEFAULT_DEVICE_NAME: &str = "alkit Software";

const PLAYBACK_DEVICES: &[&str] = &[DEFAULT_DEVICE_NAME, "alkit Null Output"];
const CAPTURE_DEVICES: &[&str] = &["alkit Loopback Capture"];
const HRTF_NAMES: &[&str] = &["Built-In HRTF", "Built-In HRTF #2"];

pub const RESAMPLERS: &[&str] = &[
    "Nearest",
    "Linear",
    "Cubic Spline",
    "11th order Sinc",
    "23rd order Sinc",
];
pub const DEFAULT_RESAMPLER: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEnumeration {
    Basic,
    Full,
    Capture,
}

/// Lists device names. The first entry is the default device.
pub fn enumerate(kind: DeviceEnumeration) -> Vec<String> {
    match kind {
        DeviceEnumeration::Basic => PLAYBACK_DEVICES.iter().map(|s| s.to_string()).collect(),
        DeviceEnumeration::Full => PLAYBACK_DEVICES
            .iter()
            .map(|s| format!("{s} on Default Output"))
            .collect(),
        DeviceEnumeration::Capture => CAPTURE_DEVICES.iter().map(|s| s.to_string()).collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAttrs {
    pub frequency: u32,
    pub max_auxiliary_sends: u32,
}

impl Default for DeviceAttrs {
    fn default() -> Self {
        Self {
            frequency: 44100,
            max_auxiliary_sends: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub channels: u32,
    pub frequency: u32,
    pub frames: u64,
    pub loop_points: (u64, u64),
}

struct DeviceState {
    name: String,
    attrs: DeviceAttrs,
    connected: bool,
    paused: bool,
    closed: bool,
    clock_frames: u64,
    contexts: BTreeMap<ALuint, ContextState>,
}

/// An open engine device. Cloning yields another handle to the same device.
#[derive(Clone)]
pub struct SoftDevice {
    inner: Arc<Mutex<DeviceState>>,
}

impl std::fmt::Debug for SoftDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("SoftDevice")
            .field("name", &state.name)
            .field("contexts", &state.contexts.len())
            .finish()
    }
}

impl SoftDevice {
    /// Opens a playback device by name. `None` or an empty name selects the
    /// default device.
    pub fn open(name: Option<&str>, attrs: DeviceAttrs) -> Result<Self, ALenum> {
        let name = match name {
            None | Some("") => DEFAULT_DEVICE_NAME,
            Some(n) => PLAYBACK_DEVICES
                .iter()
                .copied()
                .find(|d| *d == n)
                .ok_or(ALC_INVALID_DEVICE)?,
        };
        if attrs.frequency == 0 {
            return Err(AL_INVALID_VALUE);
        }
        tracing::debug!(device = name, frequency = attrs.frequency, "engine device opened");
        Ok(Self {
            inner: Arc::new(Mutex::new(DeviceState {
                name: name.to_string(),
                attrs,
                connected: true,
                paused: false,
                closed: false,
                clock_frames: 0,
                contexts: BTreeMap::new(),
            })),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, DeviceState>, ALenum> {
        let state = self.inner.lock();
        if state.closed {
            return Err(ALC_INVALID_DEVICE);
        }
        Ok(state)
    }

    fn with_context<T>(
        &self,
        ctx: ALuint,
        f: impl FnOnce(&mut ContextState, &DeviceAttrs) -> Result<T, ALenum>,
    ) -> Result<T, ALenum> {
        let mut state = self.lock()?;
        let attrs = state.attrs;
        let context = state.contexts.get_mut(&ctx).ok_or(ALC_INVALID_CONTEXT)?;
        f(context, &attrs)
    }

    fn with_voice<T>(
        &self,
        ctx: ALuint,
        source: ALuint,
        f: impl FnOnce(&mut Voice) -> Result<T, ALenum>,
    ) -> Result<T, ALenum> {
        self.with_context(ctx, |context, _| {
            let voice = context.voices.get_mut(&source).ok_or(AL_INVALID_NAME)?;
            f(voice)
        })
    }

    /// Closes the device. Fails while contexts remain.
    pub fn close(&self) -> Result<(), ALenum> {
        let mut state = self.lock()?;
        if !state.contexts.is_empty() {
            return Err(AL_INVALID_OPERATION);
        }
        state.closed = true;
        tracing::debug!(device = %state.name, "engine device closed");
        Ok(())
    }

    pub fn name(&self) -> String {
        self.inner.lock().name.clone()
    }

    pub fn get_integer(&self, param: ALenum) -> Result<i32, ALenum> {
        let state = self.lock()?;
        match param {
            ALC_MAJOR_VERSION => Ok(1),
            ALC_MINOR_VERSION => Ok(1),
            ALC_EFX_MAJOR_VERSION => Ok(1),
            ALC_EFX_MINOR_VERSION => Ok(0),
            ALC_MAX_AUXILIARY_SENDS => Ok(state.attrs.max_auxiliary_sends as i32),
            ALC_FREQUENCY => Ok(state.attrs.frequency as i32),
            ALC_HRTF_SOFT => Ok(state.contexts.values().any(|c| c.hrtf) as i32),
            _ => Err(AL_INVALID_ENUM),
        }
    }

    pub fn hrtf_names(&self) -> Vec<String> {
        HRTF_NAMES.iter().map(|s| s.to_string()).collect()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().connected
    }

    /// Simulates losing the output device. Every voice stops and every
    /// context receives [`EngineEvent::Disconnected`].
    pub fn disconnect(&self) {
        let mut state = self.inner.lock();
        if !state.connected {
            return;
        }
        state.connected = false;
        for context in state.contexts.values_mut() {
            for voice in context.voices.values_mut() {
                voice.stop();
            }
            context.events.push_back(EngineEvent::Disconnected);
        }
        tracing::warn!(device = %state.name, "engine device disconnected");
    }

    pub fn pause_dsp(&self) -> Result<(), ALenum> {
        self.lock()?.paused = true;
        Ok(())
    }

    pub fn resume_dsp(&self) -> Result<(), ALenum> {
        self.lock()?.paused = false;
        Ok(())
    }

    /// Device clock in nanoseconds.
    pub fn clock_time(&self) -> u64 {
        let state = self.inner.lock();
        let nanos = state.clock_frames as u128 * 1_000_000_000 / state.attrs.frequency as u128;
        u64::try_from(nanos).unwrap_or(u64::MAX)
    }

    /// Pulls `frames` frames of interleaved stereo output. A paused or
    /// disconnected device renders silence and its clock does not advance.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames * 2];
        let mut state = self.inner.lock();
        if state.closed || state.paused || !state.connected {
            return out;
        }
        let frequency = state.attrs.frequency;
        for context in state.contexts.values_mut() {
            context.mix_into(&mut out, frequency);
        }
        state.clock_frames += frames as u64;
        out
    }

    // Contexts

    pub fn create_context(&self, hrtf: bool) -> Result<ALuint, ALenum> {
        let mut state = self.lock()?;
        let name = next_name();
        state.contexts.insert(name, ContextState::new(hrtf));
        Ok(name)
    }

    pub fn destroy_context(&self, ctx: ALuint) -> Result<(), ALenum> {
        let mut state = self.lock()?;
        state
            .contexts
            .remove(&ctx)
            .map(|_| ())
            .ok_or(ALC_INVALID_CONTEXT)
    }

    pub fn defer_updates(&self, ctx: ALuint) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            c.deferred = true;
            Ok(())
        })
    }

    pub fn process_updates(&self, ctx: ALuint) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            c.process_updates();
            Ok(())
        })
    }

    pub fn poll_events(&self, ctx: ALuint) -> Result<Vec<EngineEvent>, ALenum> {
        self.with_context(ctx, |c, _| Ok(c.events.drain(..).collect()))
    }

    pub fn context_params(&self, ctx: ALuint) -> Result<ContextParams, ALenum> {
        self.with_context(ctx, |c, _| Ok(c.params))
    }

    pub fn set_doppler_factor(&self, ctx: ALuint, factor: f32) -> Result<(), ALenum> {
        if factor.is_nan() || factor < 0.0 {
            return Err(AL_INVALID_VALUE);
        }
        self.with_context(ctx, |c, _| {
            c.params.doppler_factor = factor;
            Ok(())
        })
    }

    pub fn set_speed_of_sound(&self, ctx: ALuint, speed: f32) -> Result<(), ALenum> {
        if speed.is_nan() || speed <= 0.0 {
            return Err(AL_INVALID_VALUE);
        }
        self.with_context(ctx, |c, _| {
            c.params.speed_of_sound = speed;
            Ok(())
        })
    }

    pub fn set_distance_model(&self, ctx: ALuint, model: ALenum) -> Result<(), ALenum> {
        is_distance_model(model)?;
        self.with_context(ctx, |c, _| {
            c.params.distance_model = model;
            Ok(())
        })
    }

    pub fn set_listener(&self, ctx: ALuint, prop: ListenerProp) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            c.listener.pending.apply(prop)?;
            if !c.deferred {
                c.listener.commit();
            }
            Ok(())
        })
    }

    pub fn listener(&self, ctx: ALuint) -> Result<ListenerProps, ALenum> {
        self.with_context(ctx, |c, _| Ok(c.listener.pending))
    }

    // Buffers

    /// Creates a buffer holding interleaved `f32` samples.
    pub fn create_buffer(
        &self,
        ctx: ALuint,
        channels: u32,
        frequency: u32,
        samples: Vec<f32>,
    ) -> Result<ALuint, ALenum> {
        if channels == 0 || frequency == 0 || samples.len() % channels as usize != 0 {
            return Err(AL_INVALID_VALUE);
        }
        self.with_context(ctx, |c, _| {
            let name = next_name();
            c.buffers.insert(
                name,
                Arc::new(BufferData {
                    samples: samples.into(),
                    channels,
                    frequency,
                    loop_points: (0, 0),
                }),
            );
            Ok(name)
        })
    }

    pub fn delete_buffer(&self, ctx: ALuint, buffer: ALuint) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            if !c.buffers.contains_key(&buffer) {
                return Err(AL_INVALID_NAME);
            }
            if c.voices.values().any(|v| v.buffer() == Some(buffer)) {
                return Err(AL_INVALID_OPERATION);
            }
            c.buffers.remove(&buffer);
            Ok(())
        })
    }

    pub fn buffer_info(&self, ctx: ALuint, buffer: ALuint) -> Result<BufferInfo, ALenum> {
        self.with_context(ctx, |c, _| {
            let data = c.buffers.get(&buffer).ok_or(AL_INVALID_NAME)?;
            Ok(BufferInfo {
                channels: data.channels,
                frequency: data.frequency,
                frames: data.frames(),
                loop_points: if data.loop_points.1 > data.loop_points.0 {
                    data.loop_points
                } else {
                    (0, data.frames())
                },
            })
        })
    }

    pub fn set_buffer_loop_points(
        &self,
        ctx: ALuint,
        buffer: ALuint,
        start: u64,
        end: u64,
    ) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            if c.voices.values().any(|v| v.buffer() == Some(buffer)) {
                return Err(AL_INVALID_OPERATION);
            }
            let data = c.buffers.get_mut(&buffer).ok_or(AL_INVALID_NAME)?;
            if start >= end || end > data.frames() {
                return Err(AL_INVALID_VALUE);
            }
            let Some(data) = Arc::get_mut(data) else {
                return Err(AL_INVALID_OPERATION);
            };
            data.loop_points = (start, end);
            Ok(())
        })
    }

    // Sources

    pub fn create_source(&self, ctx: ALuint) -> Result<ALuint, ALenum> {
        self.with_context(ctx, |c, attrs| {
            let name = next_name();
            c.voices.insert(name, Voice::new(attrs.max_auxiliary_sends));
            Ok(name)
        })
    }

    pub fn delete_source(&self, ctx: ALuint, source: ALuint) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            c.voices.remove(&source).map(|_| ()).ok_or(AL_INVALID_NAME)
        })
    }

    pub fn set_source(&self, ctx: ALuint, source: ALuint, prop: SourceProp) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            let deferred = c.deferred;
            let voice = c.voices.get_mut(&source).ok_or(AL_INVALID_NAME)?;
            voice.props.pending.apply(prop)?;
            if !deferred {
                voice.props.commit();
            }
            Ok(())
        })
    }

    pub fn source_props(&self, ctx: ALuint, source: ALuint) -> Result<SourceProps, ALenum> {
        self.with_voice(ctx, source, |v| Ok(v.props.pending))
    }

    /// Attaches a buffer (or detaches with `None`). Attaching returns the
    /// voice to [`PlayState::Initial`]; detaching keeps a stopped voice
    /// stopped.
    pub fn set_source_buffer(
        &self,
        ctx: ALuint,
        source: ALuint,
        buffer: Option<ALuint>,
    ) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            let data = match buffer {
                Some(b) => Some((b, c.buffers.get(&b).cloned().ok_or(AL_INVALID_NAME)?)),
                None => None,
            };
            let voice = c.voices.get_mut(&source).ok_or(AL_INVALID_NAME)?;
            if matches!(voice.state, PlayState::Playing | PlayState::Paused) {
                return Err(AL_INVALID_OPERATION);
            }
            voice.data = match data {
                Some((buffer, data)) => {
                    voice.state = PlayState::Initial;
                    VoiceData::Static { buffer, data }
                }
                None => VoiceData::Empty,
            };
            voice.cursor = 0.0;
            Ok(())
        })
    }

    /// Appends a chunk of interleaved samples to the voice's stream queue.
    pub fn queue_source_chunk(
        &self,
        ctx: ALuint,
        source: ALuint,
        channels: u32,
        frequency: u32,
        samples: Vec<f32>,
    ) -> Result<(), ALenum> {
        if channels == 0 || frequency == 0 || samples.len() % channels as usize != 0 {
            return Err(AL_INVALID_VALUE);
        }
        self.with_voice(ctx, source, |v| {
            if !matches!(v.data, VoiceData::Queue { .. }) {
                if v.buffer().is_some() {
                    return Err(AL_INVALID_OPERATION);
                }
                v.data = VoiceData::Queue {
                    chunks: VecDeque::new(),
                    processed: 0,
                    base: 0,
                };
            }
            if let VoiceData::Queue { chunks, .. } = &mut v.data {
                chunks.push_back(Chunk {
                    samples,
                    channels,
                    frequency,
                });
            }
            Ok(())
        })
    }

    /// Returns how many queued chunks finished playing since the last call,
    /// and how many are still queued.
    pub fn unqueue_processed(&self, ctx: ALuint, source: ALuint) -> Result<(usize, usize), ALenum> {
        self.with_voice(ctx, source, |v| match &mut v.data {
            VoiceData::Queue {
                chunks, processed, ..
            } => Ok((std::mem::take(processed), chunks.len())),
            _ => Ok((0, 0)),
        })
    }

    /// Drops every queued chunk and detaches the queue.
    pub fn clear_source_queue(&self, ctx: ALuint, source: ALuint) -> Result<(), ALenum> {
        self.with_voice(ctx, source, |v| {
            if matches!(v.data, VoiceData::Queue { .. }) {
                v.data = VoiceData::Empty;
                v.cursor = 0.0;
            }
            Ok(())
        })
    }

    pub fn play_source(&self, ctx: ALuint, source: ALuint) -> Result<(), ALenum> {
        self.with_voice(ctx, source, |v| v.play())
    }

    pub fn pause_source(&self, ctx: ALuint, source: ALuint) -> Result<(), ALenum> {
        self.with_voice(ctx, source, |v| {
            v.pause();
            Ok(())
        })
    }

    pub fn resume_source(&self, ctx: ALuint, source: ALuint) -> Result<(), ALenum> {
        self.with_voice(ctx, source, |v| {
            v.resume();
            Ok(())
        })
    }

    pub fn stop_source(&self, ctx: ALuint, source: ALuint) -> Result<(), ALenum> {
        self.with_voice(ctx, source, |v| {
            v.stop();
            Ok(())
        })
    }

    pub fn source_state(&self, ctx: ALuint, source: ALuint) -> Result<PlayState, ALenum> {
        self.with_voice(ctx, source, |v| Ok(v.state))
    }

    pub fn source_offset(&self, ctx: ALuint, source: ALuint) -> Result<u64, ALenum> {
        self.with_voice(ctx, source, |v| Ok(v.offset()))
    }

    pub fn set_source_offset(&self, ctx: ALuint, source: ALuint, frames: u64) -> Result<(), ALenum> {
        self.with_voice(ctx, source, |v| v.set_offset(frames))
    }

    /// Output latency of a source in nanoseconds.
    pub fn source_latency(&self, ctx: ALuint, source: ALuint) -> Result<u64, ALenum> {
        let frequency = self.lock()?.attrs.frequency as u64;
        self.with_voice(ctx, source, |v| {
            Ok(if v.state == PlayState::Playing {
                DEVICE_PERIOD_FRAMES * 1_000_000_000 / frequency
            } else {
                0
            })
        })
    }

    /// Ramps an extra gain multiplier linearly from 1 to `target_gain` over
    /// `frames` output frames, then stops the voice.
    pub fn fade_source(
        &self,
        ctx: ALuint,
        source: ALuint,
        target_gain: f32,
        frames: u64,
    ) -> Result<(), ALenum> {
        if target_gain.is_nan() || target_gain < 0.0 {
            return Err(AL_INVALID_VALUE);
        }
        self.with_context(ctx, |c, _| {
            let voice = c.voices.get_mut(&source).ok_or(AL_INVALID_NAME)?;
            if voice.state != PlayState::Playing {
                return Err(AL_INVALID_OPERATION);
            }
            if frames == 0 {
                voice.stop();
                c.events.push_back(EngineEvent::SourceStopped(source));
                return Ok(());
            }
            voice.fade = Some(Fade {
                start_gain: 1.0,
                target_gain,
                total: frames,
                remaining: frames,
            });
            Ok(())
        })
    }

    pub fn set_source_send_slot(
        &self,
        ctx: ALuint,
        source: ALuint,
        index: u32,
        slot: Option<ALuint>,
    ) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            if let Some(slot) = slot {
                if !c.slots.contains_key(&slot) {
                    return Err(AL_INVALID_NAME);
                }
            }
            let voice = c.voices.get_mut(&source).ok_or(AL_INVALID_NAME)?;
            let send = voice
                .sends
                .get_mut(index as usize)
                .ok_or(AL_INVALID_VALUE)?;
            send.slot = slot;
            Ok(())
        })
    }

    pub fn set_source_send_filter(
        &self,
        ctx: ALuint,
        source: ALuint,
        index: u32,
        filter: [f32; 3],
    ) -> Result<(), ALenum> {
        self.with_voice(ctx, source, |v| {
            let send = v.sends.get_mut(index as usize).ok_or(AL_INVALID_VALUE)?;
            send.filter = filter;
            Ok(())
        })
    }

    /// Slot and filter of one auxiliary send.
    pub fn source_send(
        &self,
        ctx: ALuint,
        source: ALuint,
        index: u32,
    ) -> Result<(Option<ALuint>, [f32; 3]), ALenum> {
        self.with_voice(ctx, source, |v| {
            let send = v.sends.get(index as usize).ok_or(AL_INVALID_VALUE)?;
            Ok((send.slot, send.filter))
        })
    }

    // Effects

    pub fn create_effect(&self, ctx: ALuint) -> Result<ALuint, ALenum> {
        self.with_context(ctx, |c, _| {
            let name = next_name();
            c.effects.insert(name, EffectState::default());
            Ok(name)
        })
    }

    pub fn delete_effect(&self, ctx: ALuint, effect: ALuint) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            c.effects.remove(&effect).map(|_| ()).ok_or(AL_INVALID_NAME)
        })
    }

    pub fn set_effect_type(&self, ctx: ALuint, effect: ALuint, kind: ALenum) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            c.effects
                .get_mut(&effect)
                .ok_or(AL_INVALID_NAME)?
                .set_kind(kind)
        })
    }

    pub fn set_effect_param(
        &self,
        ctx: ALuint,
        effect: ALuint,
        param: ALenum,
        value: [f32; 3],
    ) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            c.effects
                .get_mut(&effect)
                .ok_or(AL_INVALID_NAME)?
                .set(param, value)
        })
    }

    pub fn effect_param(&self, ctx: ALuint, effect: ALuint, param: ALenum) -> Result<[f32; 3], ALenum> {
        self.with_context(ctx, |c, _| {
            c.effects.get(&effect).ok_or(AL_INVALID_NAME)?.get(param)
        })
    }

    pub fn effect_type(&self, ctx: ALuint, effect: ALuint) -> Result<ALenum, ALenum> {
        self.with_context(ctx, |c, _| Ok(c.effects.get(&effect).ok_or(AL_INVALID_NAME)?.kind))
    }

    // Auxiliary effect slots

    pub fn create_slot(&self, ctx: ALuint) -> Result<ALuint, ALenum> {
        self.with_context(ctx, |c, _| {
            let name = next_name();
            c.slots.insert(name, SlotState::default());
            Ok(name)
        })
    }

    /// Fails while any voice still sends to the slot.
    pub fn delete_slot(&self, ctx: ALuint, slot: ALuint) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            if !c.slots.contains_key(&slot) {
                return Err(AL_INVALID_NAME);
            }
            let in_use = c
                .voices
                .values()
                .any(|v| v.sends.iter().any(|s| s.slot == Some(slot)));
            if in_use {
                return Err(AL_INVALID_OPERATION);
            }
            c.slots.remove(&slot);
            Ok(())
        })
    }

    /// Copies the effect's current parameters into the slot. `None` loads the
    /// null effect.
    pub fn set_slot_effect(
        &self,
        ctx: ALuint,
        slot: ALuint,
        effect: Option<ALuint>,
    ) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            let snapshot = match effect {
                Some(e) => c.effects.get(&e).cloned().ok_or(AL_INVALID_NAME)?,
                None => EffectState::default(),
            };
            c.slots.get_mut(&slot).ok_or(AL_INVALID_NAME)?.effect = snapshot;
            Ok(())
        })
    }

    pub fn set_slot_gain(&self, ctx: ALuint, slot: ALuint, gain: f32) -> Result<(), ALenum> {
        if !(0.0..=1.0).contains(&gain) {
            return Err(AL_INVALID_VALUE);
        }
        self.with_context(ctx, |c, _| {
            c.slots.get_mut(&slot).ok_or(AL_INVALID_NAME)?.gain = gain;
            Ok(())
        })
    }

    pub fn set_slot_send_auto(&self, ctx: ALuint, slot: ALuint, send_auto: bool) -> Result<(), ALenum> {
        self.with_context(ctx, |c, _| {
            c.slots.get_mut(&slot).ok_or(AL_INVALID_NAME)?.send_auto = send_auto;
            Ok(())
        })
    }

    /// Gain, auto-send flag and loaded effect type of a slot.
    pub fn slot_info(&self, ctx: ALuint, slot: ALuint) -> Result<(f32, bool, ALenum), ALenum> {
        self.with_context(ctx, |c, _| {
            let s = c.slots.get(&slot).ok_or(AL_INVALID_NAME)?;
            Ok((s.gain, s.send_auto, s.effect.kind))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn open_with_context() -> (SoftDevice, ALuint) {
        let device = SoftDevice::open(None, DeviceAttrs::default()).unwrap();
        let ctx = device.create_context(false).unwrap();
        (device, ctx)
    }

    #[test]
    fn test_device_open_default_and_unknown() {
        let device = SoftDevice::open(Some(""), DeviceAttrs::default()).unwrap();
        assert_eq!(device.name(), DEFAULT_DEVICE_NAME);
        let err = SoftDevice::open(Some("no such device"), DeviceAttrs::default()).unwrap_err();
        assert_eq!(err, ALC_INVALID_DEVICE);
    }

    #[test]
    fn test_device_enumerate_default_first() {
        let basic = enumerate(DeviceEnumeration::Basic);
        assert_eq!(basic[0], DEFAULT_DEVICE_NAME);
        let full = enumerate(DeviceEnumeration::Full);
        assert!(full[0].starts_with(DEFAULT_DEVICE_NAME));
        assert!(!enumerate(DeviceEnumeration::Capture).is_empty());
    }

    #[test]
    fn test_device_close_requires_no_contexts() {
        let (device, ctx) = open_with_context();
        assert_eq!(device.close(), Err(AL_INVALID_OPERATION));
        device.destroy_context(ctx).unwrap();
        device.close().unwrap();
        assert_eq!(device.create_context(false), Err(ALC_INVALID_DEVICE));
    }

    #[test]
    fn test_device_caps() {
        let device = SoftDevice::open(
            None,
            DeviceAttrs {
                frequency: 48000,
                max_auxiliary_sends: 2,
            },
        )
        .unwrap();
        assert_eq!(device.get_integer(ALC_MAJOR_VERSION), Ok(1));
        assert_eq!(device.get_integer(ALC_MINOR_VERSION), Ok(1));
        assert_eq!(device.get_integer(ALC_MAX_AUXILIARY_SENDS), Ok(2));
        assert_eq!(device.get_integer(ALC_FREQUENCY), Ok(48000));
        assert_eq!(device.get_integer(0x4242), Err(AL_INVALID_ENUM));
    }

    #[test]
    fn test_render_stops_voice_and_queues_event() {
        let (device, ctx) = open_with_context();
        let buffer = device.create_buffer(ctx, 1, 44100, vec![0.5; 64]).unwrap();
        let source = device.create_source(ctx).unwrap();
        device.set_source_buffer(ctx, source, Some(buffer)).unwrap();
        device.play_source(ctx, source).unwrap();

        let out = device.render(32);
        assert_eq!(out.len(), 64);
        assert_eq!(device.source_state(ctx, source), Ok(PlayState::Playing));
        assert_eq!(device.source_offset(ctx, source), Ok(32));

        device.render(64);
        assert_eq!(device.source_state(ctx, source), Ok(PlayState::Stopped));
        assert_eq!(
            device.poll_events(ctx).unwrap(),
            vec![EngineEvent::SourceStopped(source)]
        );
        assert!(device.poll_events(ctx).unwrap().is_empty());
    }

    #[test]
    fn test_paused_dsp_freezes_clock() {
        let (device, _ctx) = open_with_context();
        device.render(44100);
        assert_eq!(device.clock_time(), 1_000_000_000);
        device.pause_dsp().unwrap();
        device.render(44100);
        assert_eq!(device.clock_time(), 1_000_000_000);
        device.resume_dsp().unwrap();
        device.render(441);
        assert_eq!(device.clock_time(), 1_010_000_000);
    }

    #[test]
    fn test_clock_survives_long_runtimes() {
        let (device, _ctx) = open_with_context();
        let frequency = device.get_integer(ALC_FREQUENCY).unwrap() as u64;
        let year = frequency * 60 * 60 * 24 * 365;
        device.inner.lock().clock_frames = 100 * year;
        assert_eq!(device.clock_time(), 100 * 365 * 24 * 3600 * 1_000_000_000);
        device.inner.lock().clock_frames = u64::MAX;
        assert_eq!(device.clock_time(), u64::MAX);
    }

    #[test]
    fn test_detach_keeps_stopped_state() {
        let (device, ctx) = open_with_context();
        let buffer = device.create_buffer(ctx, 1, 44100, vec![0.5; 64]).unwrap();
        let source = device.create_source(ctx).unwrap();
        device.set_source_buffer(ctx, source, Some(buffer)).unwrap();
        assert_eq!(device.source_state(ctx, source), Ok(PlayState::Initial));
        device.play_source(ctx, source).unwrap();
        device.stop_source(ctx, source).unwrap();

        device.set_source_buffer(ctx, source, None).unwrap();
        assert_eq!(device.source_state(ctx, source), Ok(PlayState::Stopped));
        device.set_source_buffer(ctx, source, Some(buffer)).unwrap();
        assert_eq!(device.source_state(ctx, source), Ok(PlayState::Initial));
    }

    #[test]
    fn test_deferred_updates_hold_applied_props() {
        let (device, ctx) = open_with_context();
        let source = device.create_source(ctx).unwrap();
        device.defer_updates(ctx).unwrap();
        device.set_source(ctx, source, SourceProp::Gain(0.25)).unwrap();
        assert_eq!(device.source_props(ctx, source).unwrap().gain, 0.25);

        let buffer = device.create_buffer(ctx, 1, 44100, vec![1.0; 16]).unwrap();
        device.set_source_buffer(ctx, source, Some(buffer)).unwrap();
        device.play_source(ctx, source).unwrap();
        assert_eq!(device.render(1)[0], 1.0);

        device.process_updates(ctx).unwrap();
        assert_eq!(device.render(1)[0], 0.25);
    }

    #[test]
    fn test_buffer_in_use_cannot_be_deleted() {
        let (device, ctx) = open_with_context();
        let buffer = device.create_buffer(ctx, 2, 44100, vec![0.0; 8]).unwrap();
        let source = device.create_source(ctx).unwrap();
        device.set_source_buffer(ctx, source, Some(buffer)).unwrap();
        assert_eq!(device.delete_buffer(ctx, buffer), Err(AL_INVALID_OPERATION));
        assert_eq!(
            device.set_buffer_loop_points(ctx, buffer, 0, 2),
            Err(AL_INVALID_OPERATION)
        );
        device.set_source_buffer(ctx, source, None).unwrap();
        device.set_buffer_loop_points(ctx, buffer, 1, 3).unwrap();
        assert_eq!(device.buffer_info(ctx, buffer).unwrap().loop_points, (1, 3));
        assert_eq!(
            device.set_buffer_loop_points(ctx, buffer, 2, 5),
            Err(AL_INVALID_VALUE)
        );
        device.delete_buffer(ctx, buffer).unwrap();
    }

    #[test]
    fn test_send_index_out_of_range() {
        let (device, ctx) = open_with_context();
        let source = device.create_source(ctx).unwrap();
        let slot = device.create_slot(ctx).unwrap();
        device.set_source_send_slot(ctx, source, 3, Some(slot)).unwrap();
        assert_eq!(
            device.set_source_send_slot(ctx, source, 4, Some(slot)),
            Err(AL_INVALID_VALUE)
        );
        assert_eq!(device.delete_slot(ctx, slot), Err(AL_INVALID_OPERATION));
        device.set_source_send_slot(ctx, source, 3, None).unwrap();
        device.delete_slot(ctx, slot).unwrap();
    }

    #[test]
    fn test_stream_queue_processed() {
        let (device, ctx) = open_with_context();
        let source = device.create_source(ctx).unwrap();
        for _ in 0..3 {
            device
                .queue_source_chunk(ctx, source, 1, 44100, vec![0.1; 10])
                .unwrap();
        }
        device.play_source(ctx, source).unwrap();
        device.render(25);
        assert_eq!(device.unqueue_processed(ctx, source), Ok((2, 1)));
        assert_eq!(device.source_offset(ctx, source), Ok(25));
        device.render(10);
        assert_eq!(device.source_state(ctx, source), Ok(PlayState::Stopped));
    }

    #[test]
    fn test_disconnect_stops_everything() {
        let (device, ctx) = open_with_context();
        let buffer = device.create_buffer(ctx, 1, 44100, vec![0.0; 100]).unwrap();
        let source = device.create_source(ctx).unwrap();
        device.set_source_buffer(ctx, source, Some(buffer)).unwrap();
        device.play_source(ctx, source).unwrap();
        device.disconnect();
        assert!(!device.is_connected());
        assert_eq!(device.source_state(ctx, source), Ok(PlayState::Stopped));
        assert_eq!(device.poll_events(ctx).unwrap(), vec![EngineEvent::Disconnected]);
    }
}
