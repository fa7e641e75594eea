use std::collections::{BTreeMap, VecDeque};

use crate::{
    effect::{EffectState, SlotState},
    voice::{BufferData, Deferred, Voice},
    ALenum, ALuint, AL_EXPONENT_DISTANCE, AL_EXPONENT_DISTANCE_CLAMPED, AL_INVALID_ENUM,
    AL_INVALID_VALUE, AL_INVERSE_DISTANCE, AL_INVERSE_DISTANCE_CLAMPED, AL_LINEAR_DISTANCE,
    AL_LINEAR_DISTANCE_CLAMPED, AL_NONE,
};

use std::sync::Arc;

/// Notifications queued by the engine until the owning context polls them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A source reached the end of its data or finished a fade.
    SourceStopped(ALuint),
    /// The device was lost.
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListenerProps {
    pub gain: f32,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub orientation: ([f32; 3], [f32; 3]),
    pub meters_per_unit: f32,
}

impl Default for ListenerProps {
    fn default() -> Self {
        Self {
            gain: 1.0,
            position: [0.0; 3],
            velocity: [0.0; 3],
            orientation: ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            meters_per_unit: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListenerProp {
    Gain(f32),
    Position([f32; 3]),
    Velocity([f32; 3]),
    Orientation([f32; 3], [f32; 3]),
    MetersPerUnit(f32),
}

impl ListenerProps {
    pub(crate) fn apply(&mut self, prop: ListenerProp) -> Result<(), ALenum> {
        let finite = |v: &[f32]| v.iter().all(|x| !x.is_nan());
        match prop {
            ListenerProp::Gain(v) if finite(&[v]) => self.gain = v,
            ListenerProp::Position(v) if finite(&v) => self.position = v,
            ListenerProp::Velocity(v) if finite(&v) => self.velocity = v,
            ListenerProp::Orientation(at, up) if finite(&at) && finite(&up) => {
                self.orientation = (at, up)
            }
            ListenerProp::MetersPerUnit(v) if finite(&[v]) => self.meters_per_unit = v,
            _ => return Err(AL_INVALID_VALUE),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextParams {
    pub doppler_factor: f32,
    pub speed_of_sound: f32,
    pub distance_model: ALenum,
}

impl Default for ContextParams {
    fn default() -> Self {
        Self {
            doppler_factor: 1.0,
            speed_of_sound: 343.3,
            distance_model: AL_INVERSE_DISTANCE_CLAMPED,
        }
    }
}

pub(crate) fn is_distance_model(model: ALenum) -> Result<(), ALenum> {
    match model {
        AL_NONE
        | AL_INVERSE_DISTANCE
        | AL_INVERSE_DISTANCE_CLAMPED
        | AL_LINEAR_DISTANCE
        | AL_LINEAR_DISTANCE_CLAMPED
        | AL_EXPONENT_DISTANCE
        | AL_EXPONENT_DISTANCE_CLAMPED => Ok(()),
        _ => Err(AL_INVALID_ENUM),
    }
}

pub(crate) struct ContextState {
    pub listener: Deferred<ListenerProps>,
    pub params: ContextParams,
    pub deferred: bool,
    pub hrtf: bool,
    pub voices: BTreeMap<ALuint, Voice>,
    pub buffers: BTreeMap<ALuint, Arc<BufferData>>,
    pub effects: BTreeMap<ALuint, EffectState>,
    pub slots: BTreeMap<ALuint, SlotState>,
    pub events: VecDeque<EngineEvent>,
}

impl ContextState {
    pub fn new(hrtf: bool) -> Self {
        Self {
            listener: Deferred::new(ListenerProps::default()),
            params: ContextParams::default(),
            deferred: false,
            hrtf,
            voices: BTreeMap::new(),
            buffers: BTreeMap::new(),
            effects: BTreeMap::new(),
            slots: BTreeMap::new(),
            events: VecDeque::new(),
        }
    }

    /// Applies every pending listener and voice change.
    pub fn process_updates(&mut self) {
        self.deferred = false;
        self.listener.commit();
        for voice in self.voices.values_mut() {
            voice.props.commit();
        }
    }

    pub fn mix_into(&mut self, out: &mut [f32], device_frequency: u32) {
        let listener_gain = self.listener.applied.gain;
        for (name, voice) in self.voices.iter_mut() {
            if voice.mix_into(out, device_frequency, listener_gain) {
                self.events.push_back(EngineEvent::SourceStopped(*name));
            }
        }
    }
}
