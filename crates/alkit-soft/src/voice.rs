use std::{collections::VecDeque, sync::Arc};

use crate::{ALenum, ALuint, AL_AUTO_SOFT, AL_INVALID_OPERATION, AL_INVALID_VALUE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Initial,
    Playing,
    Paused,
    Stopped,
}

/// Every parameter a voice carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceProps {
    pub pitch: f32,
    pub gain: f32,
    pub gain_range: (f32, f32),
    pub distance_range: (f32, f32),
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub orientation: ([f32; 3], [f32; 3]),
    pub cone_angles: (f32, f32),
    pub outer_cone_gains: (f32, f32),
    pub rolloff_factors: (f32, f32),
    pub doppler_factor: f32,
    pub relative: bool,
    pub radius: f32,
    pub stereo_angles: (f32, f32),
    pub spatialize: ALenum,
    pub resampler: i32,
    pub air_absorption: f32,
    pub gain_auto: (bool, bool, bool),
    pub looping: bool,
    pub direct_filter: [f32; 3],
    pub group_gain: f32,
    pub group_pitch: f32,
}

impl Default for SourceProps {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            gain: 1.0,
            gain_range: (0.0, 1.0),
            distance_range: (1.0, f32::MAX),
            position: [0.0; 3],
            velocity: [0.0; 3],
            orientation: ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            cone_angles: (360.0, 360.0),
            outer_cone_gains: (0.0, 1.0),
            rolloff_factors: (1.0, 0.0),
            doppler_factor: 1.0,
            relative: false,
            radius: 0.0,
            stereo_angles: (std::f32::consts::FRAC_PI_6, -std::f32::consts::FRAC_PI_6),
            spatialize: AL_AUTO_SOFT,
            resampler: crate::device::DEFAULT_RESAMPLER,
            air_absorption: 0.0,
            gain_auto: (true, true, true),
            looping: false,
            direct_filter: [1.0; 3],
            group_gain: 1.0,
            group_pitch: 1.0,
        }
    }
}

/// A single parameter update for a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceProp {
    Pitch(f32),
    Gain(f32),
    GainRange(f32, f32),
    DistanceRange(f32, f32),
    Position([f32; 3]),
    Velocity([f32; 3]),
    Orientation([f32; 3], [f32; 3]),
    ConeAngles(f32, f32),
    OuterConeGains(f32, f32),
    RolloffFactors(f32, f32),
    DopplerFactor(f32),
    Relative(bool),
    Radius(f32),
    StereoAngles(f32, f32),
    Spatialize(ALenum),
    Resampler(i32),
    AirAbsorption(f32),
    GainAuto(bool, bool, bool),
    Looping(bool),
    DirectFilter([f32; 3]),
    GroupGain(f32),
    GroupPitch(f32),
}

fn no_nan(values: &[f32]) -> Result<(), ALenum> {
    if values.iter().any(|v| v.is_nan()) {
        Err(AL_INVALID_VALUE)
    } else {
        Ok(())
    }
}

impl SourceProps {
    pub(crate) fn apply(&mut self, prop: SourceProp) -> Result<(), ALenum> {
        match prop {
            SourceProp::Pitch(v) => {
                no_nan(&[v])?;
                self.pitch = v
            }
            SourceProp::Gain(v) => {
                no_nan(&[v])?;
                self.gain = v
            }
            SourceProp::GainRange(lo, hi) => {
                no_nan(&[lo, hi])?;
                self.gain_range = (lo, hi)
            }
            SourceProp::DistanceRange(lo, hi) => {
                no_nan(&[lo, hi])?;
                self.distance_range = (lo, hi)
            }
            SourceProp::Position(v) => {
                no_nan(&v)?;
                self.position = v
            }
            SourceProp::Velocity(v) => {
                no_nan(&v)?;
                self.velocity = v
            }
            SourceProp::Orientation(at, up) => {
                no_nan(&at)?;
                no_nan(&up)?;
                self.orientation = (at, up)
            }
            SourceProp::ConeAngles(inner, outer) => {
                no_nan(&[inner, outer])?;
                self.cone_angles = (inner, outer)
            }
            SourceProp::OuterConeGains(gain, gain_hf) => {
                no_nan(&[gain, gain_hf])?;
                self.outer_cone_gains = (gain, gain_hf)
            }
            SourceProp::RolloffFactors(factor, room) => {
                no_nan(&[factor, room])?;
                self.rolloff_factors = (factor, room)
            }
            SourceProp::DopplerFactor(v) => {
                no_nan(&[v])?;
                self.doppler_factor = v
            }
            SourceProp::Relative(v) => self.relative = v,
            SourceProp::Radius(v) => {
                no_nan(&[v])?;
                self.radius = v
            }
            SourceProp::StereoAngles(left, right) => {
                no_nan(&[left, right])?;
                self.stereo_angles = (left, right)
            }
            SourceProp::Spatialize(v) => self.spatialize = v,
            SourceProp::Resampler(v) => {
                if v < 0 || v as usize >= crate::RESAMPLERS.len() {
                    return Err(AL_INVALID_VALUE);
                }
                self.resampler = v
            }
            SourceProp::AirAbsorption(v) => {
                no_nan(&[v])?;
                self.air_absorption = v
            }
            SourceProp::GainAuto(direct, send, send_hf) => self.gain_auto = (direct, send, send_hf),
            SourceProp::Looping(v) => self.looping = v,
            SourceProp::DirectFilter(v) => {
                no_nan(&v)?;
                self.direct_filter = v
            }
            SourceProp::GroupGain(v) => {
                no_nan(&[v])?;
                self.group_gain = v
            }
            SourceProp::GroupPitch(v) => {
                no_nan(&[v])?;
                self.group_pitch = v
            }
        }
        Ok(())
    }
}

/// A value with a pending copy written by the API and an applied copy read by
/// the renderer. The two differ only while updates are deferred.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deferred<T: Copy> {
    pub pending: T,
    pub applied: T,
}

impl<T: Copy> Deferred<T> {
    pub fn new(value: T) -> Self {
        Self {
            pending: value,
            applied: value,
        }
    }

    pub fn commit(&mut self) {
        self.applied = self.pending;
    }
}

pub(crate) struct BufferData {
    pub samples: Arc<[f32]>,
    pub channels: u32,
    pub frequency: u32,
    pub loop_points: (u64, u64),
}

impl BufferData {
    pub fn frames(&self) -> u64 {
        self.samples.len() as u64 / self.channels as u64
    }
}

pub(crate) struct Chunk {
    pub samples: Vec<f32>,
    pub channels: u32,
    pub frequency: u32,
}

impl Chunk {
    fn frames(&self) -> u64 {
        self.samples.len() as u64 / self.channels.max(1) as u64
    }
}

pub(crate) enum VoiceData {
    Empty,
    Static {
        buffer: ALuint,
        data: Arc<BufferData>,
    },
    Queue {
        chunks: VecDeque<Chunk>,
        processed: usize,
        base: u64,
    },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Fade {
    pub start_gain: f32,
    pub target_gain: f32,
    pub total: u64,
    pub remaining: u64,
}

impl Fade {
    fn current(&self) -> f32 {
        if self.total == 0 {
            return self.target_gain;
        }
        let t = 1.0 - self.remaining as f32 / self.total as f32;
        self.start_gain + (self.target_gain - self.start_gain) * t
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SendState {
    pub slot: Option<ALuint>,
    pub filter: [f32; 3],
}

pub(crate) struct Voice {
    pub props: Deferred<SourceProps>,
    pub state: PlayState,
    pub data: VoiceData,
    pub cursor: f64,
    pub fade: Option<Fade>,
    pub sends: Vec<SendState>,
}

impl Voice {
    pub fn new(max_sends: u32) -> Self {
        Self {
            props: Deferred::new(SourceProps::default()),
            state: PlayState::Initial,
            data: VoiceData::Empty,
            cursor: 0.0,
            fade: None,
            sends: vec![
                SendState {
                    slot: None,
                    filter: [1.0; 3],
                };
                max_sends as usize
            ],
        }
    }

    pub fn buffer(&self) -> Option<ALuint> {
        match &self.data {
            VoiceData::Static { buffer, .. } => Some(*buffer),
            _ => None,
        }
    }

    pub fn has_data(&self) -> bool {
        match &self.data {
            VoiceData::Empty => false,
            VoiceData::Static { .. } => true,
            VoiceData::Queue { chunks, .. } => !chunks.is_empty(),
        }
    }

    pub fn play(&mut self) -> Result<(), ALenum> {
        if !self.has_data() {
            return Err(AL_INVALID_OPERATION);
        }
        // Initial and stopped voices keep an offset set before playing.
        if matches!(self.state, PlayState::Playing | PlayState::Paused) {
            self.cursor = 0.0;
        }
        self.fade = None;
        self.state = PlayState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlayState::Paused {
            self.state = PlayState::Playing;
        }
    }

    pub fn stop(&mut self) {
        self.state = PlayState::Stopped;
        self.cursor = 0.0;
        self.fade = None;
    }

    /// Frames played from the start of the attached data.
    pub fn offset(&self) -> u64 {
        match &self.data {
            VoiceData::Queue { base, .. } => base + self.cursor as u64,
            _ => self.cursor as u64,
        }
    }

    pub fn set_offset(&mut self, frames: u64) -> Result<(), ALenum> {
        match &self.data {
            VoiceData::Static { data, .. } if frames < data.frames() => {
                self.cursor = frames as f64;
                Ok(())
            }
            VoiceData::Static { .. } => Err(AL_INVALID_VALUE),
            _ => Err(AL_INVALID_OPERATION),
        }
    }

    fn frame_at(samples: &[f32], channels: u32, index: u64) -> (f32, f32) {
        let ch = channels.max(1) as usize;
        let start = index as usize * ch;
        let frame = &samples[start..start + ch];
        match ch {
            1 => (frame[0], frame[0]),
            2 => (frame[0], frame[1]),
            _ => {
                let avg = frame.iter().sum::<f32>() / ch as f32;
                (avg, avg)
            }
        }
    }

    fn gain(&self, listener_gain: f32) -> f32 {
        let props = &self.props.applied;
        let (lo, hi) = props.gain_range;
        let base = (props.gain * props.group_gain).clamp(lo.min(hi), hi.max(lo));
        let fade = self.fade.map_or(1.0, |f| f.current());
        base * fade * listener_gain * props.direct_filter[0]
    }

    /// Mixes this voice into interleaved stereo `out`. Returns `true` when the
    /// voice ran out of data or finished a fade during this call.
    pub fn mix_into(&mut self, out: &mut [f32], device_frequency: u32, listener_gain: f32) -> bool {
        if self.state != PlayState::Playing {
            return false;
        }
        let pitch = self.props.applied.pitch * self.props.applied.group_pitch;
        let looping = self.props.applied.looping;

        for frame in out.chunks_exact_mut(2) {
            let gain = self.gain(listener_gain);
            let sample = match &mut self.data {
                VoiceData::Empty => None,
                VoiceData::Static { data, .. } => {
                    let frames = data.frames();
                    let (loop_start, loop_end) = if data.loop_points.1 > data.loop_points.0 {
                        data.loop_points
                    } else {
                        (0, frames)
                    };
                    let end = if looping { loop_end } else { frames };
                    let mut at_end = false;
                    if self.cursor as u64 >= end {
                        if looping && loop_end > loop_start {
                            let span = (loop_end - loop_start) as f64;
                            self.cursor =
                                loop_start as f64 + (self.cursor - loop_end as f64) % span;
                        } else {
                            at_end = true;
                        }
                    }
                    if at_end {
                        None
                    } else {
                        let (l, r) =
                            Self::frame_at(&data.samples, data.channels, self.cursor as u64);
                        Some((l, r, data.frequency))
                    }
                }
                VoiceData::Queue {
                    chunks,
                    processed,
                    base,
                } => {
                    while let Some(front) = chunks.front() {
                        if (self.cursor as u64) < front.frames() {
                            break;
                        }
                        self.cursor -= front.frames() as f64;
                        *base += front.frames();
                        *processed += 1;
                        chunks.pop_front();
                    }
                    chunks.front().map(|front| {
                        let (l, r) =
                            Self::frame_at(&front.samples, front.channels, self.cursor as u64);
                        (l, r, front.frequency)
                    })
                }
            };
            let Some((left, right, frequency)) = sample else {
                self.stop();
                return true;
            };
            frame[0] += left * gain;
            frame[1] += right * gain;
            self.cursor += pitch as f64 * frequency as f64 / device_frequency as f64;

            let faded_out = match self.fade.as_mut() {
                Some(fade) => {
                    fade.remaining = fade.remaining.saturating_sub(1);
                    fade.remaining == 0
                }
                None => false,
            };
            if faded_out {
                self.stop();
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn static_voice(samples: Vec<f32>, channels: u32) -> Voice {
        let mut voice = Voice::new(2);
        voice.data = VoiceData::Static {
            buffer: 1,
            data: Arc::new(BufferData {
                samples: samples.into(),
                channels,
                frequency: 100,
                loop_points: (0, 0),
            }),
        };
        voice
    }

    #[test]
    fn test_voice_play_requires_data() {
        let mut voice = Voice::new(1);
        assert_eq!(voice.play(), Err(AL_INVALID_OPERATION));
    }

    #[test]
    fn test_voice_runs_out_and_stops() {
        let mut voice = static_voice(vec![0.5; 4], 1);
        voice.play().unwrap();
        let mut out = vec![0.0; 2 * 8];
        assert!(voice.mix_into(&mut out, 100, 1.0));
        assert_eq!(voice.state, PlayState::Stopped);
        assert_eq!(out[0], 0.5);
        assert_eq!(out[7], 0.5);
        assert_eq!(out[8], 0.0);
    }

    #[test]
    fn test_voice_looping_keeps_playing() {
        let mut voice = static_voice(vec![0.25; 4], 1);
        voice.props.pending.looping = true;
        voice.props.commit();
        voice.play().unwrap();
        let mut out = vec![0.0; 2 * 16];
        assert!(!voice.mix_into(&mut out, 100, 1.0));
        assert_eq!(voice.state, PlayState::Playing);
        assert!(out.iter().all(|s| *s == 0.25));
    }

    #[test]
    fn test_voice_pause_resume_only_from_matching_state() {
        let mut voice = static_voice(vec![0.0; 4], 1);
        voice.pause();
        assert_eq!(voice.state, PlayState::Initial);
        voice.play().unwrap();
        voice.resume();
        assert_eq!(voice.state, PlayState::Playing);
        voice.pause();
        assert_eq!(voice.state, PlayState::Paused);
        voice.resume();
        assert_eq!(voice.state, PlayState::Playing);
    }

    #[test]
    fn test_voice_offset_past_end_is_invalid() {
        let mut voice = static_voice(vec![0.0; 8], 2);
        assert!(voice.set_offset(3).is_ok());
        assert_eq!(voice.offset(), 3);
        assert_eq!(voice.set_offset(4), Err(AL_INVALID_VALUE));
    }

    #[test]
    fn test_voice_fade_stops_at_target() {
        let mut voice = static_voice(vec![1.0; 100], 1);
        voice.play().unwrap();
        voice.fade = Some(Fade {
            start_gain: 1.0,
            target_gain: 0.0,
            total: 10,
            remaining: 10,
        });
        let mut out = vec![0.0; 2 * 20];
        assert!(voice.mix_into(&mut out, 100, 1.0));
        assert_eq!(voice.state, PlayState::Stopped);
        assert_eq!(out[0], 1.0);
        assert!(out[2 * 9] < 0.2);
        assert_eq!(out[2 * 10], 0.0);
        assert_eq!(voice.props.pending.gain, 1.0);
    }

    #[test]
    fn test_props_reject_nan() {
        let mut props = SourceProps::default();
        assert_eq!(
            props.apply(SourceProp::Gain(f32::NAN)),
            Err(AL_INVALID_VALUE)
        );
        assert_eq!(props.gain, 1.0);
        assert!(props.apply(SourceProp::Gain(0.5)).is_ok());
        assert_eq!(props.gain, 0.5);
    }
}
