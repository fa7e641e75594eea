//! Software 3-D audio engine.
//!
//! `alkit-soft` is the engine layer underneath `alkit`. It follows the shape of
//! an OpenAL implementation: objects are identified by numeric names
//! ([`ALuint`]), failures are reported as raw `AL_*` status codes ([`ALenum`]),
//! and all state for a device lives behind a single lock so audio can be
//! rendered from another thread.
//!
//! The engine stores every parameter it is given and runs the playback state
//! machine, but the renderer is deliberately simple: sources are resampled by
//! nearest-frame stepping and down-mixed to stereo with their gain applied. No
//! spatialization or effect DSP is performed.
//!
//! Audio is pulled with [`SoftDevice::render`]. Nothing advances on its own.
#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]

mod context;
mod device;
mod effect;
mod voice;

pub use context::{ContextParams, EngineEvent, ListenerProp, ListenerProps};
pub use device::{
    enumerate, BufferInfo, DeviceAttrs, DeviceEnumeration, SoftDevice, DEFAULT_DEVICE_NAME,
    DEFAULT_RESAMPLER, RESAMPLERS,
};
pub use voice::{PlayState, SourceProp, SourceProps};

pub type ALenum = i32;
pub type ALuint = u32;

// Status codes.
pub const AL_NO_ERROR: ALenum = 0;
pub const AL_INVALID_NAME: ALenum = 0xA001;
pub const AL_INVALID_ENUM: ALenum = 0xA002;
pub const AL_INVALID_VALUE: ALenum = 0xA003;
pub const AL_INVALID_OPERATION: ALenum = 0xA004;
pub const AL_OUT_OF_MEMORY: ALenum = 0xA005;
pub const ALC_INVALID_DEVICE: ALenum = 0xA001 + 0x1000;
pub const ALC_INVALID_CONTEXT: ALenum = 0xA002 + 0x1000;

// Booleans and tri-states.
pub const AL_FALSE: ALenum = 0;
pub const AL_TRUE: ALenum = 1;
pub const AL_AUTO_SOFT: ALenum = 0x0002;

// Distance models.
pub const AL_NONE: ALenum = 0;
pub const AL_INVERSE_DISTANCE: ALenum = 0xD001;
pub const AL_INVERSE_DISTANCE_CLAMPED: ALenum = 0xD002;
pub const AL_LINEAR_DISTANCE: ALenum = 0xD003;
pub const AL_LINEAR_DISTANCE_CLAMPED: ALenum = 0xD004;
pub const AL_EXPONENT_DISTANCE: ALenum = 0xD005;
pub const AL_EXPONENT_DISTANCE_CLAMPED: ALenum = 0xD006;

// Device queries.
pub const ALC_FREQUENCY: ALenum = 0x1007;
pub const ALC_MAJOR_VERSION: ALenum = 0x1000;
pub const ALC_MINOR_VERSION: ALenum = 0x1001;
pub const ALC_HRTF_SOFT: ALenum = 0x1992;
pub const ALC_EFX_MAJOR_VERSION: ALenum = 0x20001;
pub const ALC_EFX_MINOR_VERSION: ALenum = 0x20002;
pub const ALC_MAX_AUXILIARY_SENDS: ALenum = 0x20003;

// Effect types.
pub const AL_EFFECT_NULL: ALenum = 0x0000;
pub const AL_EFFECT_CHORUS: ALenum = 0x0002;
pub const AL_EFFECT_EAXREVERB: ALenum = 0x8000;

// EAX reverb parameters.
pub const AL_EAXREVERB_DENSITY: ALenum = 0x0001;
pub const AL_EAXREVERB_DIFFUSION: ALenum = 0x0002;
pub const AL_EAXREVERB_GAIN: ALenum = 0x0003;
pub const AL_EAXREVERB_GAINHF: ALenum = 0x0004;
pub const AL_EAXREVERB_GAINLF: ALenum = 0x0005;
pub const AL_EAXREVERB_DECAY_TIME: ALenum = 0x0006;
pub const AL_EAXREVERB_DECAY_HFRATIO: ALenum = 0x0007;
pub const AL_EAXREVERB_DECAY_LFRATIO: ALenum = 0x0008;
pub const AL_EAXREVERB_REFLECTIONS_GAIN: ALenum = 0x0009;
pub const AL_EAXREVERB_REFLECTIONS_DELAY: ALenum = 0x000A;
pub const AL_EAXREVERB_REFLECTIONS_PAN: ALenum = 0x000B;
pub const AL_EAXREVERB_LATE_REVERB_GAIN: ALenum = 0x000C;
pub const AL_EAXREVERB_LATE_REVERB_DELAY: ALenum = 0x000D;
pub const AL_EAXREVERB_LATE_REVERB_PAN: ALenum = 0x000E;
pub const AL_EAXREVERB_ECHO_TIME: ALenum = 0x000F;
pub const AL_EAXREVERB_ECHO_DEPTH: ALenum = 0x0010;
pub const AL_EAXREVERB_MODULATION_TIME: ALenum = 0x0011;
pub const AL_EAXREVERB_MODULATION_DEPTH: ALenum = 0x0012;
pub const AL_EAXREVERB_AIR_ABSORPTION_GAINHF: ALenum = 0x0013;
pub const AL_EAXREVERB_HFREFERENCE: ALenum = 0x0014;
pub const AL_EAXREVERB_LFREFERENCE: ALenum = 0x0015;
pub const AL_EAXREVERB_ROOM_ROLLOFF_FACTOR: ALenum = 0x0016;
pub const AL_EAXREVERB_DECAY_HFLIMIT: ALenum = 0x0017;

// Chorus parameters.
pub const AL_CHORUS_WAVEFORM: ALenum = 0x0001;
pub const AL_CHORUS_PHASE: ALenum = 0x0002;
pub const AL_CHORUS_RATE: ALenum = 0x0003;
pub const AL_CHORUS_DEPTH: ALenum = 0x0004;
pub const AL_CHORUS_FEEDBACK: ALenum = 0x0005;
pub const AL_CHORUS_DELAY: ALenum = 0x0006;

pub const AL_CHORUS_WAVEFORM_SINUSOID: ALenum = 0;
pub const AL_CHORUS_WAVEFORM_TRIANGLE: ALenum = 1;

/// Frames of output latency reported for every playing source.
pub const DEVICE_PERIOD_FRAMES: u64 = 1024;

pub(crate) fn next_name() -> ALuint {
    use std::sync::atomic::{AtomicU32, Ordering};
    static NEXT: AtomicU32 = AtomicU32::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
