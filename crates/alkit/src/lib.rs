//! `alkit` is an audio-playback object model layered over a 3-D audio engine
//! with OpenAL-style devices, contexts, sources, buffers and effects.
//!
//! The crate is organized around a thread-scoped notion of the *current
//! context*. A [`Device`](device::Device) is opened first, then a
//! [`Context`](context::Context) is created on it and made current, either for a
//! scope with [`ContextOps::activate`](context::ContextOps::activate) or until
//! changed with [`use_context`](context::use_context). Sources, buffers, groups,
//! effects and effect slots are created against the current context, and every
//! later read or write of them requires that same context to be current again.
//!
//! Property writes are range-checked before they reach the engine. A rejected
//! write leaves the previous value in place and reports
//! [`AlError::Validation`].
//!
//! Engine notifications (a source running out of data, a device disappearing,
//! a buffer being decoded, a missing resource) are delivered to a per-context
//! [`MessageHandler`](context::message::MessageHandler).
//!
//! ## Quick start
//! ```no_run
//! # use alkit::prelude::*;
//! # fn main() -> alkit::AlResult<()> {
//! let device = Device::open_default()?;
//! let context = device.create_context()?;
//! let _current = context.activate()?;
//!
//! let buffer = Buffer::new("music.wav")?;
//! let source = Source::new()?;
//! source.set_gain(0.5)?;
//! source.play(&buffer)?;
//! while source.playing()? {
//!     device.render(1024);
//!     context.update()?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Objects are released when their owning handle is dropped. Explicit
//! `destroy()` calls report failures that `Drop` can only log.
#![allow(clippy::new_without_default)]

pub mod audio;
pub mod buffer;
pub mod context;
pub mod decoder;
pub mod device;
pub mod effect;
pub mod source;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_assets;

#[doc(hidden)]
pub extern crate alkit_soft;

use alkit_soft as sys;

/// Prelude for the crate.
///
/// Re-exports the handle types and the `*Ops` traits that carry most of their
/// methods, so a single glob import is enough.
pub mod prelude {
    pub use crate::{
        audio::{
            formats::{ChannelConfig, SampleType},
            math::vec3::Vec3,
            spatial::{DistanceModel, Spatialize},
        },
        buffer::{cache, free, Buffer},
        context::{
            current_context,
            listener::Listener,
            message::{DefaultMessageHandler, MessageHandler},
            registry::ContextGuard,
            use_context, Context, ContextBuilder, ContextOps, ContextRef,
        },
        decoder::{decode, Decoder, DecoderFactory, FileDecoder},
        device::{device_names, Device, DeviceBuilder, DeviceNames, DeviceOps, DeviceRef},
        effect::{
            slot::AuxiliaryEffectSlot, ChorusProperties, ChorusWaveform, Effect, EffectType,
            ReverbProperties,
        },
        source::{
            sends::{FilterParams, SourceSend},
            source_group::{SourceGroup, SourceGroupOps, SourceGroupRef},
            PlayState, Source, SourceOps, SourceRef,
        },
        AlError, AlResult,
    };
}

/// A raw engine status code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlStatus(pub sys::ALenum);

impl std::fmt::Display for AlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AlStatus: {} ({:#06x})", self.name(), self.0)
    }
}

impl std::fmt::Debug for AlStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AlStatus({}, {:#06x})", self.name(), self.0)
    }
}

impl AlStatus {
    pub fn name(self) -> &'static str {
        match self.0 {
            sys::AL_NO_ERROR => "NoError",
            sys::AL_INVALID_NAME => "InvalidName",
            sys::AL_INVALID_ENUM => "InvalidEnum",
            sys::AL_INVALID_VALUE => "InvalidValue",
            sys::AL_INVALID_OPERATION => "InvalidOperation",
            sys::AL_OUT_OF_MEMORY => "OutOfMemory",
            sys::ALC_INVALID_DEVICE => "InvalidDevice",
            sys::ALC_INVALID_CONTEXT => "InvalidContext",
            _ => "UNKNOWN_AL_ERROR",
        }
    }
}

pub(crate) struct AlRawResult;

impl AlRawResult {
    /// Lifts an engine result into the crate's error type.
    #[inline]
    pub(crate) fn resolve<T>(res: Result<T, sys::ALenum>) -> AlResult<T> {
        res.map_err(|code| AlError::Engine(AlStatus(code)))
    }
}

/// Why an operation could not find the context it needs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("no context is current on this thread")]
    NoCurrent,
    #[error("the object's context is not the current context")]
    Mismatch,
    #[error("the context has been destroyed")]
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum AlError {
    /// The required context is not current.
    #[error("context error: {0}")]
    Context(#[from] ContextError),
    /// A value outside the documented domain of a property.
    #[error("invalid value for {field}: {value}")]
    Validation { field: &'static str, value: String },
    /// A device, resource or voice could not be obtained.
    #[error("resource error: {0}")]
    Resource(String),
    /// The object is in a state that does not allow the operation.
    #[error("invalid state: {0}")]
    State(String),
    /// An index outside `0..len`.
    #[error("index {index} out of range for length {len}")]
    Index { index: usize, len: usize },
    /// The handle's object was destroyed.
    #[error("{0} has been destroyed")]
    Destroyed(&'static str),
    #[error("engine error: {0}")]
    Engine(AlStatus),
}

impl AlError {
    pub(crate) fn validation(field: &'static str, value: impl std::fmt::Debug) -> Self {
        AlError::Validation {
            field,
            value: format!("{value:?}"),
        }
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        AlError::State(msg.into())
    }

    pub(crate) fn resource(msg: impl Into<String>) -> Self {
        AlError::Resource(msg.into())
    }
}

pub type AlResult<T> = std::result::Result<T, AlError>;

#[cfg(test)]
pub(crate) mod test_util {
    use crate::{
        context::{Context, ContextOps},
        device::{Device, DeviceBuilder},
        AlResult,
    };

    pub fn assert_f32_eq(a: f32, b: f32) {
        assert!(
            (a - b).abs() <= 1.0e-6,
            "expected {a} ~= {b}, diff={}",
            (a - b).abs()
        );
    }

    pub fn test_device() -> Device {
        DeviceBuilder::new().build().unwrap()
    }

    /// Runs `f` with a fresh context made current for its duration.
    pub fn with_context<T>(f: impl FnOnce(&Device, &Context<'_>) -> AlResult<T>) -> T {
        let device = test_device();
        let context = device.create_context().unwrap();
        let guard = context.activate().unwrap();
        let out = f(&device, &context).unwrap();
        drop(guard);
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn al_status_is_readable() {
        let err = AlStatus(sys::AL_INVALID_VALUE);
        assert!(err.to_string().contains("InvalidValue"));

        let err = AlStatus(sys::AL_INVALID_OPERATION);
        assert!(err.to_string().contains("InvalidOperation"));

        let err = AlStatus(sys::ALC_INVALID_CONTEXT);
        assert!(err.to_string().contains("InvalidContext"));

        assert_eq!(AlStatus(0x1234).name(), "UNKNOWN_AL_ERROR");
    }

    #[test]
    fn validation_error_names_field_and_value() {
        let err = AlError::validation("gain", -1.0f32);
        assert_eq!(err.to_string(), "invalid value for gain: -1.0");
    }
}
