//! Audio decoders.
//!
//! A [`Decoder`] yields raw interleaved sample bytes in its declared
//! [`ChannelConfig`] and [`SampleType`]. [`decode`] resolves a resource name
//! to a decoder: the current context's registered [`DecoderFactory`]s are
//! consulted in registration order, then the built-in file decoder. When
//! nothing can open the name the context's
//! [`MessageHandler::resource_not_found`](crate::context::message::MessageHandler::resource_not_found)
//! may supply a substitute name to try instead.
use std::rc::Rc;

use crate::{
    audio::formats::{ChannelConfig, SampleType},
    context::{inner::ContextInner, registry},
    AlError, AlResult, ContextError,
};

pub mod file;

pub use file::FileDecoder;

/// A source of decoded audio.
pub trait Decoder {
    /// Sample rate in Hz.
    fn frequency(&self) -> u32;

    fn channel_config(&self) -> ChannelConfig;

    fn sample_type(&self) -> SampleType;

    /// Total length in frames, or 0 when unknown.
    fn length(&self) -> u64;

    /// `(start, end)` frames of the loop region.
    fn loop_points(&self) -> (u64, u64) {
        (0, self.length())
    }

    /// Moves the read position to `frame`. Returns `false` if the decoder
    /// cannot seek there; the position is then unspecified.
    fn seek(&mut self, frame: u64) -> bool;

    /// Reads up to `frames` frames. An empty result means the end of the data.
    fn read(&mut self, frames: usize) -> Vec<u8>;
}

/// Opens decoders for resource names. Registered per context with
/// [`ContextOps::register_decoder_factory`](crate::context::ContextOps::register_decoder_factory).
pub trait DecoderFactory {
    /// `None` if this factory does not handle `name`.
    fn create_decoder(&self, name: &str) -> Option<Box<dyn Decoder>>;
}

/// Opens a decoder for `name` in the current context.
pub fn decode(name: &str) -> AlResult<Box<dyn Decoder>> {
    let ctx = registry::current_inner().ok_or(ContextError::NoCurrent)?;
    ctx.require_current()?;
    decoder_ffi::decode(&ctx, name)
}

/// Reads everything left in `decoder`.
pub(crate) fn read_all(decoder: &mut dyn Decoder) -> Vec<u8> {
    let mut data = Vec::new();
    loop {
        let chunk = decoder.read(4096);
        if chunk.is_empty() {
            break data;
        }
        data.extend_from_slice(&chunk);
    }
}

pub(crate) mod decoder_ffi {
    use super::*;

    fn open(ctx: &ContextInner, name: &str) -> Option<Box<dyn Decoder>> {
        let factories = ctx.state.borrow().decoder_factories();
        if let Some(decoder) = factories.iter().find_map(|f| f.create_decoder(name)) {
            return Some(decoder);
        }
        match FileDecoder::open(name) {
            Ok(decoder) => Some(Box::new(decoder)),
            Err(e) => {
                tracing::trace!(name, error = %e, "file decoder could not open resource");
                None
            }
        }
    }

    /// Tries `name`, then whatever substitutes the message handler offers.
    /// A name is never tried twice.
    pub fn decode(ctx: &Rc<ContextInner>, name: &str) -> AlResult<Box<dyn Decoder>> {
        let mut tried: Vec<String> = Vec::new();
        let mut current = name.to_string();
        loop {
            if let Some(decoder) = open(ctx, &current) {
                tracing::debug!(
                    name = %current,
                    frequency = decoder.frequency(),
                    channels = %decoder.channel_config(),
                    sample_type = %decoder.sample_type(),
                    "resource decoded"
                );
                return Ok(decoder);
            }
            tried.push(current.clone());
            let handler = ctx.handler();
            let substitute = handler.resource_not_found(&current);
            if substitute.is_empty() || tried.contains(&substitute) {
                return Err(AlError::resource(format!(
                    "no decoder could open {name:?} (tried {tried:?})"
                )));
            }
            tracing::debug!(missing = %current, substitute = %substitute, "trying substitute resource");
            current = substitute;
        }
    }
}
