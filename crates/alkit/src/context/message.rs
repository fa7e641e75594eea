//! Engine notifications delivered to a per-context handler.
//!
//! `source_stopped` and `device_disconnected` are queued by the engine and
//! delivered from [`ContextOps::update`](crate::context::ContextOps::update).
//! The other events are delivered synchronously from the call that causes
//! them.
//!
//! Handlers take `&self`; use `Cell`/`RefCell` for state they record.
use std::rc::Rc;

use crate::{
    audio::formats::{ChannelConfig, SampleType},
    context::inner::ContextInner,
    device::DeviceRef,
    source::SourceRef,
};

/// Receives engine notifications for one context.
///
/// Every method has a no-op default, so implementors override only the events
/// they care about.
///
/// ```
/// # use std::cell::RefCell;
/// # use alkit::prelude::*;
/// struct Log(RefCell<Vec<String>>);
///
/// impl MessageHandler for Log {
///     fn buffer_loading(
///         &self,
///         name: &str,
///         _config: ChannelConfig,
///         _ty: SampleType,
///         _rate: u32,
///         _data: &[u8],
///     ) {
///         self.0.borrow_mut().push(name.to_string());
///     }
/// }
/// ```
pub trait MessageHandler {
    /// The device stopped producing output. Every source of the context has
    /// been stopped.
    fn device_disconnected(&self, _device: &DeviceRef) {}

    /// A source reached the end of its data.
    fn source_stopped(&self, _source: &SourceRef) {}

    /// A source was stopped by a group operation or lost its voice to a
    /// higher-priority source.
    fn source_force_stopped(&self, _source: &SourceRef) {}

    /// A buffer finished decoding and is about to be uploaded.
    fn buffer_loading(
        &self,
        _name: &str,
        _channel_config: ChannelConfig,
        _sample_type: SampleType,
        _sample_rate: u32,
        _data: &[u8],
    ) {
    }

    /// No decoder could open `name`. Returning a non-empty name retries the
    /// lookup with it; the empty string gives up.
    fn resource_not_found(&self, _name: &str) -> String {
        String::new()
    }
}

/// The handler installed on new contexts.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMessageHandler;

impl MessageHandler for DefaultMessageHandler {}

/// Calls `f` with the handler installed right now.
pub(crate) fn dispatch(ctx: &ContextInner, f: impl FnOnce(&dyn MessageHandler)) {
    let handler: Rc<dyn MessageHandler> = ctx.handler();
    f(handler.as_ref());
}
