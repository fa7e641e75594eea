//! Contexts, the thread-scoped current context and engine notifications.
//!
//! A [`Context`] is created on a [`Device`](crate::device::Device) and owns one
//! listener, one message handler and the global propagation parameters
//! (doppler factor, speed of sound, distance model). Every source, buffer,
//! group, effect and slot is created against the *current* context and can
//! only be used again while that same context is current.
//!
//! [`ContextRef`] is a cheap clonable view of a context. Both implement
//! [`ContextOps`].
//!
//! ## Current context
//! Each thread has its own stack of active contexts, see [`registry`]. Use
//! [`ContextOps::activate`] for a scope, or [`use_context`] to replace the top
//! entry without a scope.
//!
//! ## Messages
//! The engine queues notifications that [`ContextOps::update`] delivers to the
//! installed [`MessageHandler`](message::MessageHandler). `update()` also
//! refills streaming sources, so it must be called periodically.
//!
//! Global propagation parameters are write-only:
//!
//! ```compile_fail
//! # use alkit::prelude::*;
//! # fn main() -> alkit::AlResult<()> {
//! let device = Device::open_default()?;
//! let context = device.create_context()?;
//! let _current = context.activate()?;
//! let factor = context.doppler_factor()?;
//! # Ok(())
//! # }
//! ```
use std::{marker::PhantomData, rc::Rc, time::Duration};

use crate::{
    audio::{
        formats::{ChannelConfig, SampleType},
        spatial::DistanceModel,
    },
    context::{inner::ContextInner, listener::Listener, message::MessageHandler, registry::ContextGuard},
    decoder::DecoderFactory,
    device::{Device, DeviceRef},
    AlResult,
};

pub mod context_builder;
pub(crate) mod inner;
pub mod listener;
pub mod message;
pub mod registry;

pub use context_builder::ContextBuilder;

/// An engine context bound to the [`Device`] it was created on.
///
/// Dropping a context destroys it along with anything still alive in it.
/// [`Context::destroy`] refuses instead while sources, groups, effects or
/// slots remain.
pub struct Context<'d> {
    handle: ContextRef,
    _device: PhantomData<&'d Device>,
}

/// A clonable view of a context.
///
/// Two views compare equal when they refer to the same context.
#[derive(Clone)]
pub struct ContextRef {
    pub(crate) inner: Rc<ContextInner>,
}

impl ContextRef {
    pub(crate) fn from_inner(inner: Rc<ContextInner>) -> Self {
        Self { inner }
    }
}

impl PartialEq for ContextRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ContextRef {}

impl std::fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRef")
            .field("name", &self.inner.name)
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

impl<'d> Context<'d> {
    pub fn as_context_ref(&self) -> &ContextRef {
        &self.handle
    }

    /// Destroys the context and frees its cached buffers.
    ///
    /// Fails with [`AlError::State`](crate::AlError::State) while sources,
    /// groups, effects or slots created in it are still alive. A context that
    /// is current anywhere on this thread's stack stops being current.
    pub fn destroy(&mut self) -> AlResult<()> {
        context_ffi::context_destroy(&self.handle.inner, false)
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        if self.handle.inner.destroyed.get() {
            return;
        }
        if let Err(e) = context_ffi::context_destroy(&self.handle.inner, true) {
            tracing::warn!(context = self.handle.inner.name, error = %e, "context drop failed");
        }
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Context").field(&self.handle).finish()
    }
}

pub(crate) mod private_context {
    use super::*;

    pub trait ContextHandleProvider<T: ?Sized> {
        fn context_inner(t: &T) -> &Rc<ContextInner>;
    }

    pub struct ContextProvider;
    pub struct ContextRefProvider;

    impl<'d> ContextHandleProvider<Context<'d>> for ContextProvider {
        #[inline]
        fn context_inner<'a>(t: &'a Context<'d>) -> &'a Rc<ContextInner> {
            &t.handle.inner
        }
    }

    impl ContextHandleProvider<ContextRef> for ContextRefProvider {
        #[inline]
        fn context_inner(t: &ContextRef) -> &Rc<ContextInner> {
            &t.inner
        }
    }

    pub fn context_inner<T: AsContextHandle + ?Sized>(t: &T) -> &Rc<ContextInner> {
        <T as AsContextHandle>::__HandleProvider::context_inner(t)
    }
}

#[doc(hidden)]
pub trait AsContextHandle {
    type __HandleProvider: private_context::ContextHandleProvider<Self>;
}

#[doc(hidden)]
impl AsContextHandle for Context<'_> {
    type __HandleProvider = private_context::ContextProvider;
}

#[doc(hidden)]
impl AsContextHandle for ContextRef {
    type __HandleProvider = private_context::ContextRefProvider;
}

impl<T: AsContextHandle + ?Sized> ContextOps for T {}

/// Operations shared by [`Context`] and [`ContextRef`].
///
/// Everything except the handler and decoder registration requires the
/// context to be current.
pub trait ContextOps: AsContextHandle {
    /// Makes this context current until the returned guard is dropped.
    fn activate(&self) -> AlResult<ContextGuard<'_>> {
        context_ffi::activate(self)
    }

    /// Whether this context is on top of the calling thread's stack.
    fn is_current(&self) -> bool {
        context_ffi::is_current(self)
    }

    fn to_context_ref(&self) -> ContextRef {
        ContextRef::from_inner(private_context::context_inner(self).clone())
    }

    /// The device this context renders to.
    fn device(&self) -> DeviceRef {
        DeviceRef::new(private_context::context_inner(self).device.clone())
    }

    /// Doppler exaggeration, `>= 0`. Zero disables doppler shift.
    fn set_doppler_factor(&self, factor: f32) -> AlResult<()> {
        context_ffi::set_doppler_factor(self, factor)
    }

    /// Speed of sound in world units per second, `> 0`.
    fn set_speed_of_sound(&self, speed: f32) -> AlResult<()> {
        context_ffi::set_speed_of_sound(self, speed)
    }

    fn set_distance_model(&self, model: DistanceModel) -> AlResult<()> {
        context_ffi::set_distance_model(self, model)
    }

    fn async_wake_interval(&self) -> AlResult<Duration> {
        context_ffi::async_wake_interval(self)
    }

    /// How often a background refill would wake. Kept for callers that pace
    /// their own [`update`](ContextOps::update) loop with it.
    fn set_async_wake_interval(&self, interval: Duration) -> AlResult<()> {
        context_ffi::set_async_wake_interval(self, interval)
    }

    /// Whether buffers of this layout and encoding can be created.
    fn is_supported(&self, channel_config: ChannelConfig, sample_type: SampleType) -> AlResult<bool> {
        context_ffi::is_supported(self, channel_config, sample_type)
    }

    /// Names of the resamplers a source can select, by index.
    fn available_resamplers(&self) -> AlResult<Vec<String>> {
        context_ffi::available_resamplers(self)
    }

    fn default_resampler_index(&self) -> AlResult<usize> {
        context_ffi::default_resampler_index(self)
    }

    fn message_handler(&self) -> Rc<dyn MessageHandler> {
        private_context::context_inner(self).handler()
    }

    /// Installs `handler`. Events raised after this call go to it.
    fn set_message_handler(&self, handler: Rc<dyn MessageHandler>) {
        *private_context::context_inner(self).handler.borrow_mut() = handler;
    }

    /// Defers property changes until the matching [`end_batch`](ContextOps::end_batch).
    /// Batches nest.
    fn start_batch(&self) -> AlResult<()> {
        context_ffi::start_batch(self)
    }

    fn end_batch(&self) -> AlResult<()> {
        context_ffi::end_batch(self)
    }

    /// Delivers queued engine notifications and refills streaming sources.
    fn update(&self) -> AlResult<()> {
        context_ffi::update(self)
    }

    fn listener(&self) -> Listener<'_> {
        Listener::new(private_context::context_inner(self))
    }

    /// Adds a named decoder factory, consulted in registration order before
    /// the built-in file decoder.
    fn register_decoder_factory(&self, name: &str, factory: Rc<dyn DecoderFactory>) -> AlResult<()> {
        context_ffi::register_decoder_factory(self, name, factory)
    }

    fn unregister_decoder_factory(&self, name: &str) -> AlResult<Option<Rc<dyn DecoderFactory>>> {
        context_ffi::unregister_decoder_factory(self, name)
    }
}

/// Replaces the calling thread's current context without a scope. `None`
/// leaves no context current.
///
/// Unlike [`ContextOps::activate`] this does not push: it overwrites the top
/// of the stack, or pushes onto an empty stack.
pub fn use_context(context: Option<&ContextRef>) -> AlResult<()> {
    if let Some(context) = context {
        if context.inner.destroyed.get() {
            return Err(crate::ContextError::Destroyed.into());
        }
    }
    registry::replace_top(context.map(|c| c.inner.clone()));
    Ok(())
}

/// The calling thread's current context.
pub fn current_context() -> Option<ContextRef> {
    registry::current()
}

pub(crate) mod context_ffi {
    use std::{
        cell::{Cell, RefCell},
        marker::PhantomData,
        rc::Rc,
        time::Duration,
    };

    use crate::{
        audio::{
            formats::{ChannelConfig, SampleType},
            spatial::DistanceModel,
        },
        context::{
            context_builder::ContextBuilder,
            inner::{ContextInner, ContextState},
            message::{self, DefaultMessageHandler},
            private_context, registry,
            registry::ContextGuard,
            AsContextHandle, Context, ContextRef,
        },
        decoder::DecoderFactory,
        device::DeviceRef,
        source::{source_ffi, stream, SourceRef},
        sys, validate, AlError, AlRawResult, AlResult, ContextError,
    };

    pub fn context_init(builder: ContextBuilder<'_>) -> AlResult<Context<'_>> {
        if builder.max_voices == 0 {
            return Err(AlError::validation("max voices", builder.max_voices));
        }
        let device = builder.device.raw().clone();
        let max_sends = AlRawResult::resolve(device.get_integer(sys::ALC_MAX_AUXILIARY_SENDS))?;
        let frequency = AlRawResult::resolve(device.get_integer(sys::ALC_FREQUENCY))?;
        let name = AlRawResult::resolve(device.create_context(builder.hrtf))?;
        let state = ContextState {
            async_wake_interval: builder.async_wake_interval,
            ..ContextState::default()
        };
        let inner = Rc::new(ContextInner {
            name,
            device,
            max_sends: max_sends as u32,
            max_voices: builder.max_voices,
            frequency: frequency as u32,
            handler: RefCell::new(Rc::new(DefaultMessageHandler)),
            state: RefCell::new(state),
            destroyed: Cell::new(false),
            local_names: Cell::new(0),
        });
        tracing::debug!(
            context = name,
            max_voices = builder.max_voices,
            hrtf = builder.hrtf,
            "context created"
        );
        Ok(Context {
            handle: ContextRef::from_inner(inner),
            _device: PhantomData,
        })
    }

    pub fn context_destroy(inner: &Rc<ContextInner>, force: bool) -> AlResult<()> {
        if inner.destroyed.get() {
            return Err(ContextError::Destroyed.into());
        }
        let live = inner.state.borrow().live_objects();
        if live > 0 {
            if !force {
                return Err(AlError::state(format!(
                    "context still owns {live} sources, groups, effects or slots"
                )));
            }
            tracing::warn!(context = inner.name, live, "destroying context with live objects");
        }
        let old = std::mem::take(&mut *inner.state.borrow_mut());
        let buffers = old.buffers.len();
        drop(old);
        registry::forget(inner);
        inner.destroyed.set(true);
        tracing::debug!(context = inner.name, buffers, "context destroyed");
        inner.engine(|d, c| d.destroy_context(c))
    }

    pub fn activate<C: AsContextHandle + ?Sized>(context: &C) -> AlResult<ContextGuard<'_>> {
        let inner = private_context::context_inner(context);
        if inner.destroyed.get() {
            return Err(ContextError::Destroyed.into());
        }
        Ok(ContextGuard::new(inner))
    }

    pub fn is_current<C: AsContextHandle + ?Sized>(context: &C) -> bool {
        registry::current_inner()
            .is_some_and(|c| Rc::ptr_eq(&c, private_context::context_inner(context)))
    }

    fn current<C: AsContextHandle + ?Sized>(context: &C) -> AlResult<&Rc<ContextInner>> {
        let inner = private_context::context_inner(context);
        inner.require_current()?;
        Ok(inner)
    }

    pub fn set_doppler_factor<C: AsContextHandle + ?Sized>(context: &C, factor: f32) -> AlResult<()> {
        let inner = current(context)?;
        validate::non_negative("doppler factor", factor)?;
        inner.engine(|d, c| d.set_doppler_factor(c, factor))
    }

    pub fn set_speed_of_sound<C: AsContextHandle + ?Sized>(context: &C, speed: f32) -> AlResult<()> {
        let inner = current(context)?;
        validate::positive("speed of sound", speed)?;
        inner.engine(|d, c| d.set_speed_of_sound(c, speed))
    }

    pub fn set_distance_model<C: AsContextHandle + ?Sized>(
        context: &C,
        model: DistanceModel,
    ) -> AlResult<()> {
        current(context)?.engine(|d, c| d.set_distance_model(c, model.into()))
    }

    pub fn async_wake_interval<C: AsContextHandle + ?Sized>(context: &C) -> AlResult<Duration> {
        Ok(current(context)?.state.borrow().async_wake_interval)
    }

    pub fn set_async_wake_interval<C: AsContextHandle + ?Sized>(
        context: &C,
        interval: Duration,
    ) -> AlResult<()> {
        current(context)?.state.borrow_mut().async_wake_interval = interval;
        Ok(())
    }

    pub fn is_supported<C: AsContextHandle + ?Sized>(
        context: &C,
        channel_config: ChannelConfig,
        sample_type: SampleType,
    ) -> AlResult<bool> {
        current(context)?;
        let ambisonic = matches!(
            channel_config,
            ChannelConfig::BFormat2D | ChannelConfig::BFormat3D
        );
        Ok(!(ambisonic && sample_type == SampleType::Mulaw))
    }

    pub fn available_resamplers<C: AsContextHandle + ?Sized>(context: &C) -> AlResult<Vec<String>> {
        current(context)?;
        Ok(sys::RESAMPLERS.iter().map(|s| s.to_string()).collect())
    }

    pub fn default_resampler_index<C: AsContextHandle + ?Sized>(context: &C) -> AlResult<usize> {
        current(context)?;
        Ok(sys::DEFAULT_RESAMPLER as usize)
    }

    pub fn start_batch<C: AsContextHandle + ?Sized>(context: &C) -> AlResult<()> {
        let inner = current(context)?;
        let depth = {
            let mut state = inner.state.borrow_mut();
            state.batch_depth += 1;
            state.batch_depth
        };
        if depth == 1 {
            inner.engine(|d, c| d.defer_updates(c))?;
        }
        Ok(())
    }

    pub fn end_batch<C: AsContextHandle + ?Sized>(context: &C) -> AlResult<()> {
        let inner = current(context)?;
        let depth = {
            let mut state = inner.state.borrow_mut();
            if state.batch_depth == 0 {
                return Err(AlError::state("end_batch without a matching start_batch"));
            }
            state.batch_depth -= 1;
            state.batch_depth
        };
        if depth == 0 {
            inner.engine(|d, c| d.process_updates(c))?;
        }
        Ok(())
    }

    pub fn update<C: AsContextHandle + ?Sized>(context: &C) -> AlResult<()> {
        let inner = current(context)?;
        let events = inner.engine(|d, c| d.poll_events(c))?;
        for event in events {
            match event {
                sys::EngineEvent::SourceStopped(name) => {
                    if source_ffi::on_engine_stop(inner, name)? {
                        let source = SourceRef::from_name(inner.clone(), name);
                        message::dispatch(inner, |h| h.source_stopped(&source));
                    }
                }
                sys::EngineEvent::Disconnected => {
                    source_ffi::release_all(inner)?;
                    let device = DeviceRef::new(inner.device.clone());
                    message::dispatch(inner, |h| h.device_disconnected(&device));
                }
            }
        }
        stream::refill_all(inner)
    }

    pub fn register_decoder_factory<C: AsContextHandle + ?Sized>(
        context: &C,
        name: &str,
        factory: Rc<dyn DecoderFactory>,
    ) -> AlResult<()> {
        let inner = private_context::context_inner(context);
        if inner.destroyed.get() {
            return Err(ContextError::Destroyed.into());
        }
        let mut state = inner.state.borrow_mut();
        if state.decoders.iter().any(|(n, _)| n == name) {
            return Err(AlError::state(format!(
                "decoder factory {name:?} is already registered"
            )));
        }
        state.decoders.push((name.to_string(), factory));
        Ok(())
    }

    pub fn unregister_decoder_factory<C: AsContextHandle + ?Sized>(
        context: &C,
        name: &str,
    ) -> AlResult<Option<Rc<dyn DecoderFactory>>> {
        let inner = private_context::context_inner(context);
        if inner.destroyed.get() {
            return Err(ContextError::Destroyed.into());
        }
        let mut state = inner.state.borrow_mut();
        let index = state.decoders.iter().position(|(n, _)| n == name);
        Ok(index.map(|i| state.decoders.remove(i).1))
    }
}
