//! Decoded audio shared between sources.
//!
//! Buffers are cached per context by resource name. Loading a name that is
//! already cached returns the cached entry without decoding again. An entry
//! stays cached until it is destroyed (or [`free`]d), which is refused while
//! any source still plays from it: stop those sources first.
//!
//! ```no_run
//! # use alkit::prelude::*;
//! # fn main() -> alkit::AlResult<()> {
//! # let device = Device::open_default()?;
//! # let context = device.create_context()?;
//! # let _current = context.activate()?;
//! cache(&["step.wav", "door.wav"])?;
//! let step = Buffer::new("step.wav")?;
//! let mut source = step.play()?;
//! source.stop()?;
//! free(&["step.wav", "door.wav"])?;
//! # Ok(())
//! # }
//! ```
use std::{collections::BTreeSet, rc::Rc};

use crate::{
    audio::formats::{ChannelConfig, SampleType},
    context::{
        inner::ContextInner,
        message, registry,
    },
    decoder::{decoder_ffi, read_all, Decoder},
    source::{Source, SourceOps, SourceRef},
    sys, AlError, AlResult, ContextError,
};

/// One cached, decoded resource.
pub(crate) struct BufferEntry {
    pub(crate) engine: sys::ALuint,
    pub(crate) channel_config: ChannelConfig,
    pub(crate) sample_type: SampleType,
    pub(crate) frequency: u32,
    pub(crate) frames: u64,
    pub(crate) loop_points: (u64, u64),
    /// Sources currently playing from this buffer.
    pub(crate) sources: BTreeSet<sys::ALuint>,
}

/// A view of a cached buffer. Clones refer to the same entry.
#[derive(Clone)]
pub struct Buffer {
    ctx: Rc<ContextInner>,
    name: String,
}

impl Buffer {
    /// Returns the cached buffer for `name`, decoding and caching it first if
    /// needed.
    pub fn new(name: &str) -> AlResult<Self> {
        let ctx = registry::current_inner().ok_or(ContextError::NoCurrent)?;
        ctx.require_current()?;
        if ctx.state.borrow().buffers.contains_key(name) {
            tracing::trace!(context = ctx.name, name, "buffer cache hit");
            return Ok(Self::view(ctx, name));
        }
        let decoder = decoder_ffi::decode(&ctx, name)?;
        buffer_ffi::load(&ctx, name, decoder)?;
        Ok(Self::view(ctx, name))
    }

    /// Caches the whole of `decoder` under `name`. Fails if `name` is already
    /// cached.
    pub fn from_decoder(name: &str, decoder: Box<dyn Decoder>) -> AlResult<Self> {
        let ctx = registry::current_inner().ok_or(ContextError::NoCurrent)?;
        ctx.require_current()?;
        if ctx.state.borrow().buffers.contains_key(name) {
            return Err(AlError::state(format!("buffer {name:?} is already cached")));
        }
        buffer_ffi::load(&ctx, name, decoder)?;
        Ok(Self::view(ctx, name))
    }

    fn view(ctx: Rc<ContextInner>, name: &str) -> Self {
        Self {
            ctx,
            name: name.to_string(),
        }
    }

    /// The resource name this buffer is cached under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn context(&self) -> &Rc<ContextInner> {
        &self.ctx
    }

    /// Length in frames.
    pub fn length(&self) -> AlResult<u64> {
        buffer_ffi::with_entry(self, |e| e.frames)
    }

    pub fn length_seconds(&self) -> AlResult<f64> {
        buffer_ffi::with_entry(self, |e| e.frames as f64 / e.frequency as f64)
    }

    /// Size of the decoded data in bytes.
    pub fn size(&self) -> AlResult<u64> {
        buffer_ffi::with_entry(self, |e| {
            e.frames * e.channel_config.channels() as u64 * e.sample_type.bytes_per_sample() as u64
        })
    }

    pub fn frequency(&self) -> AlResult<u32> {
        buffer_ffi::with_entry(self, |e| e.frequency)
    }

    pub fn channel_config(&self) -> AlResult<ChannelConfig> {
        buffer_ffi::with_entry(self, |e| e.channel_config)
    }

    pub fn sample_type(&self) -> AlResult<SampleType> {
        buffer_ffi::with_entry(self, |e| e.sample_type)
    }

    pub fn loop_points(&self) -> AlResult<(u64, u64)> {
        buffer_ffi::with_entry(self, |e| e.loop_points)
    }

    /// Sets the loop region, `start < end <= length`. Refused while any
    /// source plays from the buffer.
    pub fn set_loop_points(&self, start: u64, end: u64) -> AlResult<()> {
        buffer_ffi::set_loop_points(self, start, end)
    }

    /// Sources currently playing from this buffer.
    pub fn sources(&self) -> AlResult<Vec<SourceRef>> {
        let names = buffer_ffi::with_entry(self, |e| e.sources.clone())?;
        Ok(names
            .into_iter()
            .map(|name| SourceRef::from_name(self.ctx.clone(), name))
            .collect())
    }

    pub fn source_count(&self) -> AlResult<usize> {
        buffer_ffi::with_entry(self, |e| e.sources.len())
    }

    /// Plays the buffer on a new source.
    pub fn play(&self) -> AlResult<Source> {
        buffer_ffi::check(self)?;
        let source = Source::new()?;
        source.play(self)?;
        Ok(source)
    }

    /// Evicts the buffer from the cache. Fails with [`AlError::State`] while
    /// any source plays from it.
    pub fn destroy(&self) -> AlResult<()> {
        buffer_ffi::check(self)?;
        buffer_ffi::evict(&self.ctx, &self.name)
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.ctx, &other.ctx) && self.name == other.name
    }
}

impl Eq for Buffer {}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("context", &self.ctx.name)
            .field("name", &self.name)
            .finish()
    }
}

/// Decodes and caches every name in `names` that is not cached yet.
pub fn cache(names: &[&str]) -> AlResult<()> {
    for name in names {
        Buffer::new(name)?;
    }
    Ok(())
}

/// Evicts every cached name in `names`. Names that are not cached are
/// skipped. Nothing is evicted if any of the buffers is in use.
pub fn free(names: &[&str]) -> AlResult<()> {
    let ctx = registry::current_inner().ok_or(ContextError::NoCurrent)?;
    ctx.require_current()?;
    {
        let state = ctx.state.borrow();
        if let Some(name) = names
            .iter()
            .find(|n| state.buffers.get(**n).is_some_and(|e| !e.sources.is_empty()))
        {
            return Err(AlError::state(format!("buffer {name:?} is in use")));
        }
    }
    for name in names {
        if ctx.state.borrow().buffers.contains_key(*name) {
            buffer_ffi::evict(&ctx, name)?;
        }
    }
    Ok(())
}

pub(crate) mod buffer_ffi {
    use super::*;

    /// Context alive, entry cached, context current; in that order.
    pub fn check(buffer: &Buffer) -> AlResult<()> {
        if buffer.ctx.destroyed.get() {
            return Err(ContextError::Destroyed.into());
        }
        if !buffer.ctx.state.borrow().buffers.contains_key(&buffer.name) {
            return Err(AlError::Destroyed("buffer"));
        }
        buffer.ctx.require_current()
    }

    pub fn with_entry<T>(buffer: &Buffer, f: impl FnOnce(&BufferEntry) -> T) -> AlResult<T> {
        check(buffer)?;
        let state = buffer.ctx.state.borrow();
        state
            .buffers
            .get(&buffer.name)
            .map(f)
            .ok_or(AlError::Destroyed("buffer"))
    }

    pub fn engine_name(buffer: &Buffer) -> AlResult<sys::ALuint> {
        with_entry(buffer, |e| e.engine)
    }

    pub fn load(ctx: &Rc<ContextInner>, name: &str, mut decoder: Box<dyn Decoder>) -> AlResult<()> {
        let frequency = decoder.frequency();
        let channel_config = decoder.channel_config();
        let sample_type = decoder.sample_type();
        if frequency == 0 {
            return Err(AlError::validation("buffer frequency", frequency));
        }
        let (loop_start, loop_end) = decoder.loop_points();
        let data = read_all(decoder.as_mut());
        let channels = channel_config.channels();
        let frame_bytes = channels as usize * sample_type.bytes_per_sample();
        let frames = (data.len() / frame_bytes) as u64;

        message::dispatch(ctx, |h| {
            h.buffer_loading(name, channel_config, sample_type, frequency, &data)
        });

        let samples = sample_type.to_f32(&data[..frames as usize * frame_bytes]);
        let engine = ctx.engine(|d, c| d.create_buffer(c, channels, frequency, samples))?;
        let loop_points = if loop_start < loop_end && loop_end <= frames && (loop_start, loop_end) != (0, frames) {
            ctx.engine(|d, c| d.set_buffer_loop_points(c, engine, loop_start, loop_end))?;
            (loop_start, loop_end)
        } else {
            (0, frames)
        };

        ctx.state.borrow_mut().buffers.insert(
            name.to_string(),
            BufferEntry {
                engine,
                channel_config,
                sample_type,
                frequency,
                frames,
                loop_points,
                sources: BTreeSet::new(),
            },
        );
        tracing::debug!(
            context = ctx.name,
            name,
            frames,
            frequency,
            channels = %channel_config,
            sample_type = %sample_type,
            "buffer loaded"
        );
        Ok(())
    }

    pub fn set_loop_points(buffer: &Buffer, start: u64, end: u64) -> AlResult<()> {
        let (engine, frames, in_use) =
            with_entry(buffer, |e| (e.engine, e.frames, !e.sources.is_empty()))?;
        if start >= end || end > frames {
            return Err(AlError::validation("loop points", (start, end)));
        }
        if in_use {
            return Err(AlError::state("cannot change loop points of a buffer in use"));
        }
        buffer
            .ctx
            .engine(|d, c| d.set_buffer_loop_points(c, engine, start, end))?;
        if let Some(entry) = buffer.ctx.state.borrow_mut().buffers.get_mut(&buffer.name) {
            entry.loop_points = (start, end);
        }
        Ok(())
    }

    pub fn evict(ctx: &ContextInner, name: &str) -> AlResult<()> {
        let engine = {
            let state = ctx.state.borrow();
            let entry = state.buffers.get(name).ok_or(AlError::Destroyed("buffer"))?;
            if !entry.sources.is_empty() {
                return Err(AlError::state(format!(
                    "buffer {name:?} is in use by {} sources",
                    entry.sources.len()
                )));
            }
            entry.engine
        };
        ctx.engine(|d, c| d.delete_buffer(c, engine))?;
        ctx.state.borrow_mut().buffers.remove(name);
        tracing::debug!(context = ctx.name, name, "buffer evicted");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::{
        context::{message::MessageHandler, ContextOps},
        decoder::DecoderFactory,
        device::DeviceOps,
        source::PlayState,
        test_assets::{mono_buffer, ToneDecoder, WavFile},
        test_util::{test_device, with_context},
    };

    struct Counting(Cell<usize>);

    impl DecoderFactory for Counting {
        fn create_decoder(&self, name: &str) -> Option<Box<dyn Decoder>> {
            if name != "tone" {
                return None;
            }
            self.0.set(self.0.get() + 1);
            Some(Box::new(ToneDecoder::new(100)))
        }
    }

    #[derive(Default)]
    struct Loading(RefCell<Vec<(String, usize)>>);

    impl MessageHandler for Loading {
        fn buffer_loading(
            &self,
            name: &str,
            _channel_config: ChannelConfig,
            _sample_type: SampleType,
            _sample_rate: u32,
            data: &[u8],
        ) {
            self.0.borrow_mut().push((name.to_string(), data.len()));
        }
    }

    #[test]
    fn test_buffer_requires_current_context() {
        let device = test_device();
        let _context = device.create_context().unwrap();
        assert_eq!(
            Buffer::new("tone").err(),
            Some(AlError::Context(ContextError::NoCurrent))
        );
    }

    #[test]
    fn test_buffer_is_decoded_once() {
        with_context(|_, ctx| {
            let factory = Rc::new(Counting(Cell::new(0)));
            ctx.register_decoder_factory("counting", factory.clone())?;
            let a = Buffer::new("tone")?;
            let b = Buffer::new("tone")?;
            assert_eq!(a, b);
            assert_eq!(factory.0.get(), 1);

            let mut first = a.play()?;
            let mut second = b.play()?;
            assert_eq!(a.source_count()?, 2);
            first.destroy()?;
            second.destroy()?;
            assert_eq!(a.source_count()?, 0);
            a.destroy()?;
            assert_eq!(b.length().err(), Some(AlError::Destroyed("buffer")));
            Ok(())
        });
    }

    #[test]
    fn test_buffer_destroy_in_use_fails() {
        with_context(|_, _| {
            let buffer = mono_buffer("busy", 1000)?;
            let source = buffer.play()?;
            assert!(matches!(buffer.destroy(), Err(AlError::State(_))));
            assert_eq!(buffer.length()?, 1000);
            source.stop()?;
            buffer.destroy()?;
            Ok(())
        });
    }

    #[test]
    fn test_buffer_properties() {
        with_context(|_, _| {
            let buffer = mono_buffer("props", 44100)?;
            assert_eq!(buffer.name(), "props");
            assert_eq!(buffer.length()?, 44100);
            assert!((buffer.length_seconds()? - 1.0).abs() < 1e-9);
            assert_eq!(buffer.size()?, 88200);
            assert_eq!(buffer.frequency()?, 44100);
            assert_eq!(buffer.channel_config()?, ChannelConfig::Mono);
            assert_eq!(buffer.sample_type()?, SampleType::Int16);
            assert_eq!(buffer.loop_points()?, (0, 44100));
            Ok(())
        });
    }

    #[test]
    fn test_buffer_loop_points() {
        with_context(|_, _| {
            let buffer = mono_buffer("loops", 100)?;
            buffer.set_loop_points(10, 90)?;
            assert_eq!(buffer.loop_points()?, (10, 90));
            assert!(matches!(
                buffer.set_loop_points(50, 50),
                Err(AlError::Validation { .. })
            ));
            assert!(matches!(
                buffer.set_loop_points(0, 101),
                Err(AlError::Validation { .. })
            ));
            assert_eq!(buffer.loop_points()?, (10, 90));

            let source = buffer.play()?;
            assert!(matches!(buffer.set_loop_points(0, 50), Err(AlError::State(_))));
            source.stop()?;
            buffer.set_loop_points(0, 50)?;
            Ok(())
        });
    }

    #[test]
    fn test_buffer_sources_tracks_players() {
        with_context(|device, _| {
            let buffer = mono_buffer("tracked", 16)?;
            let source = buffer.play()?;
            assert_eq!(buffer.sources()?, vec![source.to_source_ref()]);
            device.render(32);
            assert_eq!(source.state()?, PlayState::Stopped);
            Ok(())
        });
    }

    #[test]
    fn test_from_decoder_rejects_duplicate_name() {
        with_context(|_, _| {
            mono_buffer("dup", 10)?;
            assert!(matches!(mono_buffer("dup", 10), Err(AlError::State(_))));
            Ok(())
        });
    }

    #[test]
    fn test_buffer_loading_is_dispatched() {
        with_context(|_, ctx| {
            let handler = Rc::new(Loading::default());
            ctx.set_message_handler(handler.clone());
            let wav = WavFile::mono_i16(44100, &[1, 2, 3]);
            Buffer::new(wav.path())?;
            Buffer::new(wav.path())?;
            assert_eq!(*handler.0.borrow(), vec![(wav.path().to_string(), 6)]);
            Ok(())
        });
    }

    #[test]
    fn test_cache_and_free() {
        with_context(|_, _| {
            let a = WavFile::mono_i16(8000, &[0; 16]);
            let b = WavFile::mono_i16(8000, &[0; 32]);
            cache(&[a.path(), b.path()])?;
            let held = Buffer::new(b.path())?;
            assert_eq!(held.length()?, 32);

            let source = held.play()?;
            assert!(matches!(free(&[a.path(), b.path()]), Err(AlError::State(_))));
            assert_eq!(Buffer::new(a.path())?.length()?, 16);

            source.stop()?;
            free(&[a.path(), b.path(), "never-cached"])?;
            assert_eq!(held.length().err(), Some(AlError::Destroyed("buffer")));
            Ok(())
        });
    }

    #[test]
    fn test_missing_resource_fails() {
        with_context(|_, _| {
            assert!(matches!(Buffer::new("no/such/file.wav"), Err(AlError::Resource(_))));
            Ok(())
        });
    }

    #[test]
    fn test_buffer_outlived_by_context() {
        let device = test_device();
        let context = device.create_context().unwrap();
        let buffer = {
            let _guard = context.activate().unwrap();
            mono_buffer("orphan", 8).unwrap()
        };
        drop(context);
        assert_eq!(
            buffer.length().err(),
            Some(AlError::Context(ContextError::Destroyed))
        );
    }
}
