//! Decoder-fed playback through the engine's chunk queue.
use crate::{
    audio::formats::{ChannelConfig, SampleType},
    context::inner::{ContextInner, Handle},
    decoder::Decoder,
    source::{
        source_ffi::{self, check},
        PlayState,
    },
    sys, AlError, AlResult,
};

pub(crate) struct StreamState {
    pub(crate) decoder: Box<dyn Decoder>,
    pub(crate) chunk_len: usize,
    pub(crate) queue_size: usize,
    /// Decoder frame the current engine queue started at.
    pub(crate) origin: u64,
    pub(crate) frequency: u32,
    pub(crate) channel_config: ChannelConfig,
    pub(crate) sample_type: SampleType,
    pub(crate) eof: bool,
}

impl StreamState {
    fn new(decoder: Box<dyn Decoder>, chunk_len: usize, queue_size: usize) -> Self {
        Self {
            frequency: decoder.frequency(),
            channel_config: decoder.channel_config(),
            sample_type: decoder.sample_type(),
            decoder,
            chunk_len,
            queue_size,
            origin: 0,
            eof: false,
        }
    }

    /// Reads the next chunk as whole frames of `f32`, wrapping to the loop
    /// start when `looping`. `None` at the end of the data.
    fn next_chunk(&mut self, looping: bool) -> Option<Vec<f32>> {
        let channels = self.channel_config.channels() as usize;
        let mut wrapped = false;
        loop {
            let bytes = self.decoder.read(self.chunk_len);
            let mut samples = self.sample_type.to_f32(&bytes);
            samples.truncate(samples.len() - samples.len() % channels);
            if !samples.is_empty() {
                return Some(samples);
            }
            if !looping || wrapped {
                return None;
            }
            let (start, _) = self.decoder.loop_points();
            if !self.decoder.seek(start) {
                return None;
            }
            wrapped = true;
        }
    }
}

/// Tops the engine queue up to `queue_size` chunks.
fn fill(
    ctx: &ContextInner,
    name: sys::ALuint,
    stream: &mut StreamState,
    mut queued: usize,
    looping: bool,
) -> AlResult<usize> {
    let channels = stream.channel_config.channels();
    while queued < stream.queue_size && !stream.eof {
        let Some(samples) = stream.next_chunk(looping) else {
            stream.eof = true;
            break;
        };
        ctx.engine(|d, c| d.queue_source_chunk(c, name, channels, stream.frequency, samples))?;
        queued += 1;
    }
    Ok(queued)
}

fn take_stream(ctx: &ContextInner, name: sys::ALuint) -> Option<StreamState> {
    ctx.state
        .borrow_mut()
        .sources
        .get_mut(&name)
        .and_then(|r| r.stream.take())
}

fn put_stream(ctx: &ContextInner, name: sys::ALuint, stream: StreamState) {
    if let Some(record) = ctx.state.borrow_mut().sources.get_mut(&name) {
        record.stream = Some(stream);
    }
}

pub(crate) fn play_stream(
    h: &Handle,
    decoder: Box<dyn Decoder>,
    chunk_len: usize,
    queue_size: usize,
) -> AlResult<()> {
    check(h)?;
    if chunk_len == 0 {
        return Err(AlError::validation("chunk length", chunk_len));
    }
    if queue_size == 0 {
        return Err(AlError::validation("queue size", queue_size));
    }
    if decoder.frequency() == 0 {
        return Err(AlError::validation("decoder frequency", decoder.frequency()));
    }
    source_ffi::reserve_voice(h)?;
    h.engine(|d, c, s| d.stop_source(c, s))?;
    source_ffi::release(&h.ctx, h.name)?;

    let looping = h.engine(|d, c, s| d.source_props(c, s))?.looping;
    let mut stream = StreamState::new(decoder, chunk_len, queue_size);
    let queued = fill(&h.ctx, h.name, &mut stream, 0, looping)?;
    if queued == 0 {
        return Err(AlError::state("the decoder produced no audio"));
    }
    tracing::debug!(
        context = h.ctx.name,
        source = h.name,
        chunk_len,
        queue_size,
        frequency = stream.frequency,
        "stream started"
    );
    put_stream(&h.ctx, h.name, stream);
    h.engine(|d, c, s| d.play_source(c, s))
}

/// Refills one source's queue. A stream whose source stopped keeps its
/// decoder until the stop event releases it.
fn refill(ctx: &ContextInner, name: sys::ALuint) -> AlResult<()> {
    let Some(mut stream) = take_stream(ctx, name) else {
        return Ok(());
    };
    let res = (|| -> AlResult<()> {
        let (processed, queued) = ctx.engine(|d, c| d.unqueue_processed(c, name))?;
        let looping = ctx.engine(|d, c| d.source_props(c, name))?.looping;
        if processed > 0 {
            tracing::trace!(context = ctx.name, source = name, processed, queued, "stream chunks played");
        }
        fill(ctx, name, &mut stream, queued, looping).map(|_| ())
    })();
    put_stream(ctx, name, stream);
    res
}

pub(crate) fn refill_all(ctx: &ContextInner) -> AlResult<()> {
    let names: Vec<sys::ALuint> = ctx
        .state
        .borrow()
        .sources
        .iter()
        .filter(|(_, r)| r.stream.is_some())
        .map(|(name, _)| *name)
        .collect();
    for name in names {
        refill(ctx, name)?;
    }
    Ok(())
}

/// Decoder position of a streaming source. Past a loop end the position
/// wraps back into the loop.
pub(crate) fn offset(h: &Handle, engine_offset: u64) -> AlResult<u64> {
    let state = h.ctx.state.borrow();
    let Some(stream) = state.sources.get(&h.name).and_then(|r| r.stream.as_ref()) else {
        return Ok(engine_offset);
    };
    let position = stream.origin + engine_offset;
    let (start, end) = stream.decoder.loop_points();
    if end > start && position >= end {
        Ok(start + (position - start) % (end - start))
    } else {
        Ok(position)
    }
}

/// Seeks the decoder and rebuilds the queue, keeping the play state.
pub(crate) fn seek(h: &Handle, frames: u64) -> AlResult<()> {
    let Some(mut stream) = take_stream(&h.ctx, h.name) else {
        return Err(AlError::state("no stream is attached"));
    };
    let res = (|| -> AlResult<()> {
        let length = stream.decoder.length();
        if length > 0 && frames >= length {
            return Err(AlError::state(format!(
                "offset {frames} is past the end of the stream ({length} frames)"
            )));
        }
        let was = source_ffi::engine_state(&h.ctx, h.name)?;
        let looping = h.engine(|d, c, s| d.source_props(c, s))?.looping;
        if !stream.decoder.seek(frames) {
            return Err(AlError::state("the decoder cannot seek"));
        }
        h.engine(|d, c, s| d.stop_source(c, s))?;
        h.engine(|d, c, s| d.clear_source_queue(c, s))?;
        stream.origin = frames;
        stream.eof = false;
        fill(&h.ctx, h.name, &mut stream, 0, looping)?;
        match was {
            PlayState::Playing => h.engine(|d, c, s| d.play_source(c, s)),
            PlayState::Paused => {
                h.engine(|d, c, s| d.play_source(c, s))?;
                h.engine(|d, c, s| d.pause_source(c, s))
            }
            _ => Ok(()),
        }
    })();
    put_stream(&h.ctx, h.name, stream);
    res
}
