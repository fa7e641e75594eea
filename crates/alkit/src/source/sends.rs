//! Direct-path and auxiliary-send filtering.
use crate::{context::inner::Handle, effect::slot::AuxiliaryEffectSlot, validate, AlResult};

/// Low/high-shelf filter gains. Send filters keep each gain in `[0, 1]`;
/// the direct filter only requires them to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub gain: f32,
    pub gain_hf: f32,
    pub gain_lf: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

impl FilterParams {
    pub const fn new(gain: f32, gain_hf: f32, gain_lf: f32) -> Self {
        Self {
            gain,
            gain_hf,
            gain_lf,
        }
    }

    pub(crate) fn validate(&self, field: &'static str) -> AlResult<()> {
        validate::filter_gains(field, (*self).into())
    }
}

impl From<FilterParams> for [f32; 3] {
    fn from(v: FilterParams) -> Self {
        [v.gain, v.gain_hf, v.gain_lf]
    }
}

impl From<(f32, f32, f32)> for FilterParams {
    fn from((gain, gain_hf, gain_lf): (f32, f32, f32)) -> Self {
        Self::new(gain, gain_hf, gain_lf)
    }
}

/// One auxiliary send of a source: an effect slot and the filter applied on
/// the way to it. Both are write-only.
///
/// ```compile_fail
/// # use alkit::prelude::*;
/// # fn main() -> alkit::AlResult<()> {
/// # let device = Device::open_default()?;
/// # let context = device.create_context()?;
/// # let _current = context.activate()?;
/// let source = Source::new()?;
/// let slot = source.send(0)?.effect();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SourceSend<'a> {
    source: &'a Handle,
    index: u32,
}

impl SourceSend<'_> {
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Routes the send into `slot`, or disconnects it with `None`.
    pub fn set_effect(&self, slot: Option<&AuxiliaryEffectSlot>) -> AlResult<()> {
        send_ffi::set_effect(self.source, self.index, slot)
    }

    pub fn set_filter(&self, filter: FilterParams) -> AlResult<()> {
        send_ffi::set_filter(self.source, self.index, filter)
    }
}

pub(crate) mod send_ffi {
    use crate::{
        context::inner::Handle,
        effect::slot::{slot_ffi, AuxiliaryEffectSlot},
        source::{
            sends::{FilterParams, SourceSend},
            source_ffi,
        },
        validate, AlResult,
    };

    pub fn send(source: &Handle, index: usize) -> AlResult<SourceSend<'_>> {
        source_ffi::check(source)?;
        validate::index(index, source.ctx.max_sends as usize)?;
        Ok(SourceSend {
            source,
            index: index as u32,
        })
    }

    pub fn set_effect(
        source: &Handle,
        index: u32,
        slot: Option<&AuxiliaryEffectSlot>,
    ) -> AlResult<()> {
        source_ffi::check(source)?;
        let slot = match slot {
            Some(slot) => {
                let h = slot_ffi::handle(slot);
                slot_ffi::check(h)?;
                Some(h.name)
            }
            None => None,
        };
        source.engine(|d, c, s| d.set_source_send_slot(c, s, index, slot))?;

        let mut guard = source.ctx.state.borrow_mut();
        let state = &mut *guard;
        let previous = state
            .sources
            .get_mut(&source.name)
            .and_then(|r| r.sends.get_mut(index as usize))
            .and_then(|send| std::mem::replace(send, slot));
        if let Some(record) = previous.and_then(|p| state.slots.get_mut(&p)) {
            record.sends.remove(&(source.name, index));
        }
        if let Some(record) = slot.and_then(|s| state.slots.get_mut(&s)) {
            record.sends.insert((source.name, index));
        }
        Ok(())
    }

    pub fn set_filter(source: &Handle, index: u32, filter: FilterParams) -> AlResult<()> {
        source_ffi::check(source)?;
        filter.validate("send filter")?;
        source.engine(|d, c, s| d.set_source_send_filter(c, s, index, filter.into()))
    }
}
