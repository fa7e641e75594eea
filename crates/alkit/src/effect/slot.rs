//! Auxiliary effect slots: the buses sources send into.
use std::collections::BTreeSet;

use crate::{
    context::inner::Handle,
    effect::{Effect, EffectType},
    source::SourceRef,
    sys, AlResult,
};

/// Source sends routed into one slot, as `(source, send index)`.
#[derive(Default)]
pub(crate) struct SlotRecord {
    pub(crate) sends: BTreeSet<(sys::ALuint, u32)>,
}

/// An owned auxiliary effect slot. Dropping it disconnects every send still
/// routed into it and destroys the slot.
pub struct AuxiliaryEffectSlot {
    handle: Handle,
}

impl AuxiliaryEffectSlot {
    /// Creates a slot holding the null effect in the current context.
    pub fn new() -> AlResult<Self> {
        Ok(Self {
            handle: slot_ffi::slot_init()?,
        })
    }

    /// Copies the parameters of `effect` into the slot. Later changes to the
    /// effect need another `apply_effect`. `None` loads the null effect.
    pub fn apply_effect(&self, effect: Option<&Effect>) -> AlResult<()> {
        slot_ffi::apply_effect(&self.handle, effect)
    }

    pub fn effect_type(&self) -> AlResult<EffectType> {
        slot_ffi::info(&self.handle).map(|(_, _, kind)| EffectType::from_raw(kind))
    }

    pub fn gain(&self) -> AlResult<f32> {
        slot_ffi::info(&self.handle).map(|(gain, _, _)| gain)
    }

    /// Output gain of the slot, `[0, 1]`.
    pub fn set_gain(&self, gain: f32) -> AlResult<()> {
        slot_ffi::check(&self.handle)?;
        crate::validate::in_range("slot gain", gain, 0.0, 1.0)?;
        self.handle.engine(|d, c, s| d.set_slot_gain(c, s, gain))
    }

    pub fn send_auto(&self) -> AlResult<bool> {
        slot_ffi::info(&self.handle).map(|(_, send_auto, _)| send_auto)
    }

    /// Whether the engine adjusts send levels for distance automatically.
    pub fn set_send_auto(&self, send_auto: bool) -> AlResult<()> {
        slot_ffi::check(&self.handle)?;
        self.handle
            .engine(|d, c, s| d.set_slot_send_auto(c, s, send_auto))
    }

    /// Number of source sends routed into the slot.
    pub fn use_count(&self) -> AlResult<usize> {
        slot_ffi::check(&self.handle)?;
        Ok(slot_ffi::sends(&self.handle).len())
    }

    /// The `(source, send index)` pairs routed into the slot.
    pub fn source_sends(&self) -> AlResult<Vec<(SourceRef, u32)>> {
        slot_ffi::check(&self.handle)?;
        Ok(slot_ffi::sends(&self.handle)
            .into_iter()
            .map(|(source, index)| (SourceRef::from_name(self.handle.ctx.clone(), source), index))
            .collect())
    }

    /// Fails with [`AlError::State`](crate::AlError::State) while any send is
    /// routed into the slot.
    pub fn destroy(&mut self) -> AlResult<()> {
        slot_ffi::slot_destroy(&self.handle, true)
    }
}

impl Drop for AuxiliaryEffectSlot {
    fn drop(&mut self) {
        if let Err(e) = slot_ffi::slot_destroy(&self.handle, false) {
            tracing::warn!(slot = self.handle.name, error = %e, "effect slot drop failed");
        }
    }
}

impl std::fmt::Debug for AuxiliaryEffectSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuxiliaryEffectSlot").field(&self.handle).finish()
    }
}

pub(crate) mod slot_ffi {
    use std::rc::Rc;

    use crate::{
        context::{
            inner::{ContextState, Handle},
            registry,
        },
        effect::{effect_ffi, slot::{AuxiliaryEffectSlot, SlotRecord}, Effect},
        sys, AlError, AlResult, ContextError,
    };

    pub fn handle(slot: &AuxiliaryEffectSlot) -> &Handle {
        &slot.handle
    }

    pub fn alive(state: &ContextState, name: sys::ALuint) -> bool {
        state.slots.contains_key(&name)
    }

    #[inline]
    pub fn check(h: &Handle) -> AlResult<()> {
        h.check("effect slot", alive)
    }

    pub fn slot_init() -> AlResult<Handle> {
        let ctx = registry::current_inner().ok_or(ContextError::NoCurrent)?;
        ctx.require_current()?;
        let name = ctx.engine(|d, c| d.create_slot(c))?;
        ctx.state
            .borrow_mut()
            .slots
            .insert(name, SlotRecord::default());
        tracing::trace!(context = ctx.name, slot = name, "effect slot created");
        Ok(Handle::new(ctx, name))
    }

    pub fn info(h: &Handle) -> AlResult<(f32, bool, sys::ALenum)> {
        check(h)?;
        h.engine(|d, c, s| d.slot_info(c, s))
    }

    pub fn sends(h: &Handle) -> Vec<(sys::ALuint, u32)> {
        h.ctx
            .state
            .borrow()
            .slots
            .get(&h.name)
            .map(|r| r.sends.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn apply_effect(h: &Handle, effect: Option<&Effect>) -> AlResult<()> {
        check(h)?;
        let effect = match effect {
            Some(effect) => {
                let e = effect_ffi::handle(effect);
                effect_ffi::check(e)?;
                if !Rc::ptr_eq(&e.ctx, &h.ctx) {
                    return Err(ContextError::Mismatch.into());
                }
                Some(e.name)
            }
            None => None,
        };
        h.engine(|d, c, s| d.set_slot_effect(c, s, effect))
    }

    /// With `checked == false` (drop path) sends still routed into the slot
    /// are disconnected first.
    pub fn slot_destroy(h: &Handle, checked: bool) -> AlResult<()> {
        if checked {
            check(h)?;
            let in_use = sends(h).len();
            if in_use > 0 {
                return Err(AlError::state(format!(
                    "effect slot is used by {in_use} source sends"
                )));
            }
        } else if h.ctx.destroyed.get() || !alive(&h.ctx.state.borrow(), h.name) {
            return Ok(());
        }
        let record = h.ctx.state.borrow_mut().slots.remove(&h.name);
        for (source, index) in record.map(|r| r.sends).unwrap_or_default() {
            h.ctx
                .engine(|d, c| d.set_source_send_slot(c, source, index, None))?;
            if let Some(send) = h
                .ctx
                .state
                .borrow_mut()
                .sources
                .get_mut(&source)
                .and_then(|r| r.sends.get_mut(index as usize))
            {
                *send = None;
            }
        }
        tracing::trace!(context = h.ctx.name, slot = h.name, "effect slot destroyed");
        h.engine(|d, c, s| d.delete_slot(c, s))
    }
}
