use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, BTreeSet, HashMap},
    hash::{Hash, Hasher},
    rc::Rc,
    time::Duration,
};

use crate::{
    buffer::BufferEntry,
    context::{message::MessageHandler, registry},
    decoder::DecoderFactory,
    effect::slot::SlotRecord,
    source::{source_group::GroupRecord, SourceRecord},
    sys, AlError, AlRawResult, AlResult, ContextError,
};

/// Shared state behind every handle created against one context.
pub struct ContextInner {
    pub(crate) name: sys::ALuint,
    pub(crate) device: sys::SoftDevice,
    pub(crate) max_sends: u32,
    pub(crate) max_voices: usize,
    pub(crate) frequency: u32,
    pub(crate) handler: RefCell<Rc<dyn MessageHandler>>,
    pub(crate) state: RefCell<ContextState>,
    pub(crate) destroyed: Cell<bool>,
    /// Names for objects the engine does not know about (source groups).
    pub(crate) local_names: Cell<sys::ALuint>,
}

/// Object-model bookkeeping the engine does not track.
#[derive(Default)]
pub struct ContextState {
    pub(crate) sources: BTreeMap<sys::ALuint, SourceRecord>,
    pub(crate) groups: BTreeMap<sys::ALuint, GroupRecord>,
    pub(crate) buffers: HashMap<String, BufferEntry>,
    pub(crate) effects: BTreeSet<sys::ALuint>,
    pub(crate) slots: BTreeMap<sys::ALuint, SlotRecord>,
    pub(crate) decoders: Vec<(String, Rc<dyn DecoderFactory>)>,
    pub(crate) batch_depth: u32,
    pub(crate) async_wake_interval: Duration,
}

impl ContextState {
    /// Number of sources, groups, effects and slots still alive.
    pub(crate) fn live_objects(&self) -> usize {
        self.sources.len() + self.groups.len() + self.effects.len() + self.slots.len()
    }

    pub(crate) fn decoder_factories(&self) -> Vec<Rc<dyn DecoderFactory>> {
        self.decoders.iter().map(|(_, f)| f.clone()).collect()
    }
}

impl ContextInner {
    /// Fails unless this context is alive and on top of the calling thread's
    /// registry stack.
    pub(crate) fn require_current(self: &Rc<Self>) -> AlResult<()> {
        if self.destroyed.get() {
            return Err(ContextError::Destroyed.into());
        }
        match registry::current_inner() {
            None => Err(ContextError::NoCurrent.into()),
            Some(current) if Rc::ptr_eq(&current, self) => Ok(()),
            Some(_) => Err(ContextError::Mismatch.into()),
        }
    }

    #[inline]
    pub(crate) fn engine<T>(
        &self,
        f: impl FnOnce(&sys::SoftDevice, sys::ALuint) -> Result<T, sys::ALenum>,
    ) -> AlResult<T> {
        AlRawResult::resolve(f(&self.device, self.name))
    }

    pub(crate) fn next_local_name(&self) -> sys::ALuint {
        let name = self.local_names.get() + 1;
        self.local_names.set(name);
        name
    }

    /// The installed handler. Callers invoke it after releasing every borrow
    /// of the context state, so handlers may call back into the crate.
    pub(crate) fn handler(&self) -> Rc<dyn MessageHandler> {
        self.handler.borrow().clone()
    }
}

/// A named engine object owned by one context.
#[derive(Clone)]
pub struct Handle {
    pub(crate) ctx: Rc<ContextInner>,
    pub(crate) name: sys::ALuint,
}

impl Handle {
    pub(crate) fn new(ctx: Rc<ContextInner>, name: sys::ALuint) -> Self {
        Self { ctx, name }
    }

    /// Context alive, object alive (per `alive`), context current; in that
    /// order.
    pub(crate) fn check(
        &self,
        what: &'static str,
        alive: impl FnOnce(&ContextState, sys::ALuint) -> bool,
    ) -> AlResult<()> {
        if self.ctx.destroyed.get() {
            return Err(ContextError::Destroyed.into());
        }
        if !alive(&self.ctx.state.borrow(), self.name) {
            return Err(AlError::Destroyed(what));
        }
        self.ctx.require_current()
    }

    #[inline]
    pub(crate) fn engine<T>(
        &self,
        f: impl FnOnce(&sys::SoftDevice, sys::ALuint, sys::ALuint) -> Result<T, sys::ALenum>,
    ) -> AlResult<T> {
        AlRawResult::resolve(f(&self.ctx.device, self.ctx.name, self.name))
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.ctx, &other.ctx) && self.name == other.name
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ctx.name.hash(state);
        self.name.hash(state);
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("context", &self.ctx.name)
            .field("name", &self.name)
            .finish()
    }
}
