//! Source groups.
//!
//! A [`SourceGroup`] scales the gain and pitch of its member sources and
//! drives them together with [`stop_all`](SourceGroupOps::stop_all),
//! [`pause_all`](SourceGroupOps::pause_all) and
//! [`resume_all`](SourceGroupOps::resume_all). A source belongs to at most one
//! group. Groups nest: a sub-group's effective gain and pitch are multiplied
//! by its parent's, and bulk operations reach sub-group members too.
//!
//! ```
//! # use alkit::prelude::*;
//! # fn main() -> alkit::AlResult<()> {
//! # let device = Device::open_default()?;
//! # let context = device.create_context()?;
//! # let _current = context.activate()?;
//! let music = SourceGroup::new()?;
//! let source = Source::new()?;
//! source.set_group(Some(music.as_group_ref()))?;
//! music.set_gain(0.5)?;
//! assert_eq!(music.sources()?, vec![source.to_source_ref()]);
//! # Ok(())
//! # }
//! ```
use std::collections::BTreeSet;

use crate::{
    context::inner::Handle,
    source::SourceRef,
    sys, AlResult,
};

pub(crate) struct GroupRecord {
    pub(crate) parent: Option<sys::ALuint>,
    pub(crate) gain: f32,
    pub(crate) pitch: f32,
    pub(crate) sources: BTreeSet<sys::ALuint>,
    pub(crate) children: BTreeSet<sys::ALuint>,
}

impl Default for GroupRecord {
    fn default() -> Self {
        Self {
            parent: None,
            gain: 1.0,
            pitch: 1.0,
            sources: BTreeSet::new(),
            children: BTreeSet::new(),
        }
    }
}

/// An owned source group. Dropping it destroys the group.
pub struct SourceGroup {
    handle: SourceGroupRef,
}

/// A non-owning view of a source group.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct SourceGroupRef {
    pub(crate) handle: Handle,
}

impl SourceGroup {
    /// Creates a group in the current context.
    pub fn new() -> AlResult<Self> {
        let handle = group_ffi::group_init()?;
        Ok(Self {
            handle: SourceGroupRef { handle },
        })
    }

    pub fn as_group_ref(&self) -> &SourceGroupRef {
        &self.handle
    }

    /// Removes every member and sub-group, then the group itself. Members
    /// keep playing with their own gain and pitch.
    pub fn destroy(&mut self) -> AlResult<()> {
        group_ffi::group_destroy(&self.handle.handle, true)
    }
}

impl Drop for SourceGroup {
    fn drop(&mut self) {
        if let Err(e) = group_ffi::group_destroy(&self.handle.handle, false) {
            tracing::warn!(group = self.handle.handle.name, error = %e, "source group drop failed");
        }
    }
}

impl std::fmt::Debug for SourceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SourceGroup").field(&self.handle.handle).finish()
    }
}

pub(crate) mod private_group {
    use super::*;

    pub trait GroupHandleProvider<T: ?Sized> {
        fn handle(t: &T) -> &Handle;
    }

    pub struct SourceGroupProvider;
    pub struct SourceGroupRefProvider;

    impl GroupHandleProvider<SourceGroup> for SourceGroupProvider {
        #[inline]
        fn handle(t: &SourceGroup) -> &Handle {
            &t.handle.handle
        }
    }

    impl GroupHandleProvider<SourceGroupRef> for SourceGroupRefProvider {
        #[inline]
        fn handle(t: &SourceGroupRef) -> &Handle {
            &t.handle
        }
    }

    pub fn handle<T: AsGroupHandle + ?Sized>(t: &T) -> &Handle {
        <T as AsGroupHandle>::__GroupProvider::handle(t)
    }
}

#[doc(hidden)]
pub trait AsGroupHandle {
    type __GroupProvider: private_group::GroupHandleProvider<Self>;
}

#[doc(hidden)]
impl AsGroupHandle for SourceGroup {
    type __GroupProvider = private_group::SourceGroupProvider;
}

#[doc(hidden)]
impl AsGroupHandle for SourceGroupRef {
    type __GroupProvider = private_group::SourceGroupRefProvider;
}

impl<T: AsGroupHandle + ?Sized> SourceGroupOps for T {}

pub trait SourceGroupOps: AsGroupHandle {
    fn to_group_ref(&self) -> SourceGroupRef {
        SourceGroupRef {
            handle: private_group::handle(self).clone(),
        }
    }

    fn gain(&self) -> AlResult<f32> {
        group_ffi::record(private_group::handle(self), |r| r.gain)
    }

    /// Multiplier on every member's gain, `>= 0`.
    fn set_gain(&self, gain: f32) -> AlResult<()> {
        group_ffi::set_scaling(private_group::handle(self), Some(gain), None)
    }

    fn pitch(&self) -> AlResult<f32> {
        group_ffi::record(private_group::handle(self), |r| r.pitch)
    }

    /// Multiplier on every member's pitch, `> 0`.
    fn set_pitch(&self, pitch: f32) -> AlResult<()> {
        group_ffi::set_scaling(private_group::handle(self), None, Some(pitch))
    }

    fn parent(&self) -> AlResult<Option<SourceGroupRef>> {
        let h = private_group::handle(self);
        let parent = group_ffi::record(h, |r| r.parent)?;
        Ok(parent.map(|name| SourceGroupRef {
            handle: Handle::new(h.ctx.clone(), name),
        }))
    }

    /// Nests this group under `parent`. Fails with
    /// [`AlError::State`](crate::AlError::State) if that would form a cycle.
    fn set_parent(&self, parent: Option<&SourceGroupRef>) -> AlResult<()> {
        group_ffi::set_parent(private_group::handle(self), parent.map(|p| &p.handle))
    }

    /// Direct members, in creation order.
    fn sources(&self) -> AlResult<Vec<SourceRef>> {
        let h = private_group::handle(self);
        let names = group_ffi::record(h, |r| r.sources.clone())?;
        Ok(names
            .into_iter()
            .map(|name| SourceRef::from_name(h.ctx.clone(), name))
            .collect())
    }

    fn sub_groups(&self) -> AlResult<Vec<SourceGroupRef>> {
        let h = private_group::handle(self);
        let names = group_ffi::record(h, |r| r.children.clone())?;
        Ok(names
            .into_iter()
            .map(|name| SourceGroupRef {
                handle: Handle::new(h.ctx.clone(), name),
            })
            .collect())
    }

    /// Force-stops every playing or paused member, including members of
    /// sub-groups.
    fn stop_all(&self) -> AlResult<()> {
        group_ffi::stop_all(private_group::handle(self))
    }

    fn pause_all(&self) -> AlResult<()> {
        group_ffi::for_each_member(private_group::handle(self), |d, c, s| d.pause_source(c, s))
    }

    fn resume_all(&self) -> AlResult<()> {
        group_ffi::for_each_member(private_group::handle(self), |d, c, s| d.resume_source(c, s))
    }
}

pub(crate) mod group_ffi {
    use std::collections::BTreeSet;

    use crate::{
        context::{
            inner::{ContextInner, ContextState, Handle},
            registry,
        },
        source::{
            source_ffi,
            source_group::{GroupRecord, SourceGroupRef},
            PlayState,
        },
        sys::{self, SourceProp},
        validate, AlError, AlResult, ContextError,
    };

    pub fn alive(state: &ContextState, name: sys::ALuint) -> bool {
        state.groups.contains_key(&name)
    }

    #[inline]
    pub fn check(h: &Handle) -> AlResult<()> {
        h.check("source group", alive)
    }

    pub fn group_init() -> AlResult<Handle> {
        let ctx = registry::current_inner().ok_or(ContextError::NoCurrent)?;
        ctx.require_current()?;
        let name = {
            let mut state = ctx.state.borrow_mut();
            let name = ctx.next_local_name();
            state.groups.insert(name, GroupRecord::default());
            name
        };
        tracing::trace!(context = ctx.name, group = name, "source group created");
        Ok(Handle::new(ctx, name))
    }

    pub fn record<T>(h: &Handle, f: impl FnOnce(&GroupRecord) -> T) -> AlResult<T> {
        check(h)?;
        let state = h.ctx.state.borrow();
        state
            .groups
            .get(&h.name)
            .map(f)
            .ok_or(AlError::Destroyed("source group"))
    }

    /// Product of gain and pitch from `group` up to the root.
    fn effective(state: &ContextState, group: Option<sys::ALuint>) -> (f32, f32) {
        let (mut gain, mut pitch) = (1.0, 1.0);
        let mut current = group;
        while let Some(record) = current.and_then(|g| state.groups.get(&g)) {
            gain *= record.gain;
            pitch *= record.pitch;
            current = record.parent;
        }
        (gain, pitch)
    }

    /// `root` and every group nested under it.
    fn subtree(state: &ContextState, root: sys::ALuint) -> Vec<sys::ALuint> {
        let mut out = vec![root];
        let mut i = 0;
        while i < out.len() {
            if let Some(record) = state.groups.get(&out[i]) {
                out.extend(record.children.iter().copied());
            }
            i += 1;
        }
        out
    }

    fn members(state: &ContextState, root: sys::ALuint) -> Vec<sys::ALuint> {
        let mut out = BTreeSet::new();
        for group in subtree(state, root) {
            if let Some(record) = state.groups.get(&group) {
                out.extend(record.sources.iter().copied());
            }
        }
        out.into_iter().collect()
    }

    fn push_scaling(ctx: &ContextInner, source: sys::ALuint, gain: f32, pitch: f32) -> AlResult<()> {
        ctx.engine(|d, c| d.set_source(c, source, SourceProp::GroupGain(gain)))?;
        ctx.engine(|d, c| d.set_source(c, source, SourceProp::GroupPitch(pitch)))
    }

    /// Re-applies effective scaling to every source under `root`.
    fn apply_scaling(ctx: &ContextInner, root: sys::ALuint) -> AlResult<()> {
        let updates: Vec<(sys::ALuint, f32, f32)> = {
            let state = ctx.state.borrow();
            let mut updates = Vec::new();
            for group in subtree(&state, root) {
                let (gain, pitch) = effective(&state, Some(group));
                if let Some(record) = state.groups.get(&group) {
                    updates.extend(record.sources.iter().map(|s| (*s, gain, pitch)));
                }
            }
            updates
        };
        for (source, gain, pitch) in updates {
            push_scaling(ctx, source, gain, pitch)?;
        }
        Ok(())
    }

    pub fn set_scaling(h: &Handle, gain: Option<f32>, pitch: Option<f32>) -> AlResult<()> {
        check(h)?;
        if let Some(gain) = gain {
            validate::non_negative("group gain", gain)?;
        }
        if let Some(pitch) = pitch {
            validate::positive("group pitch", pitch)?;
        }
        if let Some(record) = h.ctx.state.borrow_mut().groups.get_mut(&h.name) {
            record.gain = gain.unwrap_or(record.gain);
            record.pitch = pitch.unwrap_or(record.pitch);
        }
        apply_scaling(&h.ctx, h.name)
    }

    pub fn set_parent(h: &Handle, parent: Option<&Handle>) -> AlResult<()> {
        check(h)?;
        if let Some(parent) = parent {
            check(parent)?;
            let state = h.ctx.state.borrow();
            let mut current = Some(parent.name);
            while let Some(g) = current {
                if g == h.name {
                    return Err(AlError::state("a group cannot be nested under itself"));
                }
                current = state.groups.get(&g).and_then(|r| r.parent);
            }
        }
        {
            let mut state = h.ctx.state.borrow_mut();
            let new_parent = parent.map(|p| p.name);
            let old_parent = state
                .groups
                .get_mut(&h.name)
                .and_then(|r| std::mem::replace(&mut r.parent, new_parent));
            if let Some(record) = old_parent.and_then(|p| state.groups.get_mut(&p)) {
                record.children.remove(&h.name);
            }
            if let Some(record) = new_parent.and_then(|p| state.groups.get_mut(&p)) {
                record.children.insert(h.name);
            }
        }
        apply_scaling(&h.ctx, h.name)
    }

    pub fn source_group(source: &Handle) -> AlResult<Option<SourceGroupRef>> {
        source_ffi::check(source)?;
        let state = source.ctx.state.borrow();
        Ok(state
            .sources
            .get(&source.name)
            .and_then(|r| r.group)
            .map(|name| SourceGroupRef {
                handle: Handle::new(source.ctx.clone(), name),
            }))
    }

    /// Moves `source` out of its current group and into `group`.
    pub fn set_source_group(source: &Handle, group: Option<&SourceGroupRef>) -> AlResult<()> {
        source_ffi::check(source)?;
        if let Some(group) = group {
            check(&group.handle)?;
        }
        let new_group = group.map(|g| g.handle.name);
        let (gain, pitch) = {
            let mut state = source.ctx.state.borrow_mut();
            let old_group = state
                .sources
                .get_mut(&source.name)
                .and_then(|r| std::mem::replace(&mut r.group, new_group));
            if let Some(record) = old_group.and_then(|g| state.groups.get_mut(&g)) {
                record.sources.remove(&source.name);
            }
            if let Some(record) = new_group.and_then(|g| state.groups.get_mut(&g)) {
                record.sources.insert(source.name);
            }
            effective(&state, new_group)
        };
        push_scaling(&source.ctx, source.name, gain, pitch)
    }

    /// Drops a dying source from its group's member list.
    pub fn detach_source(ctx: &ContextInner, source: sys::ALuint) -> AlResult<()> {
        let mut state = ctx.state.borrow_mut();
        let group = state.sources.get_mut(&source).and_then(|r| r.group.take());
        if let Some(record) = group.and_then(|g| state.groups.get_mut(&g)) {
            record.sources.remove(&source);
        }
        Ok(())
    }

    pub fn stop_all(h: &Handle) -> AlResult<()> {
        check(h)?;
        let members = members(&h.ctx.state.borrow(), h.name);
        tracing::debug!(context = h.ctx.name, group = h.name, members = members.len(), "group stop");
        for source in members {
            let state = source_ffi::engine_state(&h.ctx, source)?;
            if matches!(state, PlayState::Playing | PlayState::Paused) {
                source_ffi::force_stop(&h.ctx, source)?;
            }
        }
        Ok(())
    }

    pub fn for_each_member(
        h: &Handle,
        f: impl Fn(&sys::SoftDevice, sys::ALuint, sys::ALuint) -> Result<(), sys::ALenum>,
    ) -> AlResult<()> {
        check(h)?;
        let members = members(&h.ctx.state.borrow(), h.name);
        for source in members {
            h.ctx.engine(|d, c| f(d, c, source))?;
        }
        Ok(())
    }

    pub fn group_destroy(h: &Handle, checked: bool) -> AlResult<()> {
        if checked {
            check(h)?;
        } else if h.ctx.destroyed.get() || !alive(&h.ctx.state.borrow(), h.name) {
            return Ok(());
        }
        let Some(record) = h.ctx.state.borrow_mut().groups.remove(&h.name) else {
            return Ok(());
        };
        {
            let mut state = h.ctx.state.borrow_mut();
            for source in &record.sources {
                if let Some(r) = state.sources.get_mut(source) {
                    r.group = None;
                }
            }
            for child in &record.children {
                if let Some(r) = state.groups.get_mut(child) {
                    r.parent = None;
                }
            }
            if let Some(r) = record.parent.and_then(|p| state.groups.get_mut(&p)) {
                r.children.remove(&h.name);
            }
        }
        for source in &record.sources {
            push_scaling(&h.ctx, *source, 1.0, 1.0)?;
        }
        for child in &record.children {
            apply_scaling(&h.ctx, *child)?;
        }
        tracing::trace!(context = h.ctx.name, group = h.name, "source group destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        context::{message::MessageHandler, ContextOps},
        source::{PlayState, Source, SourceOps},
        test_assets::mono_buffer,
        test_util::{assert_f32_eq, with_context},
        AlError, ContextError,
    };

    fn engine_scaling(source: &Source) -> (f32, f32) {
        let h = &source.as_source_ref().handle;
        let props = h
            .engine(|d, c, s| d.source_props(c, s))
            .expect("source props");
        (props.group_gain, props.group_pitch)
    }

    #[test]
    fn test_group_gain_and_pitch_ranges() {
        with_context(|_, _| {
            let group = SourceGroup::new()?;
            group.set_gain(0.0)?;
            group.set_gain(2.5)?;
            assert!(matches!(group.set_gain(-0.1), Err(AlError::Validation { .. })));
            assert_eq!(group.gain()?, 2.5);
            group.set_pitch(0.5)?;
            assert!(group.set_pitch(0.0).is_err());
            assert_eq!(group.pitch()?, 0.5);
            Ok(())
        });
    }

    #[test]
    fn test_membership_is_exclusive() {
        with_context(|_, _| {
            let g1 = SourceGroup::new()?;
            let g2 = SourceGroup::new()?;
            let source = Source::new()?;
            source.set_group(Some(g1.as_group_ref()))?;
            source.set_group(Some(g2.as_group_ref()))?;
            assert!(g1.sources()?.is_empty());
            assert_eq!(g2.sources()?, vec![source.to_source_ref()]);
            assert_eq!(source.group()?, Some(g2.to_group_ref()));
            source.set_group(None)?;
            assert!(g2.sources()?.is_empty());
            assert_eq!(source.group()?, None);
            Ok(())
        });
    }

    #[test]
    fn test_group_scaling_multiplies_through_parents() {
        with_context(|_, _| {
            let outer = SourceGroup::new()?;
            let inner = SourceGroup::new()?;
            inner.set_parent(Some(outer.as_group_ref()))?;
            let source = Source::new()?;
            source.set_group(Some(inner.as_group_ref()))?;
            outer.set_gain(0.5)?;
            inner.set_gain(0.5)?;
            inner.set_pitch(2.0)?;
            let (gain, pitch) = engine_scaling(&source);
            assert_f32_eq(gain, 0.25);
            assert_f32_eq(pitch, 2.0);
            assert_eq!(source.gain()?, 1.0);

            inner.set_parent(None)?;
            assert_f32_eq(engine_scaling(&source).0, 0.5);
            source.set_group(None)?;
            assert_eq!(engine_scaling(&source), (1.0, 1.0));
            Ok(())
        });
    }

    #[test]
    fn test_group_parent_cycle_is_rejected() {
        with_context(|_, _| {
            let a = SourceGroup::new()?;
            let b = SourceGroup::new()?;
            b.set_parent(Some(a.as_group_ref()))?;
            assert!(matches!(
                a.set_parent(Some(b.as_group_ref())),
                Err(AlError::State(_))
            ));
            assert!(a.set_parent(Some(a.as_group_ref())).is_err());
            assert_eq!(a.sub_groups()?, vec![b.to_group_ref()]);
            assert_eq!(b.parent()?, Some(a.to_group_ref()));
            Ok(())
        });
    }

    #[derive(Default)]
    struct ForceStops(RefCell<Vec<SourceRef>>);

    impl MessageHandler for ForceStops {
        fn source_force_stopped(&self, source: &SourceRef) {
            self.0.borrow_mut().push(source.clone());
        }
    }

    #[test]
    fn test_group_bulk_transport() {
        with_context(|_, ctx| {
            let stops = Rc::new(ForceStops::default());
            ctx.set_message_handler(stops.clone());
            let buffer = mono_buffer("group-bulk", 1000)?;
            let outer = SourceGroup::new()?;
            let inner = SourceGroup::new()?;
            inner.set_parent(Some(outer.as_group_ref()))?;
            let a = Source::new()?;
            let b = Source::new()?;
            let idle = Source::new()?;
            a.set_group(Some(outer.as_group_ref()))?;
            b.set_group(Some(inner.as_group_ref()))?;
            idle.set_group(Some(outer.as_group_ref()))?;
            a.play(&buffer)?;
            b.play(&buffer)?;

            outer.pause_all()?;
            assert!(a.paused()? && b.paused()?);
            outer.resume_all()?;
            assert!(a.playing()? && b.playing()?);
            outer.stop_all()?;
            assert_eq!(a.state()?, PlayState::Stopped);
            assert_eq!(b.state()?, PlayState::Stopped);
            assert_eq!(idle.state()?, PlayState::Initial);
            assert_eq!(
                *stops.0.borrow(),
                vec![a.to_source_ref(), b.to_source_ref()]
            );
            assert_eq!(buffer.source_count()?, 0);
            Ok(())
        });
    }

    #[test]
    fn test_group_destroy_detaches_members() {
        with_context(|_, _| {
            let mut group = SourceGroup::new()?;
            let child = SourceGroup::new()?;
            child.set_parent(Some(group.as_group_ref()))?;
            let source = Source::new()?;
            source.set_group(Some(group.as_group_ref()))?;
            group.set_gain(0.5)?;
            let view = group.to_group_ref();
            group.destroy()?;
            assert_eq!(source.group()?, None);
            assert_eq!(child.parent()?, None);
            assert_eq!(engine_scaling(&source), (1.0, 1.0));
            assert_eq!(view.gain(), Err(AlError::Destroyed("source group")));
            Ok(())
        });
    }

    #[test]
    fn test_group_requires_its_context() {
        let device = crate::test_util::test_device();
        let a = device.create_context().unwrap();
        let b = device.create_context().unwrap();
        let group = {
            let _guard = a.activate().unwrap();
            SourceGroup::new().unwrap()
        };
        let _guard = b.activate().unwrap();
        assert_eq!(
            group.set_gain(0.5),
            Err(AlError::Context(ContextError::Mismatch))
        );
        assert_eq!(
            group.stop_all(),
            Err(AlError::Context(ContextError::Mismatch))
        );
    }
}
