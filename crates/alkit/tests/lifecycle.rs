//! Create/destroy ordering across contexts, devices and voices.

mod common;

use std::rc::Rc;

use alkit::{prelude::*, ContextError};
use common::{silence_buffer, Recorder};

#[test]
fn test_context_destroy_refuses_live_children() {
    let device = Device::open_default().expect("device");
    let mut context = device.create_context().expect("context");
    let source = {
        let _current = context.activate().expect("activate");
        Source::new().expect("source")
    };
    assert!(matches!(context.destroy(), Err(AlError::State(_))));

    drop(source);
    context.destroy().expect("destroy");
    assert_eq!(
        context.activate().err(),
        Some(AlError::Context(ContextError::Destroyed))
    );
}

#[test]
fn test_dropping_context_orphans_children() {
    let device = Device::open_default().expect("device");
    let context = device.create_context().expect("context");
    let current = context.activate().expect("activate");
    let source = Source::new().expect("source");
    let group = SourceGroup::new().expect("group");
    drop(current);
    drop(context);

    assert_eq!(
        source.set_gain(0.5),
        Err(AlError::Context(ContextError::Destroyed))
    );
    assert_eq!(
        group.set_gain(0.5),
        Err(AlError::Context(ContextError::Destroyed))
    );
}

#[test]
fn test_mutation_under_other_context_fails() {
    let device = Device::open_default().expect("device");
    let a = device.create_context().expect("context");
    let b = device.create_context().expect("context");
    let (source, group, slot) = {
        let _current = a.activate().expect("activate");
        (
            Source::new().expect("source"),
            SourceGroup::new().expect("group"),
            AuxiliaryEffectSlot::new().expect("slot"),
        )
    };

    let _current = b.activate().expect("activate");
    let mismatch = Some(AlError::Context(ContextError::Mismatch));
    assert_eq!(source.set_pitch(2.0).err(), mismatch);
    assert_eq!(source.set_pitch(-2.0).err(), mismatch);
    assert_eq!(source.set_radius(1.0).err(), mismatch);
    assert_eq!(source.set_rolloff_factors((1.0, 1.0)).err(), mismatch);
    assert_eq!(source.send(0).err(), mismatch);
    assert_eq!(group.set_pitch(2.0).err(), mismatch);
    assert_eq!(slot.set_gain(0.5).err(), mismatch);
    assert_eq!(b.listener().set_gain(1.0), Ok(()));
}

#[test]
fn test_use_context_switches_without_scope() {
    let device = Device::open_default().expect("device");
    let a = device.create_context().expect("context");
    let b = device.create_context().expect("context");

    use_context(Some(a.as_context_ref())).expect("use a");
    let source = Source::new().expect("source");
    use_context(Some(b.as_context_ref())).expect("use b");
    assert_eq!(
        source.gain().err(),
        Some(AlError::Context(ContextError::Mismatch))
    );
    use_context(None).expect("clear");
    assert!(current_context().is_none());
    assert_eq!(
        source.gain().err(),
        Some(AlError::Context(ContextError::NoCurrent))
    );
    use_context(Some(a.as_context_ref())).expect("use a");
    assert_eq!(source.gain(), Ok(1.0));
    drop(source);
    use_context(None).expect("clear");
}

#[test]
fn test_priority_preemption() {
    let device = Device::open_default().expect("device");
    let context = ContextBuilder::new(&device)
        .max_voices(1)
        .build()
        .expect("context");
    let _current = context.activate().expect("activate");
    let recorder = Rc::new(Recorder::default());
    context.set_message_handler(recorder.clone());

    let buffer = silence_buffer("voice", 44100);
    let background = Source::new().expect("source");
    let alert = Source::new().expect("source");
    alert.set_priority(10).expect("priority");

    background.play(&buffer).expect("play background");
    alert.play(&buffer).expect("alert preempts");
    assert_eq!(
        *recorder.force_stopped.borrow(),
        vec![background.to_source_ref()]
    );
    assert_eq!(background.state().expect("state"), PlayState::Stopped);

    assert!(matches!(background.play(&buffer), Err(AlError::Resource(_))));
    assert!(alert.playing().expect("still playing"));
}

#[test]
fn test_device_disconnect_is_reported() {
    let device = Device::open_default().expect("device");
    let context = device.create_context().expect("context");
    let _current = context.activate().expect("activate");
    let recorder = Rc::new(Recorder::default());
    context.set_message_handler(recorder.clone());

    let buffer = silence_buffer("doomed", 44100);
    let source = buffer.play().expect("play");
    device.disconnect();
    assert!(!device.is_connected());

    context.update().expect("update");
    assert_eq!(recorder.disconnected.get(), 1);
    assert_eq!(source.state().expect("state"), PlayState::Stopped);
    assert_eq!(buffer.source_count().expect("count"), 0);
}

#[test]
fn test_handler_swap_takes_effect_immediately() {
    let device = Device::open_default().expect("device");
    let context = device.create_context().expect("context");
    let _current = context.activate().expect("activate");
    let first = Rc::new(Recorder::default());
    let second = Rc::new(Recorder::default());

    context.set_message_handler(first.clone());
    let buffer = silence_buffer("swap", 16);
    let source = buffer.play().expect("play");
    device.render(64);
    context.set_message_handler(second.clone());
    context.update().expect("update");

    assert!(first.stopped.borrow().is_empty());
    assert_eq!(*second.stopped.borrow(), vec![source.to_source_ref()]);
}

#[test]
fn test_device_closes_after_its_contexts() {
    let device = Device::open_default().expect("device");
    {
        let _context = device.create_context().expect("context");
    }
    device.close().expect("close");
}
