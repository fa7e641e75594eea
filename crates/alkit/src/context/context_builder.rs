use std::time::Duration;

use crate::{
    context::{context_ffi, Context},
    device::Device,
    AlResult,
};

/// Creation attributes of a [`Context`].
///
/// ```
/// # use std::time::Duration;
/// # use alkit::prelude::*;
/// # fn main() -> alkit::AlResult<()> {
/// let device = Device::open_default()?;
/// let context = ContextBuilder::new(&device)
///     .max_voices(32)
///     .hrtf(true)
///     .async_wake_interval(Duration::from_millis(50))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ContextBuilder<'d> {
    pub(crate) device: &'d Device,
    pub(crate) max_voices: usize,
    pub(crate) hrtf: bool,
    pub(crate) async_wake_interval: Duration,
}

impl<'d> ContextBuilder<'d> {
    pub fn new(device: &'d Device) -> Self {
        Self {
            device,
            max_voices: 256,
            hrtf: false,
            async_wake_interval: Duration::ZERO,
        }
    }

    /// Maximum number of simultaneously playing or paused sources. Must be at
    /// least 1.
    pub fn max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices;
        self
    }

    pub fn hrtf(mut self, enabled: bool) -> Self {
        self.hrtf = enabled;
        self
    }

    pub fn async_wake_interval(mut self, interval: Duration) -> Self {
        self.async_wake_interval = interval;
        self
    }

    pub fn build(self) -> AlResult<Context<'d>> {
        context_ffi::context_init(self)
    }
}
