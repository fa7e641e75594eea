use crate::{
    device::{device_ffi, Device},
    sys, AlError, AlResult,
};

/// Open attributes of a [`Device`].
///
/// ```
/// # use alkit::prelude::*;
/// # fn main() -> alkit::AlResult<()> {
/// let device = DeviceBuilder::new()
///     .frequency(48000)
///     .max_auxiliary_sends(2)
///     .build()?;
/// assert_eq!(device.frequency()?, 48000);
/// # Ok(())
/// # }
/// ```
pub struct DeviceBuilder {
    inner: sys::DeviceAttrs,
    name: Option<String>,
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBuilder {
    pub fn new() -> Self {
        Self {
            inner: sys::DeviceAttrs::default(),
            name: None,
        }
    }

    /// Device to open. Empty selects the default device.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Output sample rate in Hz. Must be non-zero.
    pub fn frequency(mut self, frequency: u32) -> Self {
        self.inner.frequency = frequency;
        self
    }

    /// Number of auxiliary sends per source.
    pub fn max_auxiliary_sends(mut self, sends: u32) -> Self {
        self.inner.max_auxiliary_sends = sends;
        self
    }

    pub fn build(self) -> AlResult<Device> {
        if self.inner.frequency == 0 {
            return Err(AlError::validation("frequency", self.inner.frequency));
        }
        let raw = device_ffi::open(self.name.as_deref(), self.inner)?;
        Ok(Device::from_raw(raw))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::DeviceOps;

    #[test]
    fn test_device_builder_attrs() {
        let device = DeviceBuilder::new()
            .frequency(22050)
            .max_auxiliary_sends(1)
            .build()
            .unwrap();
        assert_eq!(device.frequency().unwrap(), 22050);
        assert_eq!(device.max_auxiliary_sends().unwrap(), 1);
    }

    #[test]
    fn test_device_builder_rejects_zero_frequency() {
        assert!(matches!(
            DeviceBuilder::new().frequency(0).build(),
            Err(AlError::Validation { .. })
        ));
    }
}
