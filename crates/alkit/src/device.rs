//! Output devices.
//!
//! A [`Device`] is opened by name (the empty name selects the default) and
//! hosts any number of [`Context`]s. The engine renders on demand: call
//! [`DeviceOps::render`] to pull mixed frames, the poll-driven equivalent of a
//! hardware callback.
//!
//! ```
//! # use alkit::prelude::*;
//! # fn main() -> alkit::AlResult<()> {
//! let names = device_names();
//! let device = match Device::open("no such device") {
//!     Ok(device) => device,
//!     Err(_) => Device::open(&names.basic[0])?,
//! };
//! assert_eq!(device.name()?, names.basic[0]);
//! # Ok(())
//! # }
//! ```
use std::{cell::Cell, marker::PhantomData, time::Duration};

use crate::{
    context::{Context, ContextBuilder},
    sys, AlRawResult, AlResult,
};

pub mod device_builder;

pub use device_builder::DeviceBuilder;

/// An open output device. Dropping it closes the device.
pub struct Device {
    inner: sys::SoftDevice,
    closed: bool,
    _not_sync: PhantomData<Cell<()>>,
}

/// A view of a device, handed to message handlers.
#[derive(Clone, Debug)]
pub struct DeviceRef {
    inner: sys::SoftDevice,
}

impl DeviceRef {
    pub(crate) fn new(inner: sys::SoftDevice) -> Self {
        Self { inner }
    }
}

impl Device {
    /// Opens a device by name. The empty name opens the default device.
    pub fn open(name: &str) -> AlResult<Self> {
        DeviceBuilder::new().name(name).build()
    }

    pub fn open_default() -> AlResult<Self> {
        DeviceBuilder::new().build()
    }

    pub(crate) fn from_raw(inner: sys::SoftDevice) -> Self {
        Self {
            inner,
            closed: false,
            _not_sync: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn raw(&self) -> &sys::SoftDevice {
        &self.inner
    }

    /// Creates a context with default attributes. See [`ContextBuilder`].
    pub fn create_context(&self) -> AlResult<Context<'_>> {
        ContextBuilder::new(self).build()
    }

    pub fn as_device_ref(&self) -> DeviceRef {
        DeviceRef::new(self.inner.clone())
    }

    /// Closes the device.
    pub fn close(mut self) -> AlResult<()> {
        let res = device_ffi::close(&self.inner);
        self.closed = res.is_ok();
        res
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = device_ffi::close(&self.inner) {
            tracing::warn!(error = %e, "device drop failed to close");
        }
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("inner", &self.inner)
            .field("closed", &self.closed)
            .finish()
    }
}

pub(crate) mod private_device {
    use super::*;

    pub trait DeviceProvider<T: ?Sized> {
        fn raw(t: &T) -> &sys::SoftDevice;
    }

    pub struct OwnedProvider;
    pub struct RefProvider;

    impl DeviceProvider<Device> for OwnedProvider {
        #[inline]
        fn raw(t: &Device) -> &sys::SoftDevice {
            &t.inner
        }
    }

    impl DeviceProvider<DeviceRef> for RefProvider {
        #[inline]
        fn raw(t: &DeviceRef) -> &sys::SoftDevice {
            &t.inner
        }
    }

    pub fn device_raw<T: AsDeviceHandle + ?Sized>(t: &T) -> &sys::SoftDevice {
        <T as AsDeviceHandle>::__DeviceProvider::raw(t)
    }
}

#[doc(hidden)]
pub trait AsDeviceHandle {
    type __DeviceProvider: private_device::DeviceProvider<Self>;
}

#[doc(hidden)]
impl AsDeviceHandle for Device {
    type __DeviceProvider = private_device::OwnedProvider;
}

#[doc(hidden)]
impl AsDeviceHandle for DeviceRef {
    type __DeviceProvider = private_device::RefProvider;
}

impl<T: AsDeviceHandle + ?Sized> DeviceOps for T {}

/// Queries and controls shared by [`Device`] and [`DeviceRef`].
pub trait DeviceOps: AsDeviceHandle {
    fn name(&self) -> AlResult<String> {
        device_ffi::name(self)
    }

    /// `(major, minor)` of the device API.
    fn alc_version(&self) -> AlResult<(i32, i32)> {
        device_ffi::version(self, sys::ALC_MAJOR_VERSION, sys::ALC_MINOR_VERSION)
    }

    /// `(major, minor)` of the effects extension.
    fn efx_version(&self) -> AlResult<(i32, i32)> {
        device_ffi::version(self, sys::ALC_EFX_MAJOR_VERSION, sys::ALC_EFX_MINOR_VERSION)
    }

    /// Number of auxiliary sends every source of this device has.
    fn max_auxiliary_sends(&self) -> AlResult<u32> {
        device_ffi::integer(self, sys::ALC_MAX_AUXILIARY_SENDS).map(|v| v as u32)
    }

    /// Output sample rate in Hz.
    fn frequency(&self) -> AlResult<u32> {
        device_ffi::integer(self, sys::ALC_FREQUENCY).map(|v| v as u32)
    }

    fn hrtf_names(&self) -> AlResult<Vec<String>> {
        device_ffi::hrtf_names(self)
    }

    /// Whether any context on the device renders with HRTF.
    fn hrtf_enabled(&self) -> AlResult<bool> {
        device_ffi::integer(self, sys::ALC_HRTF_SOFT).map(|v| v != 0)
    }

    /// Time rendered so far. Frozen while DSP is paused.
    fn clock_time(&self) -> Duration {
        Duration::from_nanos(private_device::device_raw(self).clock_time())
    }

    fn is_connected(&self) -> bool {
        private_device::device_raw(self).is_connected()
    }

    /// Stops rendering; [`render`](DeviceOps::render) returns silence.
    fn pause_dsp(&self) -> AlResult<()> {
        AlRawResult::resolve(private_device::device_raw(self).pause_dsp())
    }

    fn resume_dsp(&self) -> AlResult<()> {
        AlRawResult::resolve(private_device::device_raw(self).resume_dsp())
    }

    /// Mixes `frames` frames of interleaved stereo output.
    fn render(&self, frames: usize) -> Vec<f32> {
        private_device::device_raw(self).render(frames)
    }

    /// Simulates losing the output. Every source stops and each context
    /// reports it from its next `update()`.
    fn disconnect(&self) {
        private_device::device_raw(self).disconnect()
    }
}

/// Available device names. The first entry of each list is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNames {
    pub basic: Vec<String>,
    pub full: Vec<String>,
    pub capture: Vec<String>,
}

impl DeviceNames {
    pub fn default_device(&self) -> Option<&str> {
        self.basic.first().map(String::as_str)
    }
}

pub fn device_names() -> DeviceNames {
    DeviceNames {
        basic: sys::enumerate(sys::DeviceEnumeration::Basic),
        full: sys::enumerate(sys::DeviceEnumeration::Full),
        capture: sys::enumerate(sys::DeviceEnumeration::Capture),
    }
}

pub(crate) mod device_ffi {
    use crate::{
        device::{private_device, AsDeviceHandle},
        sys, AlError, AlRawResult, AlResult,
    };

    pub fn open(name: Option<&str>, attrs: sys::DeviceAttrs) -> AlResult<sys::SoftDevice> {
        sys::SoftDevice::open(name, attrs).map_err(|code| match code {
            sys::ALC_INVALID_DEVICE => {
                AlError::resource(format!("no device named {:?}", name.unwrap_or_default()))
            }
            other => AlError::Engine(crate::AlStatus(other)),
        })
    }

    pub fn close(device: &sys::SoftDevice) -> AlResult<()> {
        device.close().map_err(|code| match code {
            sys::AL_INVALID_OPERATION => AlError::state("device still has contexts"),
            other => AlError::Engine(crate::AlStatus(other)),
        })
    }

    pub fn name<D: AsDeviceHandle + ?Sized>(device: &D) -> AlResult<String> {
        let raw = private_device::device_raw(device);
        // Closed devices fail every integer query.
        AlRawResult::resolve(raw.get_integer(sys::ALC_FREQUENCY))?;
        Ok(raw.name())
    }

    pub fn integer<D: AsDeviceHandle + ?Sized>(device: &D, param: sys::ALenum) -> AlResult<i32> {
        AlRawResult::resolve(private_device::device_raw(device).get_integer(param))
    }

    pub fn version<D: AsDeviceHandle + ?Sized>(
        device: &D,
        major: sys::ALenum,
        minor: sys::ALenum,
    ) -> AlResult<(i32, i32)> {
        Ok((integer(device, major)?, integer(device, minor)?))
    }

    pub fn hrtf_names<D: AsDeviceHandle + ?Sized>(device: &D) -> AlResult<Vec<String>> {
        integer(device, sys::ALC_FREQUENCY)?;
        Ok(private_device::device_raw(device).hrtf_names())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{test_util::test_device, AlError};

    #[test]
    fn test_device_open_default_and_by_name() {
        let names = device_names();
        let device = Device::open("").unwrap();
        assert_eq!(device.name().unwrap(), names.basic[0]);
        assert_eq!(names.default_device(), Some(names.basic[0].as_str()));
        let named = Device::open(&names.basic[1]).unwrap();
        assert_eq!(named.name().unwrap(), names.basic[1]);
    }

    #[test]
    fn test_device_open_unknown_is_resource_error() {
        assert!(matches!(
            Device::open("Hopefully this is not a real device name"),
            Err(AlError::Resource(_))
        ));
    }

    #[test]
    fn test_device_names_lists() {
        let names = device_names();
        assert!(!names.basic.is_empty());
        assert_eq!(names.basic.len(), names.full.len());
        assert!(!names.capture.is_empty());
    }

    #[test]
    fn test_device_versions_and_caps() {
        let device = test_device();
        assert_eq!(device.alc_version().unwrap(), (1, 1));
        assert_eq!(device.efx_version().unwrap(), (1, 0));
        assert_eq!(device.max_auxiliary_sends().unwrap(), 4);
        assert_eq!(device.frequency().unwrap(), 44100);
        assert!(!device.hrtf_names().unwrap().is_empty());
    }

    #[test]
    fn test_device_clock_pause_resume() {
        let device = test_device();
        device.render(441);
        assert_eq!(device.clock_time(), Duration::from_millis(10));
        device.pause_dsp().unwrap();
        device.render(441);
        assert_eq!(device.clock_time(), Duration::from_millis(10));
        device.resume_dsp().unwrap();
        device.render(441);
        assert_eq!(device.clock_time(), Duration::from_millis(20));
    }

    #[test]
    fn test_device_close() {
        let device = test_device();
        let view = device.as_device_ref();
        device.close().unwrap();
        assert!(view.name().is_err());
    }
}
