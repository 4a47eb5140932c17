//! Calls the managed side makes back into the native layer

use crate::{
    buffers::BufferAddress,
    error::Result,
    session::NativeCaptureSession,
};

use super::orientation::DeviceOrientation;

/// Outbound interface of the capture state machine
pub trait CameraBridge: Send + Sync {
    /// Ask the native layer for one photo
    fn request_photo(&self) -> Result<()>;

    /// Copy `len` bytes out of a published buffer
    fn read(&self, address: BufferAddress, len: usize) -> Result<Vec<u8>>;

    /// Hand a buffer back; called exactly once per accepted address
    fn release(&self, address: BufferAddress) -> Result<()>;

    fn set_device_orientation(&self, _orientation: DeviceOrientation) {}

    /// Drop cached native memory; returns buffers freed
    fn trim(&self) -> usize {
        0
    }

    fn shutdown(&self) {}

    /// True once for each photo the native layer cancelled without being
    /// able to post the failure
    fn take_abandoned_photo(&self) -> bool {
        false
    }
}

impl CameraBridge for NativeCaptureSession {
    fn request_photo(&self) -> Result<()> {
        NativeCaptureSession::request_photo(self)
    }

    fn read(&self, address: BufferAddress, len: usize) -> Result<Vec<u8>> {
        NativeCaptureSession::read(self, address, len)
    }

    fn release(&self, address: BufferAddress) -> Result<()> {
        NativeCaptureSession::release(self, address)
    }

    fn set_device_orientation(&self, orientation: DeviceOrientation) {
        NativeCaptureSession::set_device_orientation(self, orientation)
    }

    fn trim(&self) -> usize {
        NativeCaptureSession::trim(self)
    }

    fn shutdown(&self) {
        NativeCaptureSession::shutdown(self)
    }

    fn take_abandoned_photo(&self) -> bool {
        NativeCaptureSession::take_abandoned_photo(self)
    }
}
