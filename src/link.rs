use usb_device::bus::UsbBus;
use usb_device::device::UsbDevice;

/// The host-visible side of the disk.
///
/// Disconnecting makes the drive disappear and reappear on the host. It is
/// the only way to tell the host that a transfer is over, whether it
/// succeeded or not.
pub trait HostLink {
    /// Error returned when the link could not be reset.
    type Error;

    /// Tear down and re-establish the mass storage session.
    fn disconnect(&mut self) -> Result<(), Self::Error>;
}

impl<B: UsbBus> HostLink for UsbDevice<'_, B> {
    type Error = usb_device::UsbError;

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.force_reset()
    }
}
