//! USB HID report transport and descriptors.

use arcade_core::{Transport, TransportError};
use core::sync::atomic::{AtomicBool, Ordering};
use embassy_stm32::peripherals::USB;
use embassy_stm32::usb::Driver;
use embassy_usb::class::hid::HidWriter;
use embassy_usb::driver::EndpointError;
#[cfg(not(feature = "mode-jvs"))]
use embassy_usb::{
    class::hid::{Config, HidBootProtocol, HidSubclass, State},
    Builder,
};

/// USB driver type of this board.
pub type UsbDriver = Driver<'static, USB>;

/// Set by the USB control handler when the host selects a configuration.
pub static USB_CONFIGURED: AtomicBool = AtomicBool::new(false);

/// Two joysticks in one interface, report ids 1 and 2.
///
/// Per player: X and Y (0..255, center 127), 14 buttons and 2 padding bits.
/// Matches `JoystickEncoder::DUAL`.
pub const DUAL_JOYSTICK_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x04, // Usage (Joystick)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x02, //   Report Count (2)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x0E, //   Usage Maximum (Button 14)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x0E, //   Report Count (14)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x03, //   Input (Constant) - padding
    0xC0, // End Collection
    //
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x04, // Usage (Joystick)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x02, //   Report ID (2)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x02, //   Report Count (2)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x0E, //   Usage Maximum (Button 14)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x0E, //   Report Count (14)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x02, //   Report Count (2)
    0x81, 0x03, //   Input (Constant) - padding
    0xC0, // End Collection
];

/// Keyboard with one bit per usage 0x00..0x67. Matches
/// `KeyboardEncoder::NKRO_104`.
pub const BITMAP_KEYBOARD_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x05, 0x07, //   Usage Page (Keyboard/Keypad)
    0x19, 0xE0, //   Usage Minimum (Left Control)
    0x29, 0xE7, //   Usage Maximum (Right GUI)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute) - modifiers
    0x75, 0x08, //   Report Size (8)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x03, //   Input (Constant) - reserved
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x67, //   Usage Maximum (Keypad =)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x68, //   Report Count (104)
    0x81, 0x02, //   Input (Data, Variable, Absolute) - key bitmap
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (Num Lock)
    0x29, 0x05, //   Usage Maximum (Kana)
    0x95, 0x05, //   Report Count (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0x75, 0x03, //   Report Size (3)
    0x95, 0x01, //   Report Count (1)
    0x91, 0x03, //   Output (Constant) - padding
    0xC0, // End Collection
];

/// Largest input report of the selected mode, report id included.
#[cfg(feature = "mode-joystick")]
pub const REPORT_SIZE: usize = 5;
#[cfg(all(feature = "mode-keyboard", not(feature = "keyboard-6kro")))]
pub const REPORT_SIZE: usize = 15;
#[cfg(feature = "keyboard-6kro")]
pub const REPORT_SIZE: usize = 8;

/// Report descriptor for the selected mode.
#[cfg(feature = "mode-joystick")]
pub fn report_descriptor() -> &'static [u8] {
    DUAL_JOYSTICK_DESCRIPTOR
}

#[cfg(all(feature = "mode-keyboard", not(feature = "keyboard-6kro")))]
pub fn report_descriptor() -> &'static [u8] {
    BITMAP_KEYBOARD_DESCRIPTOR
}

#[cfg(feature = "keyboard-6kro")]
pub fn report_descriptor() -> &'static [u8] {
    use usbd_hid::descriptor::{KeyboardReport, SerializedDescriptor};
    KeyboardReport::desc()
}

/// USB HID report sink.
///
/// `N` is the largest input report the descriptor declares.
pub struct HidTransport<const N: usize> {
    writer: HidWriter<'static, UsbDriver, N>,
}

impl<const N: usize> HidTransport<N> {
    pub fn new(writer: HidWriter<'static, UsbDriver, N>) -> Self {
        Self { writer }
    }
}

impl<const N: usize> Transport for HidTransport<N> {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writer.write(bytes).await.map_err(|e| match e {
            EndpointError::Disabled => TransportError::Disconnected,
            EndpointError::BufferOverflow => TransportError::Io,
        })
    }

    fn is_configured(&self) -> bool {
        USB_CONFIGURED.load(Ordering::Acquire)
    }
}

/// Add the HID interface to the USB builder.
#[cfg(not(feature = "mode-jvs"))]
pub fn configure_usb_hid<const N: usize>(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
) -> HidWriter<'static, UsbDriver, N> {
    let config = Config {
        report_descriptor: report_descriptor(),
        request_handler: None,
        poll_ms: 1,
        max_packet_size: N as u16,
        #[cfg(feature = "keyboard-6kro")]
        hid_subclass: HidSubclass::Boot,
        #[cfg(feature = "keyboard-6kro")]
        hid_boot_protocol: HidBootProtocol::Keyboard,
        #[cfg(not(feature = "keyboard-6kro"))]
        hid_subclass: HidSubclass::No,
        #[cfg(not(feature = "keyboard-6kro"))]
        hid_boot_protocol: HidBootProtocol::None,
    };

    HidWriter::new(builder, state, config)
}
