//! Arcade cabinet I/O board firmware for the STM32F102RB.
//!
//! Reads up to 34 panel switches and presents them to the host as one of:
//!
//! - two USB HID joysticks (`mode-joystick`, default)
//! - a USB HID keyboard (`mode-keyboard`, optionally `keyboard-6kro`)
//! - a JVS I/O board on USART1 (`mode-jvs`)
//!
//! # Architecture
//!
//! The firmware uses the Embassy async runtime:
//!
//! - **USB Task**: runs the USB device stack and the vendor control handler
//! - **Reset Task**: reboots (optionally into the ROM bootloader) on request
//! - **Main loop**: polls the [`Pipeline`](arcade_core::Pipeline) once per
//!   iteration and applies host config changes between polls
//!
//! The switch-to-function table lives in the last 2 KiB of flash and is
//! edited over vendor control requests (see [`arcade_core::vendor`]).
//!
//! # Modules
//!
//! - [`board`]: pin table and fixed parameters
//! - [`gpio_bank`]: switch inputs ([`GpioBank`])
//! - [`flash_storage`]: config storage on internal flash ([`FlashStorage`])
//! - [`usb_output`]: HID descriptors and [`HidTransport`]
//! - [`jvs_serial`]: JVS UART transport and sense line
//! - [`vendor_handler`]: vendor control requests
//! - [`reset`]: deliberate reboots
//! - [`leds`]: activity LEDs
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent reset)

#![no_std]

#[cfg(not(any(
    feature = "mode-joystick",
    feature = "mode-keyboard",
    feature = "mode-jvs"
)))]
compile_error!("Enable one output mode: `mode-joystick`, `mode-keyboard` or `mode-jvs`");

#[cfg(any(
    all(feature = "mode-joystick", feature = "mode-keyboard"),
    all(feature = "mode-joystick", feature = "mode-jvs"),
    all(feature = "mode-keyboard", feature = "mode-jvs"),
))]
compile_error!("Output mode features are mutually exclusive - use --no-default-features to pick a non-default mode");

pub mod board;
pub mod flash_storage;
pub mod gpio_bank;
pub mod jvs_serial;
pub mod leds;
pub mod reset;
pub mod usb_output;
pub mod vendor_handler;

pub use flash_storage::FlashStorage;
pub use gpio_bank::GpioBank;
pub use jvs_serial::{JvsSerial, SenseLine};
pub use leds::Leds;
pub use reset::{reset_task, BoardReset};
pub use usb_output::{HidTransport, UsbDriver};
pub use vendor_handler::VendorHandler;

use arcade_core::OutputMode;

/// Output mode selected by the build features.
#[must_use]
pub fn output_mode() -> OutputMode {
    #[cfg(feature = "mode-joystick")]
    return OutputMode::Joystick(arcade_core::JoystickEncoder::DUAL);

    #[cfg(all(feature = "mode-keyboard", not(feature = "keyboard-6kro")))]
    return OutputMode::Keyboard(arcade_core::KeyboardEncoder::NKRO_104);

    #[cfg(feature = "keyboard-6kro")]
    return OutputMode::Keyboard(arcade_core::KeyboardEncoder::BOOT_6KRO);

    #[cfg(feature = "mode-jvs")]
    return OutputMode::Jvs(arcade_core::JvsConfig::DEFAULT);
}
