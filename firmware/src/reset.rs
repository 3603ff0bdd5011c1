//! Deliberate reboots requested over USB.

use arcade_core::{ResetControl, ResetKind};
use cortex_m::peripheral::SCB;
use defmt::info;
use embassy_stm32::gpio::Output;
use embassy_time::{block_for, Timer};

use crate::board::{BOOT_PIN_CHARGE, RESET_SETTLE};
use crate::vendor_handler::{RESET_REQUEST, SAVE_GUARD};

/// Resets the MCU, optionally with BOOT0 raised so it starts in the ROM
/// bootloader.
pub struct BoardReset {
    boot0: Output<'static>,
}

impl BoardReset {
    /// `boot0` must start low so a normal reset boots the application.
    pub fn new(boot0: Output<'static>) -> Self {
        Self { boot0 }
    }
}

impl ResetControl for BoardReset {
    fn reset(&mut self, kind: ResetKind) -> ! {
        if kind == ResetKind::Bootloader {
            self.boot0.set_high();
            block_for(BOOT_PIN_CHARGE);
        }
        SCB::sys_reset()
    }
}

/// Wait for a reset request, let the control transfer finish, then reboot.
#[embassy_executor::task]
pub async fn reset_task(mut control: BoardReset) {
    let kind = RESET_REQUEST.wait().await;
    Timer::after(RESET_SETTLE).await;
    // A config command may have been queued after the request
    while SAVE_GUARD.is_busy() {
        Timer::after_millis(1).await;
    }
    info!("rebooting: {}", kind);
    control.reset(kind)
}
