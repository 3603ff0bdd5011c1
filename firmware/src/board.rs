//! Board wiring and fixed parameters.
//!
//! Switch inputs in harness order. Each player has 17 slots:
//!
//! | Slot | Function (default) | Player 1 | Player 2 |
//! |------|--------------------|----------|----------|
//! | 0 | Left | PC3 | PB0 |
//! | 1 | Down | PA0 | PC7 |
//! | 2 | Up | PA1 | PC6 |
//! | 3 | Right | PC2 | PB1 |
//! | 4..=15 | B1..B12 | PC1 PC0 PC15 PC14 PC13 PB9 PB8 PB7 PB6 PB5 PB4 PB3 | PA7 PC4 PC5 PB2 PB10 PB11 PB12 PB13 PB14 PB15 PC8 PC9 |
//! | 16 | Start | PA15 | PA6 |
//!
//! All switches close to ground against the internal pull-up.
//!
//! | Function | Pin |
//! |----------|-----|
//! | LED player 1 / player 2 | PC10 / PC11 |
//! | LED heartbeat (JVS: addressed) | PC12 |
//! | JVS USART1 TX / RX | PA9 / PA10 |
//! | JVS sense line | PA2 |
//! | BOOT0 control | PD2 |

use arcade_core::{LogicalInput, PinHandle, StorageRegion};
use arcade_proto::{MAX_PINS_PER_PLAYER, MAX_PLAYERS};
use embassy_time::Duration;

/// Switches wired to the board.
pub const INPUT_COUNT: usize = MAX_PLAYERS * MAX_PINS_PER_PLAYER;

/// Switch table; `PinHandle(i)` is element `i` of the GPIO bank.
pub const INPUTS: [LogicalInput; INPUT_COUNT] = {
    let mut inputs = [LogicalInput::active_low(0, 0, PinHandle(0)); INPUT_COUNT];
    let mut i = 0;
    while i < INPUT_COUNT {
        let player = (i / MAX_PINS_PER_PLAYER) as u8;
        let slot = (i % MAX_PINS_PER_PLAYER) as u8;
        inputs[i] = LogicalInput::active_low(player, slot, PinHandle(i as u8));
        i += 1;
    }
    inputs
};

/// Flash page size on the STM32F102xB.
pub const FLASH_PAGE_SIZE: u32 = 1024;

/// Last 2 KiB of the 128 KiB flash.
pub const CONFIG_REGION: StorageRegion = StorageRegion {
    addr: 0x1_F800,
    size: 2048,
};

pub const JVS_BAUDRATE: u32 = 115_200;

pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x572B;
pub const USB_MANUFACTURER: &str = "HIDO Project";

#[cfg(feature = "mode-joystick")]
pub const USB_PRODUCT: &str = "HIDO Arcade Joystick";
#[cfg(feature = "mode-keyboard")]
pub const USB_PRODUCT: &str = "HIDO Arcade Keyboard";
#[cfg(feature = "mode-jvs")]
pub const USB_PRODUCT: &str = "HIDO JVS Interface";

/// Delay before a requested reset so the control transfer can complete.
pub const RESET_SETTLE: Duration = Duration::from_millis(100);

/// Time BOOT0 is held high before resetting into the ROM bootloader.
pub const BOOT_PIN_CHARGE: Duration = Duration::from_millis(10);

/// Heartbeat LED half-period.
pub const HEARTBEAT: Duration = Duration::from_millis(500);

/// Release PA15, PB3 and PB4 from JTAG. SWD stays enabled.
pub fn disable_jtag() {
    use embassy_stm32::pac;

    pac::RCC.apb2enr().modify(|w| w.set_afioen(true));
    // SWJ_CFG = 0b010: JTAG-DP disabled, SW-DP enabled
    pac::AFIO.mapr().modify(|w| w.set_swj_cfg(0b010));
}
