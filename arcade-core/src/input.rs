//! Switch input description and the GPIO read seam.

use arcade_proto::Level;

/// Opaque handle the [`PinBank`] uses to find a physical pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinHandle(pub u8);

/// One physical switch on the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogicalInput {
    /// Player the switch belongs to (0-based).
    pub player: u8,
    /// Silkscreen slot within the player's harness.
    pub slot: u8,
    /// Pressed reads as [`Level::Low`].
    pub active_low: bool,
    pub pin: PinHandle,
}

impl LogicalInput {
    /// Active-low switch (pull-up, closes to ground).
    #[must_use]
    pub const fn active_low(player: u8, slot: u8, pin: PinHandle) -> Self {
        Self {
            player,
            slot,
            active_low: true,
            pin,
        }
    }

    /// Whether `level` means pressed for this switch.
    #[inline]
    #[must_use]
    pub const fn is_pressed(&self, level: Level) -> bool {
        match level {
            Level::Low => self.active_low,
            Level::High => !self.active_low,
        }
    }
}

/// Raw GPIO access.
///
/// Implemented by the board support code over whatever HAL owns the pins.
/// Reads must not block.
pub trait PinBank {
    /// Sample the current level of `pin`.
    fn read(&mut self, pin: PinHandle) -> Level;
}
