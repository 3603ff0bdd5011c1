//! Digital joystick HID report encoding.
//!
//! Report layout per player:
//!
//! ```text
//! [report_id] | x | y | buttons (LE, ceil(button_count / 8) bytes)
//! ```
//!
//! The id byte is present only when the paired descriptor declares report
//! ids. Button bits at or above `button_count` are always zero, which
//! covers any padding bits the descriptor adds to round up to a byte.

use crate::encode::{Encode, Report};
use arcade_proto::{ActionSet, AxisDir, Buttons, PlayerActions, MAX_PLAYERS};

/// Raw byte values for the three axis positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisRange {
    pub min: u8,
    pub center: u8,
    pub max: u8,
}

impl AxisRange {
    /// Logical 0..255, center 127.
    pub const UNSIGNED: Self = Self {
        min: 0,
        center: 127,
        max: 255,
    };

    /// Logical -127..127 as two's complement, center 0.
    pub const SIGNED: Self = Self {
        min: (-127i8) as u8,
        center: 0,
        max: 127,
    };

    #[inline]
    #[must_use]
    pub const fn value(&self, dir: AxisDir) -> u8 {
        match dir {
            AxisDir::Centered => self.center,
            AxisDir::Negative => self.min,
            AxisDir::Positive => self.max,
        }
    }
}

/// Joystick report layout, one report per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JoystickEncoder {
    /// Number of reports produced (one per player).
    pub players: u8,
    /// Report id of player 1; player `n` uses `base + n`. `None` omits the
    /// id byte.
    pub report_id_base: Option<u8>,
    pub axis: AxisRange,
    /// Buttons declared by the descriptor, at most 30.
    pub button_count: u8,
}

impl JoystickEncoder {
    /// Two players, report ids 1 and 2, unsigned axes, 14 buttons.
    pub const DUAL: Self = Self {
        players: 2,
        report_id_base: Some(1),
        axis: AxisRange::UNSIGNED,
        button_count: 14,
    };

    /// Size of each encoded report.
    #[must_use]
    pub const fn report_len(&self) -> usize {
        let id = if self.report_id_base.is_some() { 1 } else { 0 };
        id + 2 + self.button_bytes()
    }

    const fn button_count(&self) -> u8 {
        if self.button_count > Buttons::MAX_BUTTONS {
            Buttons::MAX_BUTTONS
        } else {
            self.button_count
        }
    }

    const fn button_bytes(&self) -> usize {
        (self.button_count() as usize).div_ceil(8)
    }

    /// Encode one player's report.
    #[must_use]
    pub fn encode_player(&self, player: u8, actions: &PlayerActions) -> Report {
        let mut report = Report::new();
        if let Some(base) = self.report_id_base {
            let _ = report.push(base.wrapping_add(player));
        }
        let _ = report.push(self.axis.value(actions.axes.x));
        let _ = report.push(self.axis.value(actions.axes.y));

        let buttons = actions.buttons.truncated(self.button_count()).raw();
        let _ = report.extend_from_slice(&buttons.to_le_bytes()[..self.button_bytes()]);
        report
    }
}

impl Default for JoystickEncoder {
    fn default() -> Self {
        Self::DUAL
    }
}

impl Encode for JoystickEncoder {
    fn report_count(&self) -> usize {
        usize::from(self.players).min(MAX_PLAYERS)
    }

    fn encode(&self, actions: &ActionSet, index: usize) -> Report {
        let idle = PlayerActions::IDLE;
        let player = actions.player(index).unwrap_or(&idle);
        self.encode_player(index as u8, player)
    }
}
