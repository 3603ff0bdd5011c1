//! Player actions to JVS switch words.
//!
//! Each player word is sent most significant byte first:
//!
//! ```text
//! bit 15 START | 14 SERVICE | 13 UP | 12 DOWN | 11 LEFT | 10 RIGHT | 9..0 PUSH1..PUSH10
//! ```

use crate::encode::{Encode, Report};
use arcade_proto::{ActionSet, AxisDir, PlayerActions, MAX_PLAYERS};
use jvs_proto::JvsIo;

const START_BIT: u16 = 1 << 15;
const SERVICE_BIT: u16 = 1 << 14;
const UP_BIT: u16 = 1 << 13;
const DOWN_BIT: u16 = 1 << 12;
const LEFT_BIT: u16 = 1 << 11;
const RIGHT_BIT: u16 = 1 << 10;
const PUSH_BUTTONS: u8 = 10;

/// Assigns mapped buttons to JVS switch bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JvsSwitchEncoder {
    pub players: u8,
    /// Button index reported as START.
    pub start_button: Option<u8>,
    /// Button index reported as SERVICE.
    pub service_button: Option<u8>,
}

impl JvsSwitchEncoder {
    /// Two players; the 13th button (panel start) is START.
    pub const DEFAULT: Self = Self {
        players: 2,
        start_button: Some(12),
        service_button: None,
    };

    /// Build one player's switch word.
    ///
    /// Remaining buttons fill PUSH1..PUSH10 in index order; any beyond that
    /// are not reported.
    #[must_use]
    pub fn switch_word(&self, actions: &PlayerActions) -> u16 {
        let mut word = 0u16;
        let pressed = |button: Option<u8>| button.is_some_and(|b| actions.buttons.contains(b));

        if pressed(self.start_button) {
            word |= START_BIT;
        }
        if pressed(self.service_button) {
            word |= SERVICE_BIT;
        }
        word |= match actions.axes.y {
            AxisDir::Negative => UP_BIT,
            AxisDir::Positive => DOWN_BIT,
            AxisDir::Centered => 0,
        };
        word |= match actions.axes.x {
            AxisDir::Negative => LEFT_BIT,
            AxisDir::Positive => RIGHT_BIT,
            AxisDir::Centered => 0,
        };

        let pushes = (0..arcade_proto::Buttons::MAX_BUTTONS)
            .filter(|&b| Some(b) != self.start_button && Some(b) != self.service_button)
            .take(usize::from(PUSH_BUTTONS));
        for (bit, button) in (0..PUSH_BUTTONS).rev().zip(pushes) {
            if actions.buttons.contains(button) {
                word |= 1 << bit;
            }
        }
        word
    }

    /// Copy every player's switch word into the I/O engine.
    pub fn load(&self, actions: &ActionSet, io: &mut JvsIo) {
        for index in 0..self.report_count() {
            let report = self.encode(actions, index);
            io.set_player_switches(index, u16::from_be_bytes([report[0], report[1]]));
        }
    }
}

impl Default for JvsSwitchEncoder {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Encode for JvsSwitchEncoder {
    fn report_count(&self) -> usize {
        usize::from(self.players).min(MAX_PLAYERS)
    }

    /// The player's switch bytes as READ_SWITCHES sends them.
    fn encode(&self, actions: &ActionSet, index: usize) -> Report {
        let word = actions
            .player(index)
            .map_or(0, |player| self.switch_word(player));
        let mut report = Report::new();
        let _ = report.extend_from_slice(&word.to_be_bytes());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_proto::{Axes, Buttons};
    use jvs_proto::{cmd, BoardInfo, JvsFrame, BROADCAST};

    fn player(axes: Axes, buttons: u32) -> PlayerActions {
        PlayerActions {
            axes,
            buttons: Buttons(buttons),
            ..PlayerActions::IDLE
        }
    }

    #[test]
    fn test_directions_and_start() {
        let enc = JvsSwitchEncoder::DEFAULT;
        let p = player(
            Axes {
                x: AxisDir::Positive,
                y: AxisDir::Negative,
            },
            1 << 12,
        );
        assert_eq!(enc.switch_word(&p), START_BIT | UP_BIT | RIGHT_BIT);
    }

    #[test]
    fn test_push_buttons_in_order() {
        let enc = JvsSwitchEncoder::DEFAULT;
        // Button 0 -> PUSH1 (bit 9), button 9 -> PUSH10 (bit 0), 10 and 11 dropped
        let p = player(Axes::CENTERED, 1 | 1 << 9 | 1 << 10 | 1 << 11);
        assert_eq!(enc.switch_word(&p), 1 << 9 | 1);
    }

    #[test]
    fn test_service_button_skipped_for_pushes() {
        let enc = JvsSwitchEncoder {
            service_button: Some(0),
            ..JvsSwitchEncoder::DEFAULT
        };
        // Button 0 is SERVICE, so button 1 becomes PUSH1
        let p = player(Axes::CENTERED, 0b11);
        assert_eq!(enc.switch_word(&p), SERVICE_BIT | 1 << 9);
    }

    #[test]
    fn test_load_feeds_read_switches() {
        let enc = JvsSwitchEncoder::DEFAULT;
        let mut actions = ActionSet::neutral();
        actions.players[1] = player(
            Axes {
                x: AxisDir::Negative,
                y: AxisDir::Centered,
            },
            1,
        );

        let mut io = JvsIo::new(BoardInfo::DEFAULT);
        enc.load(&actions, &mut io);
        let request = JvsFrame::with_payload(BROADCAST, &[cmd::READ_SWITCHES, 2, 2]).unwrap();
        let response = io.handle(&request).unwrap();
        assert_eq!(
            response.payload.as_slice(),
            &[0x01, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x00]
        );
    }
}
