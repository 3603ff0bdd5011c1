//! Keyboard HID report encoding.
//!
//! Two key encodings are supported and must match the descriptor the
//! device enumerates with:
//!
//! - [`Rollover::Slots`]: a fixed array of usage codes (6 for the boot
//!   keyboard, or 12). Keys that do not fit are dropped. This is limited
//!   rollover, not NKRO.
//! - [`Rollover::Bitmap`]: one bit per usage code from 0 up to the bitmap
//!   width, so every mapped key can be reported at once.
//!
//! Both layouts start with `[report_id] | modifiers | reserved`. Usage codes
//! `0xE0..=0xE7` always go to the modifier byte.

use crate::encode::{Encode, Report, MAX_REPORT_LEN};
use arcade_proto::{ActionSet, KeySet};

const FIRST_MODIFIER: u8 = 0xE0;
const LAST_MODIFIER: u8 = 0xE7;

/// Key array encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rollover {
    /// Up to this many keys, filled in ascending usage order.
    Slots(u8),
    /// One bit per usage code below `bits`.
    Bitmap { bits: u8 },
}

/// Keyboard report layout. Produces a single report for all players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardEncoder {
    pub report_id: Option<u8>,
    pub rollover: Rollover,
}

impl KeyboardEncoder {
    /// Boot-protocol compatible 6-key report, no report id.
    pub const BOOT_6KRO: Self = Self {
        report_id: None,
        rollover: Rollover::Slots(6),
    };

    /// 104-bit bitmap covering usages 0x00..0x67, no report id.
    pub const NKRO_104: Self = Self {
        report_id: None,
        rollover: Rollover::Bitmap { bits: 104 },
    };

    /// Size of the encoded report.
    #[must_use]
    pub fn report_len(&self) -> usize {
        usize::from(self.report_id.is_some()) + 2 + self.key_bytes()
    }

    fn key_bytes(&self) -> usize {
        let bytes = match self.rollover {
            Rollover::Slots(n) => usize::from(n),
            Rollover::Bitmap { bits } => usize::from(bits).div_ceil(8),
        };
        let header = usize::from(self.report_id.is_some()) + 2;
        bytes.min(MAX_REPORT_LEN - header)
    }

    /// Encode the union of every player's pressed keys.
    #[must_use]
    pub fn encode_keys(&self, keys: &KeySet) -> Report {
        let mut report = Report::new();
        if let Some(id) = self.report_id {
            let _ = report.push(id);
        }

        let mut modifiers = 0u8;
        for code in FIRST_MODIFIER..=LAST_MODIFIER {
            if keys.contains(code) {
                modifiers |= 1 << (code - FIRST_MODIFIER);
            }
        }
        let _ = report.push(modifiers);
        let _ = report.push(0);

        let start = report.len();
        let _ = report.resize(start + self.key_bytes(), 0);
        let array = &mut report[start..];
        let usages = keys
            .iter()
            .filter(|code| !(FIRST_MODIFIER..=LAST_MODIFIER).contains(code));

        match self.rollover {
            Rollover::Slots(_) => {
                // Ascending usage order, not press order
                for (slot, code) in array.iter_mut().zip(usages) {
                    *slot = code;
                }
            }
            Rollover::Bitmap { bits } => {
                for code in usages.filter(|&code| code < bits) {
                    if let Some(byte) = array.get_mut(usize::from(code / 8)) {
                        *byte |= 1 << (code % 8);
                    }
                }
            }
        }
        report
    }
}

impl Default for KeyboardEncoder {
    fn default() -> Self {
        Self::NKRO_104
    }
}

impl Encode for KeyboardEncoder {
    fn report_count(&self) -> usize {
        1
    }

    fn encode(&self, actions: &ActionSet, _index: usize) -> Report {
        let mut keys = KeySet::EMPTY;
        for player in actions.players.iter() {
            for code in player.keys.iter() {
                keys.insert(code);
            }
        }
        self.encode_keys(&keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(codes: &[u8]) -> KeySet {
        let mut set = KeySet::EMPTY;
        for &code in codes {
            set.insert(code);
        }
        set
    }

    #[test]
    fn test_boot_report_layout() {
        let enc = KeyboardEncoder::BOOT_6KRO;
        let report = enc.encode_keys(&keys(&[0x1A, 0x04, 0xE1]));
        assert_eq!(report.as_slice(), &[0x02, 0, 0x04, 0x1A, 0, 0, 0, 0]);
        assert_eq!(enc.report_len(), 8);
    }

    #[test]
    fn test_slots_drop_overflow() {
        let enc = KeyboardEncoder::BOOT_6KRO;
        let report = enc.encode_keys(&keys(&[0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B]));
        assert_eq!(&report[2..], &[0x04, 0x05, 0x06, 0x07, 0x08, 0x09]);
    }

    #[test]
    fn test_twelve_slots_with_report_id() {
        let enc = KeyboardEncoder {
            report_id: Some(3),
            rollover: Rollover::Slots(12),
        };
        let report = enc.encode_keys(&keys(&[0x50, 0x51]));
        assert_eq!(report.len(), 15);
        assert_eq!(&report[..5], &[3, 0, 0, 0x50, 0x51]);
    }

    #[test]
    fn test_bitmap_sets_bits() {
        let enc = KeyboardEncoder::NKRO_104;
        let report = enc.encode_keys(&keys(&[0x04, 0x1A, 0x60, 0x67, 0x68, 0xE0]));
        assert_eq!(report.len(), 15);
        assert_eq!(report[0], 0x01);
        assert_eq!(report[1], 0);
        let bitmap = &report[2..];
        assert_eq!(bitmap[0], 1 << 4);
        assert_eq!(bitmap[3], 1 << 2);
        // 0x67 is the last bit; 0x68 is out of range and dropped
        assert_eq!(bitmap[12], 1 << 0 | 1 << 7);
        assert_eq!(bitmap.iter().map(|b| b.count_ones()).sum::<u32>(), 4);
    }

    #[test]
    fn test_bitmap_skips_out_of_range_codes() {
        let enc = KeyboardEncoder {
            report_id: None,
            rollover: Rollover::Bitmap { bits: 16 },
        };
        // 0x20 lies past the bitmap but 0x05 after it must still be set
        let report = enc.encode_keys(&keys(&[0x20, 0x05]));
        assert_eq!(&report[2..], &[1 << 5, 0]);
    }

    #[test]
    fn test_default_keys_all_reach_bitmap() {
        use arcade_proto::{ConfigBlock, Function, MappingProfile};

        let enc = KeyboardEncoder::NKRO_104;
        let block = ConfigBlock::defaults(MappingProfile::Keyboard);
        for entry in block.players.iter().flatten() {
            let Function::KeyCode(code) = entry.function else {
                panic!("keyboard default without a key code");
            };
            let report = enc.encode_keys(&keys(&[code]));
            let byte = report[2 + usize::from(code / 8)];
            assert_eq!(byte, 1 << (code % 8), "key {:#x} not reported", code);
        }
    }

    #[test]
    fn test_bitmap_104_covers_keypad() {
        let enc = KeyboardEncoder {
            report_id: Some(1),
            rollover: Rollover::Bitmap { bits: 104 },
        };
        let report = enc.encode_keys(&keys(&[0x63, 0x67]));
        assert_eq!(report.len(), 16);
        assert_eq!(report[3 + 12], 1 << 3 | 1 << 7);
    }

    #[test]
    fn test_players_merged_without_duplicates() {
        let enc = KeyboardEncoder::BOOT_6KRO;
        let mut set = ActionSet::neutral();
        set.players[0].keys = keys(&[0x04, 0x16]);
        set.players[1].keys = keys(&[0x16, 0x50]);
        assert_eq!(enc.report_count(), 1);
        assert_eq!(
            enc.encode(&set, 0).as_slice(),
            &[0, 0, 0x04, 0x16, 0x50, 0, 0, 0]
        );
    }
}
