//! Persisted switch-to-function mapping block.
//!
//! The block is stored verbatim in one erasable flash page and exchanged
//! with the host configuration tool over vendor control transfers, so its
//! byte layout is fixed:
//!
//! ```text
//! offset  size  field
//! 0       4     magic   (u32 LE, CONFIG_MAGIC)
//! 4       4     version (u32 LE, CONFIG_VERSION)
//! 8       306   player 1 entries (17 x 18 bytes)
//! 314     306   player 2 entries (17 x 18 bytes)
//! 620     4     crc32   (u32 LE, CRC-32 of bytes 0..620)
//! ```
//!
//! Each entry is `silk_pin u8 | kind u8 | value u8 | name [u8; 15]`, where
//! the name is NUL padded and always NUL terminated.

use crate::crc::calculate_crc32;
use crate::types::{Buttons, MAX_PLAYERS};

/// Block identifier ("HID0" read as a big-endian word).
pub const CONFIG_MAGIC: u32 = 0x4849_4430;

/// Current layout version.
pub const CONFIG_VERSION: u32 = 2;

/// Mapping slots per player.
pub const MAX_PINS_PER_PLAYER: usize = 17;

/// Bytes reserved for an entry name, terminator included.
pub const NAME_LEN: usize = 15;

/// Encoded size of one [`MappingEntry`].
pub const ENTRY_SIZE: usize = 3 + NAME_LEN;

const HEADER_SIZE: usize = 8;
const PLAYER_TABLE_SIZE: usize = MAX_PINS_PER_PLAYER * ENTRY_SIZE;
const CRC_OFFSET: usize = HEADER_SIZE + MAX_PLAYERS * PLAYER_TABLE_SIZE;

/// Encoded size of a [`ConfigBlock`].
pub const CONFIG_BLOCK_SIZE: usize = CRC_OFFSET + 4;

const KIND_DISABLED: u8 = 0;
const KIND_BUTTON: u8 = 1;
const KIND_AXIS_UP: u8 = 2;
const KIND_AXIS_DOWN: u8 = 3;
const KIND_AXIS_LEFT: u8 = 4;
const KIND_AXIS_RIGHT: u8 = 5;
const KIND_KEY_CODE: u8 = 6;

/// Reasons a stored block is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Fewer bytes than a full block.
    Truncated,
    /// Magic word does not match [`CONFIG_MAGIC`].
    BadMagic,
    /// Layout version does not match [`CONFIG_VERSION`].
    BadVersion,
    /// Stored CRC does not match the contents.
    BadCrc,
    /// An entry holds an unknown function kind or button index.
    BadMapping,
}

/// What a mapped switch does when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Function {
    #[default]
    Disabled,
    /// Joystick button index, `0..Buttons::MAX_BUTTONS`.
    Button(u8),
    AxisUp,
    AxisDown,
    AxisLeft,
    AxisRight,
    /// USB HID keyboard usage code.
    KeyCode(u8),
}

impl Function {
    fn to_wire(self) -> [u8; 2] {
        match self {
            Function::Disabled => [KIND_DISABLED, 0],
            Function::Button(index) => [KIND_BUTTON, index],
            Function::AxisUp => [KIND_AXIS_UP, 0],
            Function::AxisDown => [KIND_AXIS_DOWN, 0],
            Function::AxisLeft => [KIND_AXIS_LEFT, 0],
            Function::AxisRight => [KIND_AXIS_RIGHT, 0],
            Function::KeyCode(code) => [KIND_KEY_CODE, code],
        }
    }

    fn from_wire(kind: u8, value: u8) -> Result<Self, ConfigError> {
        Ok(match kind {
            KIND_DISABLED => Function::Disabled,
            KIND_BUTTON if value < Buttons::MAX_BUTTONS => Function::Button(value),
            KIND_AXIS_UP => Function::AxisUp,
            KIND_AXIS_DOWN => Function::AxisDown,
            KIND_AXIS_LEFT => Function::AxisLeft,
            KIND_AXIS_RIGHT => Function::AxisRight,
            KIND_KEY_CODE => Function::KeyCode(value),
            _ => return Err(ConfigError::BadMapping),
        })
    }
}

/// Binds one silkscreen slot to a [`Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MappingEntry {
    /// Silkscreen slot (0..17) whose switch drives this entry.
    pub silk_pin: u8,
    pub function: Function,
    name: [u8; NAME_LEN],
}

impl MappingEntry {
    /// Create an entry with a display name (truncated to fit).
    #[must_use]
    pub fn new(silk_pin: u8, function: Function, name: &str) -> Self {
        let mut entry = Self {
            silk_pin,
            function,
            name: [0; NAME_LEN],
        };
        entry.set_name(name);
        entry
    }

    /// A slot that does nothing.
    #[must_use]
    pub fn disabled(silk_pin: u8) -> Self {
        Self::new(silk_pin, Function::Disabled, "Disabled")
    }

    /// Display name shown by the configuration tool.
    #[must_use]
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    /// Replace the display name, truncating on a character boundary.
    pub fn set_name(&mut self, name: &str) {
        let mut end = name.len().min(NAME_LEN - 1);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        self.name = [0; NAME_LEN];
        self.name[..end].copy_from_slice(&name.as_bytes()[..end]);
    }

    fn write(&self, out: &mut [u8]) {
        let [kind, value] = self.function.to_wire();
        out[0] = self.silk_pin;
        out[1] = kind;
        out[2] = value;
        out[3..ENTRY_SIZE].copy_from_slice(&self.name);
    }

    fn read(raw: &[u8]) -> Result<Self, ConfigError> {
        let function = Function::from_wire(raw[1], raw[2])?;
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&raw[3..ENTRY_SIZE]);
        // Force termination so name() never reads a stray tail.
        name[NAME_LEN - 1] = 0;
        Ok(Self {
            silk_pin: raw[0],
            function,
            name,
        })
    }
}

/// Which built-in default table to synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MappingProfile {
    /// Stick directions plus buttons (joystick and JVS modes).
    Joystick,
    /// One key code per slot (keyboard mode).
    Keyboard,
}

const JOYSTICK_DEFAULTS: [(Function, &str); MAX_PINS_PER_PLAYER] = [
    (Function::AxisLeft, "LEFT"),
    (Function::AxisDown, "DOWN"),
    (Function::AxisUp, "UP"),
    (Function::AxisRight, "RIGHT"),
    (Function::Button(0), "Button 1"),
    (Function::Button(1), "Button 2"),
    (Function::Button(2), "Button 3"),
    (Function::Button(3), "Button 4"),
    (Function::Button(4), "Button 5"),
    (Function::Button(5), "Button 6"),
    (Function::Button(6), "Button 7"),
    (Function::Button(7), "Button 8"),
    (Function::Button(8), "Button 9"),
    (Function::Button(9), "Button 10"),
    (Function::Button(10), "Button 11"),
    (Function::Button(11), "Button 12"),
    (Function::Button(12), "Button 13"),
];

const KEYBOARD_P1_DEFAULTS: [(u8, &str); MAX_PINS_PER_PLAYER] = [
    (0x04, "A"),
    (0x16, "S"),
    (0x1A, "W"),
    (0x07, "D"),
    (0x14, "Q"),
    (0x1B, "X"),
    (0x06, "C"),
    (0x19, "V"),
    (0x1E, "1"),
    (0x1F, "2"),
    (0x20, "3"),
    (0x21, "4"),
    (0x22, "5"),
    (0x23, "6"),
    (0x24, "7"),
    (0x25, "8"),
    (0x26, "9"),
];

const KEYBOARD_P2_DEFAULTS: [(u8, &str); MAX_PINS_PER_PLAYER] = [
    (0x50, "LEFT"),
    (0x51, "DOWN"),
    (0x52, "UP"),
    (0x4F, "RIGHT"),
    (0x59, "Num1"),
    (0x5A, "Num2"),
    (0x5B, "Num3"),
    (0x5C, "Num4"),
    (0x5D, "Num5"),
    (0x5E, "Num6"),
    (0x5F, "Num7"),
    (0x60, "Num8"),
    (0x61, "Num9"),
    (0x62, "Num0"),
    (0x63, "Num."),
    (0x54, "Num/"),
    (0x55, "Num*"),
];

/// The persisted mapping of every player's slots.
///
/// Version 2 entries are `silk | kind | value | name[15]`; config tools
/// built for the version 1 `silk | func | name[16]` entries cannot read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigBlock {
    pub players: [[MappingEntry; MAX_PINS_PER_PLAYER]; MAX_PLAYERS],
}

impl ConfigBlock {
    /// Built-in mapping for `profile`.
    #[must_use]
    pub fn defaults(profile: MappingProfile) -> Self {
        let mut players = [[MappingEntry::disabled(0); MAX_PINS_PER_PLAYER]; MAX_PLAYERS];
        for (player, table) in players.iter_mut().enumerate() {
            for (slot, entry) in table.iter_mut().enumerate() {
                let silk_pin = slot as u8;
                *entry = match profile {
                    MappingProfile::Joystick => {
                        let (function, name) = JOYSTICK_DEFAULTS[slot];
                        MappingEntry::new(silk_pin, function, name)
                    }
                    MappingProfile::Keyboard => {
                        let (code, name) = if player == 0 {
                            KEYBOARD_P1_DEFAULTS[slot]
                        } else {
                            KEYBOARD_P2_DEFAULTS[slot]
                        };
                        MappingEntry::new(silk_pin, Function::KeyCode(code), name)
                    }
                };
            }
        }
        Self { players }
    }

    /// Entries of `player`, if in range.
    #[must_use]
    pub fn player(&self, player: usize) -> Option<&[MappingEntry; MAX_PINS_PER_PLAYER]> {
        self.players.get(player)
    }

    /// Encode to the stored byte layout, CRC included.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; CONFIG_BLOCK_SIZE] {
        let mut out = [0u8; CONFIG_BLOCK_SIZE];
        out[0..4].copy_from_slice(&CONFIG_MAGIC.to_le_bytes());
        out[4..8].copy_from_slice(&CONFIG_VERSION.to_le_bytes());

        let entries = out[HEADER_SIZE..CRC_OFFSET].chunks_exact_mut(ENTRY_SIZE);
        for (chunk, entry) in entries.zip(self.players.iter().flatten()) {
            entry.write(chunk);
        }

        let crc = calculate_crc32(&out[..CRC_OFFSET]);
        out[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Decode and fully validate a stored block.
    ///
    /// Checks run in order magic, version, CRC, entries; the first failure
    /// is returned.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        Self::decode(bytes, true)
    }

    /// Decode a block supplied by the host tool.
    ///
    /// Magic, version and entries are checked but the CRC is not: the host
    /// is not required to compute it, and [`to_bytes`](Self::to_bytes)
    /// reseals the block before it is stored.
    pub fn from_host_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        Self::decode(bytes, false)
    }

    fn decode(bytes: &[u8], verify_crc: bool) -> Result<Self, ConfigError> {
        if bytes.len() < CONFIG_BLOCK_SIZE {
            return Err(ConfigError::Truncated);
        }
        if read_u32(bytes, 0) != CONFIG_MAGIC {
            return Err(ConfigError::BadMagic);
        }
        if read_u32(bytes, 4) != CONFIG_VERSION {
            return Err(ConfigError::BadVersion);
        }
        if verify_crc && read_u32(bytes, CRC_OFFSET) != calculate_crc32(&bytes[..CRC_OFFSET]) {
            return Err(ConfigError::BadCrc);
        }

        let mut players = [[MappingEntry::disabled(0); MAX_PINS_PER_PLAYER]; MAX_PLAYERS];
        let raw = bytes[HEADER_SIZE..CRC_OFFSET].chunks_exact(ENTRY_SIZE);
        for (entry, chunk) in players.iter_mut().flatten().zip(raw) {
            *entry = MappingEntry::read(chunk)?;
        }
        Ok(Self { players })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reseal(bytes: &mut [u8; CONFIG_BLOCK_SIZE]) {
        let crc = calculate_crc32(&bytes[..CRC_OFFSET]);
        bytes[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
    }

    #[test]
    fn test_block_size_is_word_aligned() {
        assert_eq!(CONFIG_BLOCK_SIZE, 624);
        assert_eq!(CONFIG_BLOCK_SIZE % 4, 0);
    }

    #[test]
    fn test_defaults_round_trip() {
        for profile in [MappingProfile::Joystick, MappingProfile::Keyboard] {
            let block = ConfigBlock::defaults(profile);
            let bytes = block.to_bytes();
            let decoded = ConfigBlock::from_bytes(&bytes).unwrap();
            assert_eq!(decoded, block);
            assert_eq!(decoded.to_bytes(), bytes);
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = ConfigBlock::defaults(MappingProfile::Joystick).to_bytes();
        assert_eq!(&bytes[0..4], &[0x30, 0x44, 0x49, 0x48]);
        assert_eq!(&bytes[4..8], &[2, 0, 0, 0]);
        // Player 1 slot 0: silk pin 0, AxisLeft, name "LEFT"
        assert_eq!(&bytes[8..15], &[0, KIND_AXIS_LEFT, 0, b'L', b'E', b'F', b'T']);
        // Player 2 slot 4: Button(0)
        let p2_slot4 = 8 + PLAYER_TABLE_SIZE + 4 * ENTRY_SIZE;
        assert_eq!(&bytes[p2_slot4..p2_slot4 + 3], &[4, KIND_BUTTON, 0]);
    }

    #[test]
    fn test_single_bit_flip_rejected() {
        let bytes = ConfigBlock::defaults(MappingProfile::Keyboard).to_bytes();
        for offset in [8, 100, 333, CRC_OFFSET - 1] {
            let mut corrupted = bytes;
            corrupted[offset] ^= 0x01;
            assert_eq!(
                ConfigBlock::from_bytes(&corrupted),
                Err(ConfigError::BadCrc)
            );
        }
    }

    #[test]
    fn test_validation_order() {
        let mut bytes = ConfigBlock::defaults(MappingProfile::Joystick).to_bytes();
        bytes[0] = 0;
        bytes[4] = 9;
        assert_eq!(ConfigBlock::from_bytes(&bytes), Err(ConfigError::BadMagic));

        let mut bytes = ConfigBlock::defaults(MappingProfile::Joystick).to_bytes();
        bytes[4..8].copy_from_slice(&(CONFIG_VERSION - 1).to_le_bytes());
        reseal(&mut bytes);
        assert_eq!(ConfigBlock::from_bytes(&bytes), Err(ConfigError::BadVersion));

        assert_eq!(
            ConfigBlock::from_bytes(&bytes[..100]),
            Err(ConfigError::Truncated)
        );
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut bytes = ConfigBlock::defaults(MappingProfile::Joystick).to_bytes();
        bytes[9] = 0x7F;
        reseal(&mut bytes);
        assert_eq!(ConfigBlock::from_bytes(&bytes), Err(ConfigError::BadMapping));

        let mut bytes = ConfigBlock::defaults(MappingProfile::Joystick).to_bytes();
        bytes[9] = KIND_BUTTON;
        bytes[10] = 30;
        reseal(&mut bytes);
        assert_eq!(ConfigBlock::from_bytes(&bytes), Err(ConfigError::BadMapping));
    }

    #[test]
    fn test_host_bytes_skip_crc() {
        let mut bytes = ConfigBlock::defaults(MappingProfile::Joystick).to_bytes();
        bytes[CRC_OFFSET..].copy_from_slice(&[0; 4]);
        assert!(ConfigBlock::from_host_bytes(&bytes).is_ok());
        assert_eq!(ConfigBlock::from_bytes(&bytes), Err(ConfigError::BadCrc));
    }

    #[test]
    fn test_keyboard_defaults() {
        let block = ConfigBlock::defaults(MappingProfile::Keyboard);
        let p1 = block.player(0).unwrap();
        let p2 = block.player(1).unwrap();
        assert_eq!(p1[0].function, Function::KeyCode(0x04));
        assert_eq!(p1[3].function, Function::KeyCode(0x07));
        assert_eq!(p1[3].name(), "D");
        assert_eq!(p2[16].function, Function::KeyCode(0x55));
        assert_eq!(p2[16].name(), "Num*");
    }

    #[test]
    fn test_entry_name_truncated() {
        let entry = MappingEntry::new(3, Function::AxisUp, "a very long switch label");
        assert_eq!(entry.name(), "a very long sw");
        assert_eq!(entry.name().len(), NAME_LEN - 1);
    }
}
