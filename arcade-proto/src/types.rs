//! Semantic input actions: buttons, axes, key codes, and per-player sets.

use core::ops::{BitAnd, BitOr, BitOrAssign};

/// Number of players an [`ActionSet`] can describe.
pub const MAX_PLAYERS: usize = 2;

/// Electrical level read from a switch input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

/// Pressed-button bitfield, bit `n` is button index `n`.
///
/// # Example
///
/// ```
/// use arcade_proto::Buttons;
///
/// let mut buttons = Buttons::NONE;
/// buttons.set(0, true);
/// buttons.set(12, true);
/// assert!(buttons.contains(0));
/// assert_eq!(buttons.raw(), 0x1001);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Buttons(pub u32);

impl Buttons {
    /// Highest number of distinct button indices (`0..MAX_BUTTONS`).
    pub const MAX_BUTTONS: u8 = 30;

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Bitfield with only `index` set, or empty if out of range.
    #[inline]
    #[must_use]
    pub const fn bit(index: u8) -> Self {
        if index < Self::MAX_BUTTONS {
            Self(1 << index)
        } else {
            Self::NONE
        }
    }

    /// Check if button `index` is pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, index: u8) -> bool {
        index < Self::MAX_BUTTONS && (self.0 >> index) & 1 == 1
    }

    /// Set or clear button `index`. Out-of-range indices are ignored.
    #[inline]
    pub fn set(&mut self, index: u8, pressed: bool) {
        let mask = Self::bit(index).0;
        if pressed {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    /// Keep only the lowest `count` buttons.
    #[inline]
    #[must_use]
    pub const fn truncated(self, count: u8) -> Self {
        if count >= 32 {
            self
        } else {
            Self(self.0 & ((1u32 << count) - 1))
        }
    }

    /// Get the raw u32 value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if no buttons are pressed.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Buttons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Buttons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Buttons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

/// Resolved direction of one digital axis.
///
/// `Negative` is up on the Y axis and left on the X axis.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisDir {
    #[default]
    Centered,
    Negative,
    Positive,
}

impl AxisDir {
    /// Resolve the two half-switches of an axis.
    ///
    /// Both halves held at once cancel out to `Centered`.
    #[inline]
    #[must_use]
    pub const fn resolve(negative: bool, positive: bool) -> Self {
        match (negative, positive) {
            (true, false) => Self::Negative,
            (false, true) => Self::Positive,
            _ => Self::Centered,
        }
    }
}

/// X/Y axis state of one player's stick.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Axes {
    pub x: AxisDir,
    pub y: AxisDir,
}

impl Axes {
    /// Both axes centered.
    pub const CENTERED: Self = Self {
        x: AxisDir::Centered,
        y: AxisDir::Centered,
    };
}

/// Set of pressed USB HID usage codes (0..=255).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySet([u32; 8]);

impl KeySet {
    /// Empty key set.
    pub const EMPTY: Self = Self([0; 8]);

    /// Mark `code` as pressed. Inserting twice has no further effect.
    #[inline]
    pub fn insert(&mut self, code: u8) {
        self.0[usize::from(code >> 5)] |= 1 << (code & 31);
    }

    /// Mark `code` as released.
    #[inline]
    pub fn remove(&mut self, code: u8) {
        self.0[usize::from(code >> 5)] &= !(1 << (code & 31));
    }

    /// Check whether `code` is pressed.
    #[inline]
    #[must_use]
    pub const fn contains(&self, code: u8) -> bool {
        (self.0[(code >> 5) as usize] >> (code & 31)) & 1 == 1
    }

    /// Number of pressed codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Check if no codes are pressed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }

    /// Pressed codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=255u8).filter(move |&code| self.contains(code))
    }
}

/// Everything one player is pressing after mapping.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlayerActions {
    pub axes: Axes,
    pub buttons: Buttons,
    pub keys: KeySet,
}

impl PlayerActions {
    /// No input at all.
    pub const IDLE: Self = Self {
        axes: Axes::CENTERED,
        buttons: Buttons::NONE,
        keys: KeySet::EMPTY,
    };

    /// Check if the player is touching nothing.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }
}

/// Semantic actions of all players for one poll cycle.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActionSet {
    pub players: [PlayerActions; MAX_PLAYERS],
}

impl ActionSet {
    /// Neutral set (nothing pressed).
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            players: [PlayerActions::IDLE; MAX_PLAYERS],
        }
    }

    /// Actions of `player`, if in range.
    #[must_use]
    pub fn player(&self, player: usize) -> Option<&PlayerActions> {
        self.players.get(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons_out_of_range_ignored() {
        let mut b = Buttons::NONE;
        b.set(30, true);
        b.set(255, true);
        assert!(b.is_empty());
        assert!(!b.contains(31));
    }

    #[test]
    fn test_buttons_truncated() {
        let b = Buttons(0xFFFF_FFFF);
        assert_eq!(b.truncated(14).raw(), 0x3FFF);
        assert_eq!(b.truncated(0).raw(), 0);
        assert_eq!(b.truncated(32).raw(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_axis_resolve_cancels() {
        assert_eq!(AxisDir::resolve(true, true), AxisDir::Centered);
        assert_eq!(AxisDir::resolve(false, false), AxisDir::Centered);
        assert_eq!(AxisDir::resolve(true, false), AxisDir::Negative);
        assert_eq!(AxisDir::resolve(false, true), AxisDir::Positive);
    }

    #[test]
    fn test_keyset_insert_dedup_and_order() {
        let mut keys = KeySet::EMPTY;
        keys.insert(0x1A);
        keys.insert(0x04);
        keys.insert(0x1A);
        keys.insert(0xE1);
        assert_eq!(keys.len(), 3);

        {
            let mut it = keys.iter();
            assert_eq!(it.next(), Some(0x04));
            assert_eq!(it.next(), Some(0x1A));
            assert_eq!(it.next(), Some(0xE1));
            assert_eq!(it.next(), None);
        }

        keys.remove(0x1A);
        assert!(!keys.contains(0x1A));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_neutral_action_set_is_idle() {
        let set = ActionSet::neutral();
        assert!(set.players.iter().all(PlayerActions::is_idle));
        assert!(set.player(2).is_none());
    }
}
