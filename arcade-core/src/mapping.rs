//! Slot-to-action mapping.
//!
//! Resolves the debounced slot vector into an [`ActionSet`] using the
//! per-player tables of a [`ConfigBlock`].

use crate::debounce::SLOT_COUNT;
use arcade_proto::{
    ActionSet, AxisDir, ConfigBlock, Function, MappingEntry, PlayerActions, MAX_PINS_PER_PLAYER,
    MAX_PLAYERS,
};

/// Table-driven mapper.
///
/// Holds nothing but the table, so [`map`](Mapper::map) is a pure function
/// of its input.
#[derive(Debug, Clone)]
pub struct Mapper {
    table: ConfigBlock,
    players: usize,
}

impl Mapper {
    /// Mapper for the first `players` tables of `table`.
    #[must_use]
    pub fn new(table: ConfigBlock, players: usize) -> Self {
        Self {
            table,
            players: players.min(MAX_PLAYERS),
        }
    }

    #[must_use]
    pub fn table(&self) -> &ConfigBlock {
        &self.table
    }

    /// Swap in a new table.
    pub fn set_table(&mut self, table: ConfigBlock) {
        self.table = table;
    }

    #[must_use]
    pub fn players(&self) -> usize {
        self.players
    }

    /// Resolve pressed slots into actions.
    ///
    /// `slots[player * MAX_PINS_PER_PLAYER + silk_pin]` is the stable state
    /// of that player's slot. Players beyond the configured count stay idle.
    #[must_use]
    pub fn map(&self, slots: &[bool; SLOT_COUNT]) -> ActionSet {
        let mut actions = ActionSet::neutral();
        for (player, (table, out)) in self
            .table
            .players
            .iter()
            .zip(actions.players.iter_mut())
            .enumerate()
            .take(self.players)
        {
            let window = &slots[player * MAX_PINS_PER_PLAYER..][..MAX_PINS_PER_PLAYER];
            *out = map_player(table, window);
        }
        actions
    }
}

fn map_player(table: &[MappingEntry; MAX_PINS_PER_PLAYER], window: &[bool]) -> PlayerActions {
    let mut actions = PlayerActions::IDLE;
    let (mut up, mut down, mut left, mut right) = (false, false, false, false);

    for entry in table {
        if !window.get(usize::from(entry.silk_pin)).copied().unwrap_or(false) {
            continue;
        }
        match entry.function {
            Function::Disabled => {}
            Function::Button(index) => actions.buttons.set(index, true),
            Function::AxisUp => up = true,
            Function::AxisDown => down = true,
            Function::AxisLeft => left = true,
            Function::AxisRight => right = true,
            Function::KeyCode(code) => actions.keys.insert(code),
        }
    }

    actions.axes.x = AxisDir::resolve(left, right);
    actions.axes.y = AxisDir::resolve(up, down);
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_proto::{Axes, MappingProfile};

    fn pressed(list: &[(usize, usize)]) -> [bool; SLOT_COUNT] {
        let mut slots = [false; SLOT_COUNT];
        for &(player, slot) in list {
            slots[player * MAX_PINS_PER_PLAYER + slot] = true;
        }
        slots
    }

    #[test]
    fn test_nothing_pressed_is_neutral() {
        let mapper = Mapper::new(ConfigBlock::defaults(MappingProfile::Joystick), 2);
        assert_eq!(mapper.map(&[false; SLOT_COUNT]), ActionSet::neutral());
    }

    #[test]
    fn test_default_joystick_mapping() {
        let mapper = Mapper::new(ConfigBlock::defaults(MappingProfile::Joystick), 2);
        // P1: left + up + button 1; P2: right + button 13
        let actions = mapper.map(&pressed(&[(0, 0), (0, 2), (0, 4), (1, 3), (1, 16)]));

        let p1 = actions.players[0];
        assert_eq!(p1.axes.x, AxisDir::Negative);
        assert_eq!(p1.axes.y, AxisDir::Negative);
        assert_eq!(p1.buttons.raw(), 0b1);

        let p2 = actions.players[1];
        assert_eq!(p2.axes.x, AxisDir::Positive);
        assert_eq!(p2.axes.y, AxisDir::Centered);
        assert_eq!(p2.buttons.raw(), 1 << 12);
    }

    #[test]
    fn test_opposite_directions_cancel() {
        let mapper = Mapper::new(ConfigBlock::defaults(MappingProfile::Joystick), 2);
        let actions = mapper.map(&pressed(&[(0, 0), (0, 3), (0, 1)]));
        assert_eq!(
            actions.players[0].axes,
            Axes {
                x: AxisDir::Centered,
                y: AxisDir::Positive
            }
        );
    }

    #[test]
    fn test_keyboard_mapping_collects_codes() {
        let mapper = Mapper::new(ConfigBlock::defaults(MappingProfile::Keyboard), 2);
        let actions = mapper.map(&pressed(&[(0, 0), (0, 2), (1, 16)]));
        assert!(actions.players[0].keys.contains(0x04));
        assert!(actions.players[0].keys.contains(0x1A));
        assert_eq!(actions.players[0].keys.len(), 2);
        assert!(actions.players[1].keys.contains(0x55));
        assert!(actions.players[0].buttons.is_empty());
    }

    #[test]
    fn test_disabled_and_remapped_slots() {
        let mut block = ConfigBlock::defaults(MappingProfile::Joystick);
        block.players[0][4] = MappingEntry::disabled(4);
        // Slot 5's switch now drives two entries
        block.players[0][6] = MappingEntry::new(5, Function::Button(20), "Extra");
        let mapper = Mapper::new(block, 2);

        let actions = mapper.map(&pressed(&[(0, 4), (0, 5)]));
        assert_eq!(actions.players[0].buttons.raw(), (1 << 1) | (1 << 20));
    }

    #[test]
    fn test_single_player_ignores_second_table() {
        let mapper = Mapper::new(ConfigBlock::defaults(MappingProfile::Joystick), 1);
        let actions = mapper.map(&pressed(&[(1, 4)]));
        assert!(actions.players[1].is_idle());
    }
}
