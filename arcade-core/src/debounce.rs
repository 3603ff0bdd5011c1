//! Debounced switch scanning.
//!
//! Confirm-then-commit: when a switch's raw state first disagrees with its
//! stable state a timer starts. The flip is committed once the disagreement
//! has lasted [`DEBOUNCE_TIME_MS`]. If the raw state returns to the stable
//! value before that, the timer is cleared. Further bounces in the same
//! direction do not restart it.

use crate::input::{LogicalInput, PinBank};
use arcade_proto::{MAX_PINS_PER_PLAYER, MAX_PLAYERS};

/// Default time a new level must persist before it is accepted.
pub const DEBOUNCE_TIME_MS: u32 = 5;

/// Number of mapping slots across all players.
pub const SLOT_COUNT: usize = MAX_PLAYERS * MAX_PINS_PER_PLAYER;

/// Millisecond tick counter; comparisons wrap.
pub type Timestamp = u32;

/// Debounce bookkeeping for one input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DebounceState {
    pub stable: bool,
    /// When the raw reading started to differ from `stable`.
    pub pending_since: Option<Timestamp>,
}

impl DebounceState {
    /// Feed one raw sample, returning the (possibly updated) stable state.
    pub fn update(&mut self, pressed: bool, now: Timestamp, debounce_ms: u32) -> bool {
        if pressed == self.stable {
            self.pending_since = None;
            return self.stable;
        }
        let since = *self.pending_since.get_or_insert(now);
        if now.wrapping_sub(since) >= debounce_ms {
            self.stable = pressed;
            self.pending_since = None;
        }
        self.stable
    }
}

/// Scans a fixed table of inputs once per poll.
pub struct Scanner<const N: usize> {
    inputs: [LogicalInput; N],
    states: [DebounceState; N],
    debounce_ms: u32,
}

impl<const N: usize> Scanner<N> {
    /// Scanner with the default debounce time.
    #[must_use]
    pub fn new(inputs: [LogicalInput; N]) -> Self {
        Self::with_debounce(inputs, DEBOUNCE_TIME_MS)
    }

    #[must_use]
    pub fn with_debounce(inputs: [LogicalInput; N], debounce_ms: u32) -> Self {
        Self {
            inputs,
            states: [DebounceState::default(); N],
            debounce_ms,
        }
    }

    /// Sample every input and return the stable vector, index-aligned with
    /// the input table.
    pub fn scan<B: PinBank>(&mut self, bank: &mut B, now: Timestamp) -> [bool; N] {
        let mut stable = [false; N];
        for ((input, state), out) in self
            .inputs
            .iter()
            .zip(self.states.iter_mut())
            .zip(stable.iter_mut())
        {
            let pressed = input.is_pressed(bank.read(input.pin));
            *out = state.update(pressed, now, self.debounce_ms);
        }
        stable
    }

    /// Stable states routed to `player * MAX_PINS_PER_PLAYER + slot`.
    ///
    /// Inputs whose player or slot is out of range are left out.
    #[must_use]
    pub fn slots(&self) -> [bool; SLOT_COUNT] {
        let mut slots = [false; SLOT_COUNT];
        for (input, state) in self.inputs.iter().zip(self.states.iter()) {
            let (player, slot) = (usize::from(input.player), usize::from(input.slot));
            if player < MAX_PLAYERS && slot < MAX_PINS_PER_PLAYER {
                slots[player * MAX_PINS_PER_PLAYER + slot] = state.stable;
            }
        }
        slots
    }

    #[must_use]
    pub fn inputs(&self) -> &[LogicalInput; N] {
        &self.inputs
    }

    #[must_use]
    pub fn states(&self) -> &[DebounceState; N] {
        &self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PinHandle;
    use arcade_proto::Level;

    struct FakePins {
        levels: [Level; 4],
    }

    impl FakePins {
        fn idle() -> Self {
            Self {
                levels: [Level::High; 4],
            }
        }
    }

    impl PinBank for FakePins {
        fn read(&mut self, pin: PinHandle) -> Level {
            self.levels[usize::from(pin.0)]
        }
    }

    fn scanner() -> Scanner<2> {
        Scanner::new([
            LogicalInput::active_low(0, 0, PinHandle(0)),
            LogicalInput {
                player: 1,
                slot: 16,
                active_low: false,
                pin: PinHandle(1),
            },
        ])
    }

    #[test]
    fn test_press_below_threshold_ignored() {
        let mut scanner = scanner();
        let mut pins = FakePins::idle();
        pins.levels[0] = Level::Low;
        for now in 0..DEBOUNCE_TIME_MS {
            assert!(!scanner.scan(&mut pins, now)[0]);
        }
        pins.levels[0] = Level::High;
        for now in DEBOUNCE_TIME_MS..20 {
            assert!(!scanner.scan(&mut pins, now)[0]);
        }
    }

    #[test]
    fn test_press_commits_at_threshold() {
        let mut scanner = scanner();
        let mut pins = FakePins::idle();
        pins.levels[0] = Level::Low;
        for now in 100..105 {
            assert!(!scanner.scan(&mut pins, now)[0]);
        }
        assert!(scanner.scan(&mut pins, 105)[0]);
        assert_eq!(scanner.states()[0].pending_since, None);
    }

    #[test]
    fn test_bounce_back_clears_timer() {
        let mut state = DebounceState::default();
        assert!(!state.update(true, 0, 5));
        assert!(!state.update(false, 3, 5));
        assert_eq!(state.pending_since, None);
        // Timer restarts from the new edge
        assert!(!state.update(true, 4, 5));
        assert!(!state.update(true, 8, 5));
        assert!(state.update(true, 9, 5));
    }

    #[test]
    fn test_release_is_debounced_too() {
        let mut state = DebounceState {
            stable: true,
            pending_since: None,
        };
        assert!(state.update(false, 10, 5));
        assert!(state.update(false, 14, 5));
        assert!(!state.update(false, 15, 5));
    }

    #[test]
    fn test_timer_survives_tick_wrap() {
        let mut state = DebounceState::default();
        assert!(!state.update(true, u32::MAX - 1, 5));
        assert!(!state.update(true, 1, 5));
        assert!(state.update(true, 3, 5));
    }

    #[test]
    fn test_active_high_polarity_and_slot_routing() {
        let mut scanner = scanner();
        let mut pins = FakePins::idle();
        // Input 1 is active-high and idle-high, so it reads as pressed
        scanner.scan(&mut pins, 0);
        let stable = scanner.scan(&mut pins, 5);
        assert_eq!(stable, [false, true]);

        let slots = scanner.slots();
        assert!(slots[MAX_PINS_PER_PLAYER + 16]);
        assert_eq!(slots.iter().filter(|&&s| s).count(), 1);
    }

    #[test]
    fn test_zero_debounce_commits_immediately() {
        let mut scanner = Scanner::with_debounce(
            [LogicalInput::active_low(0, 0, PinHandle(2))],
            0,
        );
        let mut pins = FakePins::idle();
        pins.levels[2] = Level::Low;
        assert_eq!(scanner.scan(&mut pins, 0), [true]);
    }
}
