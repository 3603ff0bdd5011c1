//! Front panel activity LEDs.

use arcade_proto::ActionSet;
use embassy_stm32::gpio::Output;
use embassy_time::Instant;

use crate::board::HEARTBEAT;

pub struct Leds {
    player1: Output<'static>,
    player2: Output<'static>,
    status: Output<'static>,
    last_toggle: Instant,
}

impl Leds {
    pub fn new(
        player1: Output<'static>,
        player2: Output<'static>,
        status: Output<'static>,
    ) -> Self {
        Self {
            player1,
            player2,
            status,
            last_toggle: Instant::now(),
        }
    }

    /// Player LEDs light while that player has any input active.
    pub fn show_activity(&mut self, actions: &ActionSet) {
        for (led, player) in [&mut self.player1, &mut self.player2]
            .into_iter()
            .zip(actions.players.iter())
        {
            if player.is_idle() {
                led.set_low();
            } else {
                led.set_high();
            }
        }
    }

    /// Blink the status LED.
    pub fn heartbeat(&mut self, now: Instant) {
        if now.duration_since(self.last_toggle) >= HEARTBEAT {
            self.status.toggle();
            self.last_toggle = now;
        }
    }

    /// Solid status LED.
    pub fn set_status(&mut self, on: bool) {
        if on {
            self.status.set_high();
        } else {
            self.status.set_low();
        }
    }
}
