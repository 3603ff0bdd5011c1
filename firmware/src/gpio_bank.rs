//! Switch inputs behind the [`PinBank`] seam.

use arcade_core::{PinBank, PinHandle};
use arcade_proto::Level;
use embedded_hal::digital::InputPin;

/// Fixed array of input pins indexed by [`PinHandle`].
pub struct GpioBank<P, const N: usize> {
    pins: [P; N],
}

impl<P: InputPin, const N: usize> GpioBank<P, N> {
    pub fn new(pins: [P; N]) -> Self {
        Self { pins }
    }
}

impl<P: InputPin, const N: usize> PinBank for GpioBank<P, N> {
    fn read(&mut self, pin: PinHandle) -> Level {
        // Unknown handles and read errors look released (pulled high)
        match self.pins.get_mut(usize::from(pin.0)).map(|p| p.is_low()) {
            Some(Ok(true)) => Level::Low,
            _ => Level::High,
        }
    }
}
