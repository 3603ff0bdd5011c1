//! JVS bus transport on USART1 with the sense line.

use arcade_core::{Transport, TransportError};
use defmt::warn;
use embassy_stm32::gpio::{Flex, Pull, Speed};
use embassy_stm32::mode::Async;
use embassy_stm32::usart::{Error as UartError, RingBufferedUartRx, UartTx};
use embassy_time::{with_timeout, Duration};

/// Half-duplex RS-485 link driven through the USART.
///
/// Received bytes land in a DMA ring buffer, so nothing is lost between
/// polls.
pub struct JvsSerial {
    tx: UartTx<'static, Async>,
    rx: RingBufferedUartRx<'static>,
}

impl JvsSerial {
    pub fn new(tx: UartTx<'static, Async>, rx: RingBufferedUartRx<'static>) -> Self {
        Self { tx, rx }
    }
}

impl Transport for JvsSerial {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.tx.write(bytes).await.map_err(|e| {
            warn!("jvs tx error: {:?}", e);
            TransportError::Io
        })
    }

    async fn try_receive(&mut self, timeout_ms: u32) -> Option<u8> {
        let mut byte = [0u8; 1];
        let timeout = Duration::from_millis(u64::from(timeout_ms));
        let result = with_timeout(timeout, self.rx.read(&mut byte)).await;
        match result {
            Ok(Ok(n)) if n > 0 => Some(byte[0]),
            // Timed out or nothing read
            Ok(Ok(_)) | Err(_) => None,
            Ok(Err(UartError::Overrun)) => {
                // The decoder resyncs on the next SYNC
                warn!("jvs rx overrun");
                None
            }
            Ok(Err(e)) => {
                warn!("jvs rx error: {:?}", e);
                None
            }
        }
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Open-drain style sense line: driven high when addressed, floating
/// otherwise.
pub struct SenseLine {
    pin: Flex<'static>,
    asserted: bool,
}

impl SenseLine {
    pub fn new(mut pin: Flex<'static>) -> Self {
        pin.set_as_input(Pull::None);
        Self {
            pin,
            asserted: false,
        }
    }

    pub fn set(&mut self, asserted: bool) {
        if asserted == self.asserted {
            return;
        }
        if asserted {
            self.pin.set_high();
            self.pin.set_as_output(Speed::Low);
        } else {
            self.pin.set_as_input(Pull::None);
        }
        self.asserted = asserted;
    }
}
