//! Report transport trait and error types.

use core::future::Future;

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Endpoint or UART write failed.
    Io,
    /// Host went away mid-transfer.
    Disconnected,
}

/// Async trait for the link reports leave on.
///
/// HID modes use [`send`](Transport::send) only. The JVS link also reads
/// request bytes through [`try_receive`](Transport::try_receive).
///
/// # `no_std` Compatibility
///
/// Implementations must not allocate.
pub trait Transport {
    /// Send one report or encoded frame.
    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), TransportError>>;

    /// Wait up to `timeout_ms` for one received byte.
    fn try_receive(&mut self, timeout_ms: u32) -> impl Future<Output = Option<u8>> {
        let _ = timeout_ms;
        core::future::ready(None)
    }

    /// Whether the host has configured the link (USB enumeration done).
    fn is_configured(&self) -> bool;
}
