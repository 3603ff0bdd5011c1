//! JVS frame codec.
//!
//! On the wire a frame is:
//!
//! ```text
//! SYNC | dest | len | data[len - 1] | sum
//! ```
//!
//! where `sum` is the 8-bit additive checksum of `dest`, `len` and `data`.
//! Every byte after `SYNC` that equals `SYNC` or `ESCAPE` is sent as
//! `ESCAPE, byte - 1`.

use heapless::Vec;

/// Start-of-frame marker.
pub const SYNC: u8 = 0xE0;

/// Escape marker; the following byte is sent decremented by one.
pub const ESCAPE: u8 = 0xD0;

/// Destination addressing every board on the bus.
pub const BROADCAST: u8 = 0xFF;

/// Address of the bus master.
pub const MASTER_ADDR: u8 = 0x00;

/// Largest payload a frame may carry.
pub const MAX_PAYLOAD: usize = 252;

/// Worst-case encoded size (every byte after SYNC escaped).
pub const MAX_ENCODED_LEN: usize = 1 + 2 * (MAX_PAYLOAD + 3);

/// Frame payload storage.
pub type Payload = Vec<u8, MAX_PAYLOAD>;

/// Frame construction/encoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds [`MAX_PAYLOAD`].
    PayloadTooLong,
    /// Output buffer cannot hold the encoded frame.
    BufferTooSmall,
}

/// One unescaped JVS frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JvsFrame {
    pub destination: u8,
    pub payload: Payload,
}

impl JvsFrame {
    /// Frame with an empty payload.
    #[must_use]
    pub fn new(destination: u8) -> Self {
        Self {
            destination,
            payload: Vec::new(),
        }
    }

    /// Frame carrying a copy of `data`.
    pub fn with_payload(destination: u8, data: &[u8]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(data).map_err(|_| FrameError::PayloadTooLong)?;
        Ok(Self {
            destination,
            payload,
        })
    }

    /// Value of the length byte (payload plus checksum).
    #[inline]
    #[must_use]
    pub fn length_byte(&self) -> u8 {
        (self.payload.len() + 1) as u8
    }

    /// Additive checksum over destination, length and payload.
    #[must_use]
    pub fn checksum(&self) -> u8 {
        self.payload.iter().fold(
            self.destination.wrapping_add(self.length_byte()),
            |sum, &b| sum.wrapping_add(b),
        )
    }

    /// Write the escaped wire form into `out`, returning the byte count.
    pub fn encode(&self, out: &mut [u8]) -> Result<usize, FrameError> {
        let mut w = EscapeWriter { out, pos: 0 };
        w.raw(SYNC)?;
        w.escaped(self.destination)?;
        w.escaped(self.length_byte())?;
        for &b in self.payload.iter() {
            w.escaped(b)?;
        }
        w.escaped(self.checksum())?;
        Ok(w.pos)
    }
}

struct EscapeWriter<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl EscapeWriter<'_> {
    fn raw(&mut self, byte: u8) -> Result<(), FrameError> {
        let slot = self
            .out
            .get_mut(self.pos)
            .ok_or(FrameError::BufferTooSmall)?;
        *slot = byte;
        self.pos += 1;
        Ok(())
    }

    fn escaped(&mut self, byte: u8) -> Result<(), FrameError> {
        if byte == SYNC || byte == ESCAPE {
            self.raw(ESCAPE)?;
            self.raw(byte - 1)
        } else {
            self.raw(byte)
        }
    }
}

/// Receive state of a [`JvsDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecoderState {
    WaitSync,
    GetDestination,
    GetLength,
    GetData,
    GetChecksum,
}

/// Byte-at-a-time JVS frame decoder.
///
/// `SYNC` always restarts a frame, even in the middle of another one.
/// Frames with a bad checksum or impossible length are dropped and the
/// decoder waits for the next `SYNC`.
pub struct JvsDecoder {
    state: DecoderState,
    escape_next: bool,
    destination: u8,
    expected: usize,
    sum: u8,
    payload: Payload,
    dropped: u32,
}

impl JvsDecoder {
    /// Create a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DecoderState::WaitSync,
            escape_next: false,
            destination: 0,
            expected: 0,
            sum: 0,
            payload: Vec::new(),
            dropped: 0,
        }
    }

    /// Discard any partial frame.
    pub fn reset(&mut self) {
        self.state = DecoderState::WaitSync;
        self.escape_next = false;
        self.payload.clear();
    }

    /// Current receive state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Frames discarded so far (bad checksum or length).
    #[inline]
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Feed a byte to the decoder.
    ///
    /// Returns `Some(frame)` once a frame with a valid checksum completes.
    pub fn push_byte(&mut self, byte: u8) -> Option<JvsFrame> {
        if byte == SYNC {
            self.reset();
            self.state = DecoderState::GetDestination;
            return None;
        }
        if self.state == DecoderState::WaitSync {
            return None;
        }
        if byte == ESCAPE && !self.escape_next {
            self.escape_next = true;
            return None;
        }
        let byte = if self.escape_next {
            self.escape_next = false;
            byte.wrapping_add(1)
        } else {
            byte
        };

        match self.state {
            DecoderState::WaitSync => None,
            DecoderState::GetDestination => {
                self.destination = byte;
                self.sum = byte;
                self.state = DecoderState::GetLength;
                None
            }
            DecoderState::GetLength => {
                // Length counts the checksum byte, so zero is impossible
                if byte == 0 || usize::from(byte) - 1 > MAX_PAYLOAD {
                    self.drop_frame();
                    return None;
                }
                self.sum = self.sum.wrapping_add(byte);
                self.expected = usize::from(byte) - 1;
                self.state = if self.expected == 0 {
                    DecoderState::GetChecksum
                } else {
                    DecoderState::GetData
                };
                None
            }
            DecoderState::GetData => {
                // Cannot overflow: expected <= MAX_PAYLOAD
                let _ = self.payload.push(byte);
                self.sum = self.sum.wrapping_add(byte);
                if self.payload.len() >= self.expected {
                    self.state = DecoderState::GetChecksum;
                }
                None
            }
            DecoderState::GetChecksum => {
                if byte != self.sum {
                    self.drop_frame();
                    return None;
                }
                self.state = DecoderState::WaitSync;
                Some(JvsFrame {
                    destination: self.destination,
                    payload: core::mem::take(&mut self.payload),
                })
            }
        }
    }

    fn drop_frame(&mut self) {
        self.dropped = self.dropped.wrapping_add(1);
        self.reset();
    }
}

impl Default for JvsDecoder {
    fn default() -> Self {
        Self::new()
    }
}
