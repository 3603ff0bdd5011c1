//! JVS framing and I/O board command engine (chip-agnostic).
//!
//! JVS is the RS-485 multi-drop bus arcade system boards use to poll their
//! input boards. This crate covers the slave side:
//!
//! - [`frame`]: byte-stuffed frame codec ([`JvsFrame`], [`JvsDecoder`])
//! - [`io`]: command dispatch against live switch/coin state ([`JvsIo`])
//!
//! Neither module touches hardware. The caller pushes received bytes into
//! the decoder, hands complete frames to the engine, and encodes whatever
//! response comes back.
//!
//! ```
//! use jvs_proto::{cmd, BoardInfo, JvsDecoder, JvsFrame, JvsIo, BROADCAST, MAX_ENCODED_LEN};
//!
//! let mut decoder = JvsDecoder::new();
//! let mut io = JvsIo::new(BoardInfo::DEFAULT);
//!
//! let mut wire = [0u8; MAX_ENCODED_LEN];
//! let request = JvsFrame::with_payload(BROADCAST, &[cmd::ASSIGN_ADDR, 0x01]).unwrap();
//! let len = request.encode(&mut wire).unwrap();
//!
//! let frame = wire[..len].iter().find_map(|&b| decoder.push_byte(b)).unwrap();
//! let response = io.handle(&frame).unwrap();
//! let len = response.encode(&mut wire).unwrap();
//! assert_eq!(&wire[..len], &[0xE0, 0x00, 0x03, 0x01, 0x01, 0x05]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod frame;
pub mod io;

pub use frame::{
    DecoderState, FrameError, JvsDecoder, JvsFrame, Payload, BROADCAST, ESCAPE, MASTER_ADDR,
    MAX_ENCODED_LEN, MAX_PAYLOAD, SYNC,
};
pub use io::{
    cmd, BoardInfo, BusState, JvsIo, COIN_MAX, REPORT_PARAM_ERROR, REPORT_SUCCESS, RESET_ARG,
    STATUS_OVERFLOW, STATUS_SUCCESS, STATUS_UNSUPPORTED,
};
