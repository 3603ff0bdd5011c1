//! Platform-agnostic core of the arcade I/O board.
//!
//! Everything between the GPIO pins and the wire lives here, behind small
//! traits the board support code implements:
//!
//! - [`input`]: switch table and the [`PinBank`] read seam
//! - [`debounce`]: confirm-then-commit [`Scanner`]
//! - [`mapping`]: slot-to-action [`Mapper`]
//! - [`joystick`], [`keyboard`], [`jvs_switches`]: report encoders behind
//!   [`Encode`]
//! - [`output`]: [`Transport`] seam for USB endpoints and the JVS UART
//! - [`storage`]: [`ConfigStore`] over the [`BlockStorage`] seam
//! - [`pipeline`]: one scan/map/encode/send cycle per [`Pipeline::poll`]
//! - [`vendor`]: host configuration requests
//!
//! # Example
//!
//! ```rust
//! use arcade_core::{Encode, JoystickEncoder};
//! use arcade_proto::ActionSet;
//!
//! let encoder = JoystickEncoder::DUAL;
//! let report = encoder.encode(&ActionSet::neutral(), 0);
//! assert_eq!(report.as_slice(), &[1, 127, 127, 0, 0]);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Log through defmt and derive `defmt::Format`

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// This mod MUST go first, so that the others see its macros.
#[macro_use]
mod fmt;

pub mod debounce;
pub mod encode;
pub mod input;
pub mod joystick;
pub mod jvs_switches;
pub mod keyboard;
pub mod mapping;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod vendor;

pub use debounce::{DebounceState, Scanner, Timestamp, DEBOUNCE_TIME_MS, SLOT_COUNT};
pub use encode::{Encode, HidEncoder, JvsConfig, OutputMode, Report, MAX_REPORT_LEN};
pub use input::{LogicalInput, PinBank, PinHandle};
pub use joystick::{AxisRange, JoystickEncoder};
pub use jvs_switches::JvsSwitchEncoder;
pub use keyboard::{KeyboardEncoder, Rollover};
pub use mapping::Mapper;
pub use output::{Transport, TransportError};
pub use pipeline::{JvsLink, Link, Pipeline, PipelineError};
pub use storage::{BlockStorage, ConfigStore, LoadError, StorageError, StorageRegion};
pub use vendor::{
    authorize_config, authorize_reset, decode_config_write, ConfigCommand, ResetControl,
    ResetKind, SaveGuard, VendorError, VendorRequest, FIRMWARE_VERSION,
};
