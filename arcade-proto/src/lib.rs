//! Arcade input action types and the persisted mapping block format.
//!
//! This crate holds the data shared by every part of the arcade I/O board:
//!
//! - **Types**: what players are doing after mapping
//!   - [`Buttons`] - Pressed-button bitfield
//!   - [`AxisDir`] / [`Axes`] - Digital stick directions
//!   - [`KeySet`] - Pressed keyboard usage codes
//!   - [`ActionSet`] - All players for one poll cycle
//!
//! - **Configuration**: the switch-to-function table kept in flash
//!   - [`ConfigBlock`] - Versioned, CRC-sealed mapping block
//!   - [`MappingEntry`] / [`Function`] - One slot binding
//!
//! - **Checksum**: [`calculate_crc32`]
//!
//! # Example
//!
//! ```
//! use arcade_proto::{ConfigBlock, Function, MappingProfile};
//!
//! let block = ConfigBlock::defaults(MappingProfile::Joystick);
//! let bytes = block.to_bytes();
//!
//! let loaded = ConfigBlock::from_bytes(&bytes).unwrap();
//! assert_eq!(loaded.players[0][0].function, Function::AxisLeft);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod crc;
pub mod types;

pub use config::{
    ConfigBlock, ConfigError, Function, MappingEntry, MappingProfile, CONFIG_BLOCK_SIZE,
    CONFIG_MAGIC, CONFIG_VERSION, MAX_PINS_PER_PLAYER,
};
pub use crc::calculate_crc32;
pub use types::{ActionSet, AxisDir, Axes, Buttons, KeySet, Level, PlayerActions, MAX_PLAYERS};
