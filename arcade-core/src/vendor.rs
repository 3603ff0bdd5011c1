//! USB vendor control requests.
//!
//! The host configuration tool reads and writes the mapping block and can
//! reboot the board, optionally into the ROM bootloader. This module holds
//! the request model; the firmware wires it to the USB control pipe.
//!
//! | bRequest | Request | Direction |
//! |----------|---------|-----------|
//! | `0xAA` | get firmware version | IN |
//! | `0xBB` | enter bootloader (`wValue = 0xB007`) | OUT |
//! | `0xCC` | soft reset | OUT |
//! | `0xC0` | read mapping block | IN |
//! | `0xC1` | write mapping block | OUT |
//! | `0xC2` | restore default mapping | OUT |

use crate::storage::{BlockStorage, ConfigStore, StorageError};
use arcade_proto::{ConfigBlock, ConfigError, CONFIG_BLOCK_SIZE};
use core::sync::atomic::{AtomicBool, Ordering};

pub const REQ_GET_VERSION: u8 = 0xAA;
pub const REQ_ENTER_BOOTLOADER: u8 = 0xBB;
pub const REQ_RESET_DEVICE: u8 = 0xCC;
pub const REQ_CONFIG_READ: u8 = 0xC0;
pub const REQ_CONFIG_WRITE: u8 = 0xC1;
pub const REQ_CONFIG_RESET: u8 = 0xC2;

/// `wValue` required by [`REQ_ENTER_BOOTLOADER`].
pub const BOOTLOADER_MAGIC: u16 = 0xB007;

/// `[major, minor, patch]` answered to [`REQ_GET_VERSION`].
pub const FIRMWARE_VERSION: [u8; 3] = [1, 0, 0];

/// Error type for vendor requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VendorError {
    UnknownRequest,
    /// Bootloader request without the magic `wValue`.
    BadMagic,
    /// Data stage length does not match the block size.
    BadLength,
    /// A save is in progress.
    Busy,
    InvalidConfig(ConfigError),
}

impl From<ConfigError> for VendorError {
    fn from(err: ConfigError) -> Self {
        VendorError::InvalidConfig(err)
    }
}

/// A decoded vendor request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VendorRequest {
    GetVersion,
    EnterBootloader,
    ResetDevice,
    ConfigRead,
    ConfigWrite,
    ConfigReset,
}

impl VendorRequest {
    /// Decode `bRequest`, checking `wValue` where it matters.
    pub fn parse(request: u8, value: u16) -> Result<Self, VendorError> {
        match request {
            REQ_GET_VERSION => Ok(Self::GetVersion),
            REQ_ENTER_BOOTLOADER if value == BOOTLOADER_MAGIC => Ok(Self::EnterBootloader),
            REQ_ENTER_BOOTLOADER => Err(VendorError::BadMagic),
            REQ_RESET_DEVICE => Ok(Self::ResetDevice),
            REQ_CONFIG_READ => Ok(Self::ConfigRead),
            REQ_CONFIG_WRITE => Ok(Self::ConfigWrite),
            REQ_CONFIG_RESET => Ok(Self::ConfigReset),
            _ => Err(VendorError::UnknownRequest),
        }
    }

    /// Device-to-host requests.
    #[must_use]
    pub fn is_in(self) -> bool {
        matches!(self, Self::GetVersion | Self::ConfigRead)
    }
}

/// Check a CONFIG_WRITE data stage.
///
/// The CRC field is ignored; the block is resealed when saved.
pub fn decode_config_write(data: &[u8]) -> Result<ConfigBlock, VendorError> {
    if data.len() != CONFIG_BLOCK_SIZE {
        return Err(VendorError::BadLength);
    }
    Ok(ConfigBlock::from_host_bytes(data)?)
}

/// Store change requested by the host, applied between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigCommand {
    Write(ConfigBlock),
    Reset,
}

impl ConfigCommand {
    /// Persist the change and return the table now in effect.
    pub fn apply<S: BlockStorage>(
        self,
        store: &mut ConfigStore<S>,
    ) -> Result<ConfigBlock, StorageError> {
        match self {
            ConfigCommand::Write(block) => {
                store.save(&block)?;
                info!("config written by host");
                Ok(block)
            }
            ConfigCommand::Reset => store.reset(),
        }
    }

    /// Apply a command queued through [`authorize_config`] and release the
    /// guard it holds.
    pub fn apply_claimed<S: BlockStorage>(
        self,
        store: &mut ConfigStore<S>,
        guard: &SaveGuard,
    ) -> Result<ConfigBlock, StorageError> {
        let result = self.apply(store);
        guard.finish();
        result
    }
}

/// Deliberate reboot flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetKind {
    /// Reboot into the ROM bootloader.
    Bootloader,
    Soft,
}

/// Board hook that performs a deliberate reboot.
pub trait ResetControl {
    /// Reboot as requested. Never returns.
    fn reset(&mut self, kind: ResetKind) -> !;
}

/// Held from the moment a config command is queued until it has been
/// saved; resets are refused meanwhile.
pub struct SaveGuard {
    busy: AtomicBool,
}

impl SaveGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// Claim the guard. Returns `false` if it is already held.
    pub fn try_begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn finish(&self) {
        self.busy.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Default for SaveGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Claim the save guard for a command the main loop will apply later.
/// Only one command may be outstanding.
pub fn authorize_config(
    command: ConfigCommand,
    guard: &SaveGuard,
) -> Result<ConfigCommand, VendorError> {
    if !guard.try_begin() {
        warn!("config command refused, previous one still pending");
        return Err(VendorError::Busy);
    }
    Ok(command)
}

/// Gate a reset request on the save guard.
pub fn authorize_reset(kind: ResetKind, guard: &SaveGuard) -> Result<ResetKind, VendorError> {
    if guard.is_busy() {
        warn!("reset refused while saving: {}", kind);
        return Err(VendorError::Busy);
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageRegion;
    use arcade_proto::{Function, MappingEntry, MappingProfile};

    struct RamStorage {
        mem: [u8; 1024],
    }

    impl BlockStorage for RamStorage {
        const ERASE_SIZE: u32 = 1024;

        fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), StorageError> {
            let start = addr as usize;
            buf.copy_from_slice(&self.mem[start..start + buf.len()]);
            Ok(())
        }

        fn erase_block(&mut self, _addr: u32) -> Result<(), StorageError> {
            self.mem.fill(0xFF);
            Ok(())
        }

        fn program(&mut self, addr: u32, word: u32) -> Result<(), StorageError> {
            let start = addr as usize;
            self.mem[start..start + 4].copy_from_slice(&word.to_le_bytes());
            Ok(())
        }
    }

    fn store() -> ConfigStore<RamStorage> {
        ConfigStore::new(
            RamStorage { mem: [0xFF; 1024] },
            StorageRegion {
                addr: 0,
                size: 1024,
            },
            MappingProfile::Keyboard,
        )
    }

    #[test]
    fn test_parse_requests() {
        assert_eq!(VendorRequest::parse(0xAA, 0), Ok(VendorRequest::GetVersion));
        assert_eq!(
            VendorRequest::parse(0xBB, 0xB007),
            Ok(VendorRequest::EnterBootloader)
        );
        assert_eq!(VendorRequest::parse(0xBB, 0x1234), Err(VendorError::BadMagic));
        assert_eq!(VendorRequest::parse(0xC1, 0), Ok(VendorRequest::ConfigWrite));
        assert_eq!(VendorRequest::parse(0x42, 0), Err(VendorError::UnknownRequest));
        assert!(VendorRequest::ConfigRead.is_in());
        assert!(!VendorRequest::ConfigReset.is_in());
    }

    #[test]
    fn test_config_write_checks_length_and_header() {
        let block = ConfigBlock::defaults(MappingProfile::Joystick);
        let bytes = block.to_bytes();
        assert_eq!(
            decode_config_write(&bytes[..100]),
            Err(VendorError::BadLength)
        );

        let mut bad = bytes;
        bad[0] = 0;
        assert_eq!(
            decode_config_write(&bad),
            Err(VendorError::InvalidConfig(ConfigError::BadMagic))
        );

        // Host tools may leave the CRC zeroed
        let mut unsealed = bytes;
        unsealed[CONFIG_BLOCK_SIZE - 4..].fill(0);
        assert_eq!(decode_config_write(&unsealed), Ok(block));
    }

    #[test]
    fn test_write_command_persists_sealed_block() {
        let mut store = store();
        let mut block = ConfigBlock::defaults(MappingProfile::Joystick);
        block.players[0][5] = MappingEntry::new(5, Function::KeyCode(0x2C), "Space");

        let active = ConfigCommand::Write(block).apply(&mut store).unwrap();
        assert_eq!(active, block);
        assert_eq!(store.load(), Ok(block));
    }

    #[test]
    fn test_reset_command_restores_profile_defaults() {
        let mut store = store();
        ConfigCommand::Write(ConfigBlock::defaults(MappingProfile::Joystick))
            .apply(&mut store)
            .unwrap();
        let active = ConfigCommand::Reset.apply(&mut store).unwrap();
        assert_eq!(active, ConfigBlock::defaults(MappingProfile::Keyboard));
        assert_eq!(store.load(), Ok(active));
    }

    #[test]
    fn test_reset_refused_while_saving() {
        let guard = SaveGuard::new();
        assert_eq!(
            authorize_reset(ResetKind::Soft, &guard),
            Ok(ResetKind::Soft)
        );

        assert!(guard.try_begin());
        assert!(!guard.try_begin());
        assert_eq!(
            authorize_reset(ResetKind::Bootloader, &guard),
            Err(VendorError::Busy)
        );
        guard.finish();
        assert!(!guard.is_busy());
    }

    #[test]
    fn test_queued_command_blocks_reset_until_applied() {
        let guard = SaveGuard::new();
        let mut store = store();

        let command = authorize_config(ConfigCommand::Reset, &guard).unwrap();
        assert_eq!(
            authorize_reset(ResetKind::Soft, &guard),
            Err(VendorError::Busy)
        );
        assert_eq!(
            authorize_config(ConfigCommand::Reset, &guard),
            Err(VendorError::Busy)
        );

        let active = command.apply_claimed(&mut store, &guard).unwrap();
        assert_eq!(active, ConfigBlock::defaults(MappingProfile::Keyboard));
        assert!(!guard.is_busy());
        assert_eq!(
            authorize_reset(ResetKind::Soft, &guard),
            Ok(ResetKind::Soft)
        );
    }

    #[test]
    fn test_failed_apply_releases_guard() {
        let guard = SaveGuard::new();
        let mut store = ConfigStore::new(
            RamStorage { mem: [0xFF; 1024] },
            StorageRegion { addr: 0, size: 512 },
            MappingProfile::Keyboard,
        );
        let command = authorize_config(ConfigCommand::Reset, &guard).unwrap();
        assert_eq!(
            command.apply_claimed(&mut store, &guard),
            Err(StorageError::OutOfRange)
        );
        assert!(!guard.is_busy());
    }
}
