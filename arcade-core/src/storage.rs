//! Persistent mapping storage.
//!
//! [`ConfigStore`] keeps one [`ConfigBlock`] in a reserved region of
//! non-volatile memory reached through [`BlockStorage`]. Saving erases the
//! region, programs it a word at a time and reads it back.

use arcade_proto::{ConfigBlock, ConfigError, MappingProfile, CONFIG_BLOCK_SIZE};

/// Error type for the raw storage primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    Read,
    Erase,
    Program,
    /// Read-back after programming did not match.
    Verify,
    /// Region is misaligned or too small for a block.
    OutOfRange,
}

/// Raw erase/program primitive, e.g. on-chip flash.
pub trait BlockStorage {
    /// Bytes cleared by one [`erase_block`](BlockStorage::erase_block).
    const ERASE_SIZE: u32;

    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Erase the erase unit starting at `addr`.
    fn erase_block(&mut self, addr: u32) -> Result<(), StorageError>;

    /// Program one little-endian word at a 4-byte aligned `addr`.
    fn program(&mut self, addr: u32, word: u32) -> Result<(), StorageError>;
}

/// Location of the mapping block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageRegion {
    /// Offset handed to the storage primitive.
    pub addr: u32,
    pub size: u32,
}

impl StorageRegion {
    fn check<S: BlockStorage>(&self) -> Result<(), StorageError> {
        let aligned = self.addr % 4 == 0 && self.addr % S::ERASE_SIZE == 0;
        if !aligned || (self.size as usize) < CONFIG_BLOCK_SIZE {
            return Err(StorageError::OutOfRange);
        }
        Ok(())
    }
}

/// Why a stored block could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Block read fine but failed validation.
    Invalid(ConfigError),
    Storage(StorageError),
}

impl From<ConfigError> for LoadError {
    fn from(err: ConfigError) -> Self {
        LoadError::Invalid(err)
    }
}

impl From<StorageError> for LoadError {
    fn from(err: StorageError) -> Self {
        LoadError::Storage(err)
    }
}

/// Loads, saves and resets the persisted mapping.
pub struct ConfigStore<S> {
    storage: S,
    region: StorageRegion,
    profile: MappingProfile,
}

impl<S: BlockStorage> ConfigStore<S> {
    /// `profile` picks the defaults used by [`reset`](Self::reset).
    pub fn new(storage: S, region: StorageRegion, profile: MappingProfile) -> Self {
        Self {
            storage,
            region,
            profile,
        }
    }

    /// Read and validate the stored block.
    pub fn load(&mut self) -> Result<ConfigBlock, LoadError> {
        self.region.check::<S>()?;
        let mut buf = [0u8; CONFIG_BLOCK_SIZE];
        self.storage.read_block(self.region.addr, &mut buf)?;
        Ok(ConfigBlock::from_bytes(&buf)?)
    }

    /// Persist `block`, replacing whatever the region held.
    pub fn save(&mut self, block: &ConfigBlock) -> Result<(), StorageError> {
        self.region.check::<S>()?;
        let bytes = block.to_bytes();
        let start = self.region.addr;
        let end = start + CONFIG_BLOCK_SIZE as u32;

        let mut page = start;
        while page < end {
            self.storage.erase_block(page)?;
            page += S::ERASE_SIZE;
        }

        for (addr, word) in (start..).step_by(4).zip(bytes.chunks_exact(4)) {
            let word = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            self.storage.program(addr, word)?;
        }

        let mut readback = [0u8; CONFIG_BLOCK_SIZE];
        self.storage.read_block(start, &mut readback)?;
        if readback != bytes {
            return Err(StorageError::Verify);
        }
        debug!("config saved at {=u32:#x}", start);
        Ok(())
    }

    /// Persist and return the built-in defaults.
    pub fn reset(&mut self) -> Result<ConfigBlock, StorageError> {
        let defaults = ConfigBlock::defaults(self.profile);
        self.save(&defaults)?;
        info!("config reset to defaults");
        Ok(defaults)
    }

    /// Boot-time load. An invalid or missing block is replaced by the
    /// built-in defaults, which are persisted.
    ///
    /// A storage failure leaves flash untouched and runs on the defaults
    /// for this boot only. A failed write of the defaults is logged; the
    /// defaults are still returned so the board stays usable.
    pub fn load_or_default(&mut self) -> ConfigBlock {
        match self.load() {
            Ok(block) => block,
            Err(LoadError::Storage(err)) => {
                error!("config read failed, using defaults: {}", err);
                ConfigBlock::defaults(self.profile)
            }
            Err(LoadError::Invalid(err)) => {
                warn!("stored config rejected: {}", err);
                match self.reset() {
                    Ok(defaults) => defaults,
                    Err(err) => {
                        error!("failed to persist default config: {}", err);
                        ConfigBlock::defaults(self.profile)
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn profile(&self) -> MappingProfile {
        self.profile
    }

    #[must_use]
    pub fn region(&self) -> StorageRegion {
        self.region
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }
}
