//! On-chip flash behind the [`BlockStorage`] seam.

use arcade_core::{BlockStorage, StorageError};
use defmt::error;
use embassy_stm32::flash::{Blocking, Flash};

use crate::board::FLASH_PAGE_SIZE;

/// Blocking access to the internal flash. Offsets are relative to the
/// start of flash.
pub struct FlashStorage<'d> {
    flash: Flash<'d, Blocking>,
}

impl<'d> FlashStorage<'d> {
    pub fn new(flash: Flash<'d, Blocking>) -> Self {
        Self { flash }
    }
}

impl BlockStorage for FlashStorage<'_> {
    const ERASE_SIZE: u32 = FLASH_PAGE_SIZE;

    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        self.flash.blocking_read(addr, buf).map_err(|e| {
            error!("flash read at {=u32:#x} failed: {:?}", addr, e);
            StorageError::Read
        })
    }

    fn erase_block(&mut self, addr: u32) -> Result<(), StorageError> {
        self.flash
            .blocking_erase(addr, addr + FLASH_PAGE_SIZE)
            .map_err(|e| {
                error!("flash erase at {=u32:#x} failed: {:?}", addr, e);
                StorageError::Erase
            })
    }

    fn program(&mut self, addr: u32, word: u32) -> Result<(), StorageError> {
        self.flash
            .blocking_write(addr, &word.to_le_bytes())
            .map_err(|e| {
                error!("flash program at {=u32:#x} failed: {:?}", addr, e);
                StorageError::Program
            })
    }
}
