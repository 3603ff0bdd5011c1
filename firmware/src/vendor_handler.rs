//! Vendor control requests on the USB default pipe.
//!
//! Requests are validated here and handed to the main loop through
//! signals; nothing touches flash from the USB task.

use arcade_core::{
    authorize_config, authorize_reset, decode_config_write, ConfigCommand, ResetKind, SaveGuard,
    VendorError, VendorRequest, FIRMWARE_VERSION,
};
use arcade_proto::{ConfigBlock, CONFIG_BLOCK_SIZE};
use core::cell::RefCell;
use core::sync::atomic::Ordering;
use defmt::{info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_usb::control::{InResponse, OutResponse, Request, RequestType};
use embassy_usb::Handler;

use crate::usb_output::USB_CONFIGURED;

/// Held from the moment a config command is queued until the main loop
/// has saved it.
pub static SAVE_GUARD: SaveGuard = SaveGuard::new();

/// Pending store change, applied at the next loop boundary.
pub static CONFIG_COMMAND: Signal<CriticalSectionRawMutex, ConfigCommand> = Signal::new();

/// Requested reboot, carried out by the reset task.
pub static RESET_REQUEST: Signal<CriticalSectionRawMutex, ResetKind> = Signal::new();

/// Serialized form of the table in effect, answered to CONFIG_READ.
static ACTIVE_CONFIG: Mutex<CriticalSectionRawMutex, RefCell<[u8; CONFIG_BLOCK_SIZE]>> =
    Mutex::new(RefCell::new([0; CONFIG_BLOCK_SIZE]));

/// Publish the table now in effect.
pub fn publish_active_config(block: &ConfigBlock) {
    let bytes = block.to_bytes();
    ACTIVE_CONFIG.lock(|active| *active.borrow_mut() = bytes);
}

/// Control handler for the configuration tool. Also tracks whether the
/// host has configured the device.
pub struct VendorHandler;

impl VendorHandler {
    fn out_request(&mut self, request: VendorRequest, data: &[u8]) -> Result<(), VendorError> {
        match request {
            VendorRequest::EnterBootloader => {
                RESET_REQUEST.signal(authorize_reset(ResetKind::Bootloader, &SAVE_GUARD)?);
            }
            VendorRequest::ResetDevice => {
                RESET_REQUEST.signal(authorize_reset(ResetKind::Soft, &SAVE_GUARD)?);
            }
            VendorRequest::ConfigWrite => {
                let block = decode_config_write(data)?;
                let command = authorize_config(ConfigCommand::Write(block), &SAVE_GUARD)?;
                CONFIG_COMMAND.signal(command);
            }
            VendorRequest::ConfigReset => {
                CONFIG_COMMAND.signal(authorize_config(ConfigCommand::Reset, &SAVE_GUARD)?);
            }
            VendorRequest::GetVersion | VendorRequest::ConfigRead => {
                return Err(VendorError::UnknownRequest);
            }
        }
        Ok(())
    }
}

impl Handler for VendorHandler {
    fn configured(&mut self, configured: bool) {
        USB_CONFIGURED.store(configured, Ordering::Release);
        info!("USB configured: {}", configured);
    }

    fn reset(&mut self) {
        USB_CONFIGURED.store(false, Ordering::Release);
    }

    fn control_out(&mut self, req: Request, data: &[u8]) -> Option<OutResponse> {
        if req.request_type != RequestType::Vendor {
            return None;
        }
        let result = VendorRequest::parse(req.request, req.value)
            .and_then(|request| self.out_request(request, data));
        match result {
            Ok(()) => Some(OutResponse::Accepted),
            Err(e) => {
                warn!("vendor request {=u8:#x} rejected: {}", req.request, e);
                Some(OutResponse::Rejected)
            }
        }
    }

    fn control_in<'a>(&'a mut self, req: Request, buf: &'a mut [u8]) -> Option<InResponse<'a>> {
        if req.request_type != RequestType::Vendor {
            return None;
        }
        let len = match VendorRequest::parse(req.request, req.value) {
            Ok(VendorRequest::GetVersion) => {
                let len = FIRMWARE_VERSION.len().min(buf.len());
                buf[..len].copy_from_slice(&FIRMWARE_VERSION[..len]);
                len
            }
            Ok(VendorRequest::ConfigRead) => {
                let len = CONFIG_BLOCK_SIZE.min(buf.len());
                ACTIVE_CONFIG.lock(|active| buf[..len].copy_from_slice(&active.borrow()[..len]));
                len
            }
            Ok(_) | Err(_) => {
                warn!("vendor IN request {=u8:#x} rejected", req.request);
                return Some(InResponse::Rejected);
            }
        };
        Some(InResponse::Accepted(&buf[..len.min(usize::from(req.length))]))
    }
}
