//! JVS I/O board command engine.
//!
//! [`JvsIo`] answers the master's requests from a live copy of the switch
//! and coin state. It holds no transport: feed it decoded frames and send
//! back whatever it returns.

use crate::frame::{JvsFrame, BROADCAST, MASTER_ADDR};

/// Command codes.
pub mod cmd {
    pub const RESET: u8 = 0xF0;
    pub const ASSIGN_ADDR: u8 = 0xF1;
    pub const REQUEST_ID: u8 = 0x10;
    pub const CMD_VERSION: u8 = 0x11;
    pub const JVS_VERSION: u8 = 0x12;
    pub const COMM_VERSION: u8 = 0x13;
    pub const CAPABILITIES: u8 = 0x14;
    pub const CONVEY_ID: u8 = 0x15;
    pub const READ_SWITCHES: u8 = 0x20;
    pub const READ_COINS: u8 = 0x21;
    pub const READ_ANALOG: u8 = 0x22;
    pub const RETRANSMIT: u8 = 0x2F;
    pub const DECREASE_COIN: u8 = 0x30;
}

/// Argument that must follow [`cmd::RESET`].
pub const RESET_ARG: u8 = 0xD9;

/// Frame-level status (first payload byte of every response).
pub const STATUS_SUCCESS: u8 = 0x01;
pub const STATUS_UNSUPPORTED: u8 = 0x02;
pub const STATUS_OVERFLOW: u8 = 0x04;

/// Per-command report (first byte of each command's answer).
pub const REPORT_SUCCESS: u8 = 0x01;
pub const REPORT_PARAM_ERROR: u8 = 0x02;

const CAP_END: u8 = 0x00;
const CAP_PLAYERS: u8 = 0x01;
const CAP_COINS: u8 = 0x02;

/// Coin counters are 14-bit on the wire.
pub const COIN_MAX: u16 = 0x3FFF;

/// Players whose switches are tracked.
pub const MAX_SWITCH_PLAYERS: usize = 2;

/// Coin slots tracked.
pub const MAX_COIN_SLOTS: usize = 2;

/// Identity and capabilities reported to the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardInfo {
    /// Identification string answered to REQUEST_ID.
    pub id: &'static str,
    pub command_version: u8,
    pub jvs_version: u8,
    pub comm_version: u8,
    pub players: u8,
    pub switches_per_player: u8,
    pub coin_slots: u8,
}

impl BoardInfo {
    pub const DEFAULT: Self = Self {
        id: "OpenArcade;Arcade IO Board;Ver1.00",
        command_version: 0x11,
        jvs_version: 0x30,
        comm_version: 0x10,
        players: 2,
        switches_per_player: 16,
        coin_slots: 2,
    };
}

impl Default for BoardInfo {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Bus enumeration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusState {
    Uninitialized,
    Addressed(u8),
}

enum Flow {
    Next(usize),
    Retransmit,
    Stop,
}

struct Response {
    frame: JvsFrame,
    overflow: bool,
}

impl Response {
    fn new() -> Self {
        let mut frame = JvsFrame::new(MASTER_ADDR);
        let _ = frame.payload.push(STATUS_SUCCESS);
        Self {
            frame,
            overflow: false,
        }
    }

    fn push(&mut self, byte: u8) {
        if self.frame.payload.push(byte).is_err() {
            self.overflow = true;
        }
    }

    fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    fn status_only(&mut self, status: u8) {
        self.frame.payload.clear();
        self.push(status);
    }

    fn finish(mut self) -> JvsFrame {
        if self.overflow {
            self.status_only(STATUS_OVERFLOW);
        }
        self.frame
    }
}

/// JVS slave state machine.
///
/// # Example
///
/// ```
/// use jvs_proto::{cmd, BoardInfo, JvsFrame, JvsIo, BROADCAST};
///
/// let mut io = JvsIo::new(BoardInfo::DEFAULT);
/// let assign = JvsFrame::with_payload(BROADCAST, &[cmd::ASSIGN_ADDR, 0x01]).unwrap();
/// let response = io.handle(&assign).unwrap();
/// assert_eq!(response.payload.as_slice(), &[0x01, 0x01]);
/// assert!(io.sense_line());
/// ```
pub struct JvsIo {
    info: BoardInfo,
    bus: BusState,
    system: u8,
    switches: [u16; MAX_SWITCH_PLAYERS],
    coins: [u16; MAX_COIN_SLOTS],
    last_response: Option<JvsFrame>,
}

impl JvsIo {
    /// Create an unaddressed board.
    #[must_use]
    pub fn new(info: BoardInfo) -> Self {
        Self {
            info,
            bus: BusState::Uninitialized,
            system: 0,
            switches: [0; MAX_SWITCH_PLAYERS],
            coins: [0; MAX_COIN_SLOTS],
            last_response: None,
        }
    }

    #[must_use]
    pub fn info(&self) -> &BoardInfo {
        &self.info
    }

    #[must_use]
    pub fn bus_state(&self) -> BusState {
        self.bus
    }

    /// Assigned bus address, if any.
    #[must_use]
    pub fn device_id(&self) -> Option<u8> {
        match self.bus {
            BusState::Addressed(id) => Some(id),
            BusState::Uninitialized => None,
        }
    }

    /// Whether the sense line should be asserted.
    #[must_use]
    pub fn sense_line(&self) -> bool {
        matches!(self.bus, BusState::Addressed(_))
    }

    /// Set one switch bit.
    ///
    /// Player 0 is the system byte (bit 7 is TEST); players `1..=N` are the
    /// 16-bit player words, most significant byte sent first.
    pub fn set_switch(&mut self, player: u8, bit: u8, pressed: bool) {
        if player == 0 {
            if bit < 8 {
                let mask = 1u8 << bit;
                if pressed {
                    self.system |= mask;
                } else {
                    self.system &= !mask;
                }
            }
            return;
        }
        let Some(word) = self.switches.get_mut(usize::from(player) - 1) else {
            return;
        };
        if bit < 16 {
            let mask = 1u16 << bit;
            if pressed {
                *word |= mask;
            } else {
                *word &= !mask;
            }
        }
    }

    /// Replace a whole player word (`player` is 0-based here).
    pub fn set_player_switches(&mut self, player: usize, word: u16) {
        if let Some(slot) = self.switches.get_mut(player) {
            *slot = word;
        }
    }

    /// Replace the system switch byte.
    pub fn set_system_switches(&mut self, byte: u8) {
        self.system = byte;
    }

    /// Add one coin to `slot` (0-based), saturating at [`COIN_MAX`].
    pub fn increment_coin(&mut self, slot: usize) {
        if let Some(count) = self.coins.get_mut(slot) {
            *count = count.saturating_add(1).min(COIN_MAX);
        }
    }

    /// Coin count of `slot` (0-based).
    #[must_use]
    pub fn coins(&self, slot: usize) -> u16 {
        self.coins.get(slot).copied().unwrap_or(0)
    }

    fn is_addressed_to(&self, destination: u8) -> bool {
        destination == BROADCAST || Some(destination) == self.device_id()
    }

    /// Process one request frame.
    ///
    /// Returns the response to transmit, or `None` when the frame is for
    /// another board.
    pub fn handle(&mut self, request: &JvsFrame) -> Option<&JvsFrame> {
        if !self.is_addressed_to(request.destination) {
            return None;
        }

        let data = request.payload.as_slice();
        let mut response = Response::new();
        let mut index = 0;
        while index < data.len() {
            match self.dispatch(data[index], &data[index + 1..], &mut response) {
                Flow::Next(consumed) => index += consumed,
                Flow::Stop => break,
                Flow::Retransmit => {
                    let previous: &JvsFrame = self
                        .last_response
                        .get_or_insert_with(|| Response::new().finish());
                    return Some(previous);
                }
            }
        }

        self.last_response = Some(response.finish());
        self.last_response.as_ref()
    }

    fn dispatch(&mut self, command: u8, args: &[u8], out: &mut Response) -> Flow {
        match command {
            cmd::RESET => {
                let Some(&arg) = args.first() else {
                    return param_error(out);
                };
                if arg == RESET_ARG {
                    self.bus = BusState::Uninitialized;
                }
                Flow::Next(2)
            }
            cmd::ASSIGN_ADDR => {
                let Some(&address) = args.first() else {
                    return param_error(out);
                };
                self.bus = BusState::Addressed(address);
                out.push(REPORT_SUCCESS);
                Flow::Next(2)
            }
            cmd::REQUEST_ID => {
                out.push(REPORT_SUCCESS);
                out.extend(self.info.id.as_bytes());
                out.push(0);
                Flow::Next(1)
            }
            cmd::CMD_VERSION => {
                out.extend(&[REPORT_SUCCESS, self.info.command_version]);
                Flow::Next(1)
            }
            cmd::JVS_VERSION => {
                out.extend(&[REPORT_SUCCESS, self.info.jvs_version]);
                Flow::Next(1)
            }
            cmd::COMM_VERSION => {
                out.extend(&[REPORT_SUCCESS, self.info.comm_version]);
                Flow::Next(1)
            }
            cmd::CAPABILITIES => {
                out.extend(&[
                    REPORT_SUCCESS,
                    CAP_PLAYERS,
                    self.info.players,
                    self.info.switches_per_player,
                    0,
                    CAP_COINS,
                    self.info.coin_slots,
                    0,
                    0,
                    CAP_END,
                ]);
                Flow::Next(1)
            }
            cmd::CONVEY_ID => {
                let Some(end) = args.iter().position(|&b| b == 0) else {
                    return param_error(out);
                };
                out.push(REPORT_SUCCESS);
                Flow::Next(end + 2)
            }
            cmd::READ_SWITCHES => {
                let &[players, bytes, ..] = args else {
                    return param_error(out);
                };
                out.push(REPORT_SUCCESS);
                out.push(self.system);
                // Most significant byte first; bytes past the word are zero
                for player in 0..usize::from(players) {
                    let word = self.switches.get(player).copied().unwrap_or(0);
                    for b in 0..usize::from(bytes) {
                        out.push(word.to_be_bytes().get(b).copied().unwrap_or(0));
                    }
                }
                Flow::Next(3)
            }
            cmd::READ_COINS => {
                let Some(&slots) = args.first() else {
                    return param_error(out);
                };
                out.push(REPORT_SUCCESS);
                for slot in 0..usize::from(slots) {
                    let count = self.coins(slot);
                    out.push(((count >> 8) & 0x3F) as u8);
                    out.push((count & 0xFF) as u8);
                }
                Flow::Next(2)
            }
            cmd::DECREASE_COIN => {
                let &[slot, hi, lo, ..] = args else {
                    return param_error(out);
                };
                let amount = u16::from_be_bytes([hi, lo]);
                match usize::from(slot)
                    .checked_sub(1)
                    .and_then(|s| self.coins.get_mut(s))
                {
                    Some(count) => {
                        *count = count.saturating_sub(amount);
                        out.push(REPORT_SUCCESS);
                    }
                    None => out.push(REPORT_PARAM_ERROR),
                }
                Flow::Next(4)
            }
            cmd::RETRANSMIT => Flow::Retransmit,
            _ => {
                out.status_only(STATUS_UNSUPPORTED);
                Flow::Stop
            }
        }
    }
}

fn param_error(out: &mut Response) -> Flow {
    out.push(REPORT_PARAM_ERROR);
    Flow::Stop
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(dest: u8, data: &[u8]) -> JvsFrame {
        JvsFrame::with_payload(dest, data).unwrap()
    }

    fn addressed(id: u8) -> JvsIo {
        let mut io = JvsIo::new(BoardInfo::DEFAULT);
        io.handle(&request(BROADCAST, &[cmd::ASSIGN_ADDR, id]));
        io
    }

    fn payload(io: &mut JvsIo, dest: u8, data: &[u8]) -> heapless::Vec<u8, 252> {
        io.handle(&request(dest, data)).unwrap().payload.clone()
    }

    #[test]
    fn test_reset_then_assign_then_read_switches() {
        let mut io = JvsIo::new(BoardInfo::DEFAULT);
        assert!(!io.sense_line());

        let reset = payload(&mut io, BROADCAST, &[cmd::RESET, RESET_ARG]);
        assert_eq!(reset.as_slice(), &[STATUS_SUCCESS]);
        assert_eq!(io.device_id(), None);

        let assign = payload(&mut io, BROADCAST, &[cmd::ASSIGN_ADDR, 0x01]);
        assert_eq!(assign.as_slice(), &[STATUS_SUCCESS, REPORT_SUCCESS]);
        assert_eq!(io.device_id(), Some(0x01));
        assert!(io.sense_line());

        let switches = payload(&mut io, 0x01, &[cmd::READ_SWITCHES, 1, 1]);
        assert_eq!(switches.as_slice(), &[STATUS_SUCCESS, REPORT_SUCCESS, 0x00, 0x00]);
    }

    #[test]
    fn test_reset_clears_address_and_sense() {
        let mut io = addressed(0x01);
        io.handle(&request(BROADCAST, &[cmd::RESET, RESET_ARG]));
        assert_eq!(io.bus_state(), BusState::Uninitialized);
        assert!(!io.sense_line());
        // No longer answers its old address
        assert!(io.handle(&request(0x01, &[cmd::CMD_VERSION])).is_none());
    }

    #[test]
    fn test_reset_requires_magic_argument() {
        let mut io = addressed(0x01);
        io.handle(&request(BROADCAST, &[cmd::RESET, 0x00]));
        assert_eq!(io.device_id(), Some(0x01));
    }

    #[test]
    fn test_other_address_ignored() {
        let mut io = addressed(0x01);
        assert!(io.handle(&request(0x02, &[cmd::REQUEST_ID])).is_none());
        assert!(JvsIo::new(BoardInfo::DEFAULT)
            .handle(&request(0x01, &[cmd::REQUEST_ID]))
            .is_none());
    }

    #[test]
    fn test_request_id_is_nul_terminated() {
        let mut io = addressed(0x01);
        let out = payload(&mut io, 0x01, &[cmd::REQUEST_ID]);
        let id = BoardInfo::DEFAULT.id.as_bytes();
        assert_eq!(out[0], STATUS_SUCCESS);
        assert_eq!(out[1], REPORT_SUCCESS);
        assert_eq!(&out[2..2 + id.len()], id);
        assert_eq!(out[2 + id.len()], 0);
        assert_eq!(out.len(), 3 + id.len());
    }

    #[test]
    fn test_versions_and_capabilities_in_one_frame() {
        let mut io = addressed(0x01);
        let out = payload(
            &mut io,
            0x01,
            &[
                cmd::CMD_VERSION,
                cmd::JVS_VERSION,
                cmd::COMM_VERSION,
                cmd::CAPABILITIES,
            ],
        );
        assert_eq!(
            out.as_slice(),
            &[
                STATUS_SUCCESS,
                REPORT_SUCCESS,
                0x11,
                REPORT_SUCCESS,
                0x30,
                REPORT_SUCCESS,
                0x10,
                REPORT_SUCCESS,
                CAP_PLAYERS,
                2,
                16,
                0,
                CAP_COINS,
                2,
                0,
                0,
                CAP_END,
            ]
        );
    }

    #[test]
    fn test_read_switches_two_players_two_bytes() {
        let mut io = addressed(0x01);
        io.set_switch(0, 7, true);
        io.set_switch(1, 15, true);
        io.set_switch(1, 9, true);
        io.set_player_switches(1, 0x00A5);
        let out = payload(&mut io, 0x01, &[cmd::READ_SWITCHES, 2, 2]);
        assert_eq!(
            out.as_slice(),
            &[STATUS_SUCCESS, REPORT_SUCCESS, 0x80, 0x82, 0x00, 0x00, 0xA5]
        );
    }

    #[test]
    fn test_read_switches_unknown_player_reads_zero() {
        let mut io = addressed(0x01);
        io.set_player_switches(0, 0xFFFF);
        let out = payload(&mut io, 0x01, &[cmd::READ_SWITCHES, 3, 3]);
        assert_eq!(
            out.as_slice(),
            &[STATUS_SUCCESS, REPORT_SUCCESS, 0, 0xFF, 0xFF, 0, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_read_switches_one_byte_is_high_byte() {
        let mut io = addressed(0x01);
        // START, LEFT, PUSH1
        io.set_player_switches(0, 0x8A00);
        let out = payload(&mut io, 0x01, &[cmd::READ_SWITCHES, 1, 1]);
        assert_eq!(out.as_slice(), &[STATUS_SUCCESS, REPORT_SUCCESS, 0, 0x8A]);
    }

    #[test]
    fn test_coins_saturate_and_encode() {
        let mut io = addressed(0x01);
        for _ in 0..300 {
            io.increment_coin(0);
        }
        for _ in 0..(u32::from(COIN_MAX) + 10) {
            io.increment_coin(1);
        }
        io.increment_coin(5);
        assert_eq!(io.coins(0), 300);
        assert_eq!(io.coins(1), COIN_MAX);

        let out = payload(&mut io, 0x01, &[cmd::READ_COINS, 2]);
        assert_eq!(
            out.as_slice(),
            &[STATUS_SUCCESS, REPORT_SUCCESS, 0x01, 0x2C, 0x3F, 0xFF]
        );
    }

    #[test]
    fn test_decrease_coin() {
        let mut io = addressed(0x01);
        for _ in 0..5 {
            io.increment_coin(0);
        }
        let out = payload(&mut io, 0x01, &[cmd::DECREASE_COIN, 1, 0x00, 0x02]);
        assert_eq!(out.as_slice(), &[STATUS_SUCCESS, REPORT_SUCCESS]);
        assert_eq!(io.coins(0), 3);

        payload(&mut io, 0x01, &[cmd::DECREASE_COIN, 1, 0x01, 0x00]);
        assert_eq!(io.coins(0), 0);

        let out = payload(&mut io, 0x01, &[cmd::DECREASE_COIN, 0, 0x00, 0x01]);
        assert_eq!(out.as_slice(), &[STATUS_SUCCESS, REPORT_PARAM_ERROR]);
    }

    #[test]
    fn test_unsupported_command_stops_processing() {
        let mut io = addressed(0x01);
        let out = payload(
            &mut io,
            0x01,
            &[cmd::CMD_VERSION, cmd::READ_ANALOG, 2, cmd::ASSIGN_ADDR, 0x05],
        );
        assert_eq!(out.as_slice(), &[STATUS_UNSUPPORTED]);
        // Commands after the unsupported one were not run
        assert_eq!(io.device_id(), Some(0x01));
    }

    #[test]
    fn test_retransmit_resends_previous() {
        let mut io = addressed(0x01);
        io.set_player_switches(0, 0x8000);
        let first = payload(&mut io, 0x01, &[cmd::READ_SWITCHES, 1, 2]);

        io.set_player_switches(0, 0x0000);
        let again = payload(&mut io, 0x01, &[cmd::RETRANSMIT]);
        assert_eq!(again, first);
    }

    #[test]
    fn test_truncated_arguments() {
        let mut io = addressed(0x01);
        let out = payload(&mut io, 0x01, &[cmd::CMD_VERSION, cmd::READ_SWITCHES, 1]);
        assert_eq!(
            out.as_slice(),
            &[STATUS_SUCCESS, REPORT_SUCCESS, 0x11, REPORT_PARAM_ERROR]
        );
    }

    #[test]
    fn test_convey_id_consumes_string() {
        let mut io = addressed(0x01);
        let out = payload(
            &mut io,
            0x01,
            &[cmd::CONVEY_ID, b'N', b'A', b'O', 0, cmd::COMM_VERSION],
        );
        assert_eq!(
            out.as_slice(),
            &[STATUS_SUCCESS, REPORT_SUCCESS, REPORT_SUCCESS, 0x10]
        );
    }

    #[test]
    fn test_oversized_response_reports_overflow() {
        let mut io = addressed(0x01);
        let out = payload(&mut io, 0x01, &[cmd::READ_SWITCHES, 255, 255]);
        assert_eq!(out.as_slice(), &[STATUS_OVERFLOW]);
    }

    #[test]
    fn test_response_addressed_to_master() {
        let mut io = addressed(0x01);
        let response = io.handle(&request(0x01, &[cmd::CMD_VERSION])).unwrap();
        assert_eq!(response.destination, MASTER_ADDR);
    }
}
