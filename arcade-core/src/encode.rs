//! Report encoder trait and the output mode selection.

use crate::joystick::JoystickEncoder;
use crate::jvs_switches::JvsSwitchEncoder;
use crate::keyboard::KeyboardEncoder;
use arcade_proto::{ActionSet, MappingProfile};
use jvs_proto::BoardInfo;

/// Largest report any encoder produces.
pub const MAX_REPORT_LEN: usize = 32;

/// One encoded report.
pub type Report = heapless::Vec<u8, MAX_REPORT_LEN>;

/// Turns an [`ActionSet`] into the reports of one output format.
pub trait Encode {
    /// Number of reports produced per frame.
    fn report_count(&self) -> usize;

    /// Encode report `index`. Indices past `report_count` give an idle report.
    fn encode(&self, actions: &ActionSet, index: usize) -> Report;
}

/// USB HID encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidEncoder {
    Joystick(JoystickEncoder),
    Keyboard(KeyboardEncoder),
}

impl Encode for HidEncoder {
    fn report_count(&self) -> usize {
        match self {
            Self::Joystick(enc) => enc.report_count(),
            Self::Keyboard(enc) => enc.report_count(),
        }
    }

    fn encode(&self, actions: &ActionSet, index: usize) -> Report {
        match self {
            Self::Joystick(enc) => enc.encode(actions, index),
            Self::Keyboard(enc) => enc.encode(actions, index),
        }
    }
}

/// JVS slave settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JvsConfig {
    pub board: BoardInfo,
    pub encoder: JvsSwitchEncoder,
    /// How long one poll waits for a request byte.
    pub byte_timeout_ms: u32,
}

impl JvsConfig {
    pub const DEFAULT: Self = Self {
        board: BoardInfo::DEFAULT,
        encoder: JvsSwitchEncoder::DEFAULT,
        byte_timeout_ms: 1,
    };
}

impl Default for JvsConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Output format, chosen once at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputMode {
    Joystick(JoystickEncoder),
    Keyboard(KeyboardEncoder),
    Jvs(JvsConfig),
}

impl OutputMode {
    /// Default mapping table for this mode.
    #[must_use]
    pub fn profile(&self) -> MappingProfile {
        match self {
            Self::Keyboard(_) => MappingProfile::Keyboard,
            Self::Joystick(_) | Self::Jvs(_) => MappingProfile::Joystick,
        }
    }

    /// The HID encoder, if this is a USB mode.
    #[must_use]
    pub fn hid(&self) -> Option<HidEncoder> {
        match *self {
            Self::Joystick(enc) => Some(HidEncoder::Joystick(enc)),
            Self::Keyboard(enc) => Some(HidEncoder::Keyboard(enc)),
            Self::Jvs(_) => None,
        }
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Joystick(JoystickEncoder::DUAL)
    }
}
