use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PAYLOAD_LENGTH: usize = 8;

/// Identifier the inverter polls on; the first payload byte selects the request.
pub const POLL_ID: u32 = 0x4200;
pub const COMMAND_SYSTEM_DATA: u8 = 0x00;
pub const COMMAND_SETUP_INFO: u8 = 0x02;

pub const PERMISSION_ALLOWED: u8 = 0x00;
pub const PERMISSION_FORBIDDEN: u8 = 0xAA;

/// Temperatures in the summary frame are biased so the field stays non-negative.
pub const BMS_TEMPERATURE_OFFSET_DC: i32 = 1000;

/// Channel 0 identifiers. The alternate channel uses the same value with the low nibble set to 1.
pub mod ids {
    pub const SUMMARY: u32 = 0x4210;
    pub const LIMITS: u32 = 0x4220;
    pub const CELL_VOLTAGES: u32 = 0x4230;
    pub const CELL_TEMPERATURES: u32 = 0x4240;
    pub const STATUS: u32 = 0x4250;
    pub const MODULE_VOLTAGES: u32 = 0x4260;
    pub const MODULE_TEMPERATURES: u32 = 0x4270;
    pub const PERMISSIONS: u32 = 0x4280;
    pub const FAULT_EXTENSION: u32 = 0x4290;

    pub const VERSION: u32 = 0x7310;
    pub const TOPOLOGY: u32 = 0x7320;
    pub const MANUFACTURER: u32 = 0x7330;
    pub const MODEL: u32 = 0x7340;

    /// Transmit order of the system data group. Limits follow the summary directly.
    pub const SYSTEM_DATA: [u32; 9] = [
        SUMMARY,
        LIMITS,
        CELL_VOLTAGES,
        CELL_TEMPERATURES,
        STATUS,
        MODULE_VOLTAGES,
        MODULE_TEMPERATURES,
        PERMISSIONS,
        FAULT_EXTENSION,
    ];

    pub const SETUP_INFO: [u32; 4] = [VERSION, TOPOLOGY, MANUFACTURER, MODEL];
    /// The alternate channel only ever carried the first two setup frames.
    pub const SETUP_INFO_ALTERNATE: [u32; 2] = [VERSION, TOPOLOGY];
}

/// Outbound CAN frame with a full 8 byte payload.
#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WireFrame {
    pub id: u32,
    pub data: [u8; PAYLOAD_LENGTH],
}

impl WireFrame {
    pub const fn new(id: u32, data: [u8; PAYLOAD_LENGTH]) -> Self {
        Self { id, data }
    }

    pub const fn empty(id: u32) -> Self {
        Self::new(id, [0; PAYLOAD_LENGTH])
    }

    /// Same payload, re-addressed to `channel`.
    pub fn on_channel(&self, channel: Channel) -> Self {
        Self::new(channel.address(self.id), self.data)
    }
}

impl fmt::Debug for WireFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X} {:02X?}", self.id, self.data)
    }
}

/// Frame received from the inverter. Shorter payloads are zero padded.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InboundFrame {
    pub id: u32,
    len: u8,
    data: [u8; PAYLOAD_LENGTH],
}

impl InboundFrame {
    pub fn new(id: u32, payload: &[u8]) -> Result<Self, Error> {
        if payload.len() > PAYLOAD_LENGTH {
            return Err(Error::PayloadTooLong(payload.len()));
        }
        let mut data = [0; PAYLOAD_LENGTH];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            len: payload.len() as u8,
            data,
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len)]
    }

    /// Leading payload byte, `None` for an empty frame.
    pub fn command(&self) -> Option<u8> {
        self.payload().first().copied()
    }
}

impl fmt::Debug for InboundFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X} {:02X?}", self.id, self.payload())
    }
}

/// Placement of the two bytes of a 16 bit field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    #[default]
    HighLow,
    LowHigh,
}

impl ByteOrder {
    /// Writes `value` into the two bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + 2` exceeds [`PAYLOAD_LENGTH`].
    pub fn put(self, buffer: &mut [u8; PAYLOAD_LENGTH], offset: usize, value: u16) {
        let bytes = match self {
            ByteOrder::HighLow => value.to_be_bytes(),
            ByteOrder::LowHigh => value.to_le_bytes(),
        };
        buffer[offset..offset + 2].copy_from_slice(&bytes);
    }

    /// Reads the two bytes starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + 2` exceeds [`PAYLOAD_LENGTH`].
    pub fn get(self, buffer: &[u8; PAYLOAD_LENGTH], offset: usize) -> u16 {
        let bytes = [buffer[offset], buffer[offset + 1]];
        match self {
            ByteOrder::HighLow => u16::from_be_bytes(bytes),
            ByteOrder::LowHigh => u16::from_le_bytes(bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Primary,
    Alternate,
}

impl Channel {
    pub fn address(self, id: u32) -> u32 {
        match self {
            Channel::Primary => id & !0xF,
            Channel::Alternate => (id & !0xF) | 0x1,
        }
    }
}

/// Which of the sibling identifiers get populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSet {
    #[default]
    Primary,
    Alternate,
    Both,
}

impl ChannelSet {
    pub fn channels(self) -> &'static [Channel] {
        match self {
            ChannelSet::Primary => &[Channel::Primary],
            ChannelSet::Alternate => &[Channel::Alternate],
            ChannelSet::Both => &[Channel::Primary, Channel::Alternate],
        }
    }
}

/// Bits 0..2 of the status frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum StatusCode {
    Sleep = 0x00,
    Charge = 0x01,
    Discharge = 0x02,
    Idle = 0x03,
}

impl StatusCode {
    pub fn derive(faulted: bool, current_da: i16) -> Self {
        if faulted {
            StatusCode::Sleep
        } else if current_da < 0 {
            StatusCode::Charge
        } else if current_da > 0 {
            StatusCode::Discharge
        } else {
            StatusCode::Idle
        }
    }
}

pub fn permission_byte(allowed: bool) -> u8 {
    if allowed {
        PERMISSION_ALLOWED
    } else {
        PERMISSION_FORBIDDEN
    }
}
