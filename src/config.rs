use crate::dispatcher::{Dispatcher, TransmitMode};
use crate::encoder::{Vendor, VendorLayout};
use crate::profile::{BatteryProfile, PackVariant};
use crate::protocol::{ByteOrder, ChannelSet};
use crate::safety::{SafetyGate, VOLTAGE_OFFSET_DV};
use crate::snapshot::UserVoltageOverride;
use crate::transport::{CanInterface, TransportSink};
use crate::Error;
use serde::{Deserialize, Serialize};

/// Deployment settings of one bridge session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    #[serde(default)]
    pub vendor: Vendor,
    pub byte_order: Option<ByteOrder>,
    pub channels: Option<ChannelSet>,
    pub current_offset: Option<u16>,
    #[serde(default)]
    pub transmit_mode: TransmitMode,
    #[serde(default)]
    pub pack: PackVariant,
    #[serde(default = "BridgeConfig::default_voltage_offset_dv")]
    pub voltage_offset_dv: u16,
    pub user_voltage_limits: Option<UserVoltageOverride>,
    #[serde(default)]
    pub interface: CanInterface,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            vendor: Vendor::default(),
            byte_order: None,
            channels: None,
            current_offset: None,
            transmit_mode: TransmitMode::default(),
            pack: PackVariant::default(),
            voltage_offset_dv: Self::default_voltage_offset_dv(),
            user_voltage_limits: None,
            interface: CanInterface::default(),
        }
    }
}

impl BridgeConfig {
    pub const DEFAULT_CONFIG_FILE: &'static str = "bmsbridge.yaml";

    fn default_voltage_offset_dv() -> u16 {
        VOLTAGE_OFFSET_DV
    }

    pub fn validate(&self) -> Result<(), Error> {
        if let Some(user) = &self.user_voltage_limits {
            user.validate()?;
        }
        let limit = self.pack.voltage_limit();
        let charge = limit.maximum.saturating_sub(self.voltage_offset_dv);
        let discharge = limit.minimum.saturating_add(self.voltage_offset_dv);
        if discharge >= charge {
            return Err(Error::InvalidVoltageLimit {
                minimum: discharge,
                maximum: charge,
            });
        }
        Ok(())
    }

    /// Vendor preset with the per-field overrides applied.
    pub fn layout(&self) -> VendorLayout {
        let mut layout = self.vendor.layout();
        if let Some(byte_order) = self.byte_order {
            layout.byte_order = byte_order;
        }
        if let Some(channels) = self.channels {
            layout.channels = channels;
        }
        if self.current_offset.is_some() {
            layout.current_offset = self.current_offset;
        }
        layout
    }

    pub fn profile(&self) -> BatteryProfile {
        BatteryProfile::for_variant(self.pack)
    }

    pub fn safety_gate(&self) -> SafetyGate {
        SafetyGate::new(self.profile())
            .with_user_override(self.user_voltage_limits)
            .with_voltage_offset(self.voltage_offset_dv)
    }

    pub fn dispatcher<S: TransportSink>(&self, sink: S) -> Result<Dispatcher<S>, Error> {
        self.validate()?;
        log::debug!("Creating dispatcher from {self:?}");
        Ok(Dispatcher::new(sink, self.layout(), self.safety_gate())
            .with_mode(self.transmit_mode)
            .with_interface(self.interface))
    }
}
