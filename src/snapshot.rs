use crate::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationalStatus {
    #[default]
    Normal,
    Fault,
}

/// Point-in-time view of the battery as published by the battery management layer.
///
/// Units follow the field suffix: `dv` decivolts, `da` deciamps, `mv` millivolts,
/// `dc` deci-degrees Celsius, `pptt` hundredths of a percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatterySnapshot {
    pub pack_voltage_dv: u16,
    pub pack_current_da: i16, // negative=charging, positive=discharging
    pub cell_max_mv: u16,
    pub cell_min_mv: u16,
    pub temp_max_dc: i16,
    pub temp_min_dc: i16,
    pub reported_soc_pptt: u16,
    pub soh_pptt: u16,
    pub max_charge_current_da: u16,
    pub max_discharge_current_da: u16,
    #[serde(default)]
    pub status: OperationalStatus,
}

impl BatterySnapshot {
    pub fn is_faulted(&self) -> bool {
        self.status == OperationalStatus::Fault
    }
}

/// Operator supplied cutoff voltages that replace the profile derived ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVoltageOverride {
    pub charge_dv: u16,
    pub discharge_dv: u16,
}

impl UserVoltageOverride {
    pub fn new(charge_dv: u16, discharge_dv: u16) -> Result<Self, Error> {
        let value = Self {
            charge_dv,
            discharge_dv,
        };
        value.validate()?;
        Ok(value)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.discharge_dv >= self.charge_dv {
            return Err(Error::InvalidOverride {
                charge_dv: self.charge_dv,
                discharge_dv: self.discharge_dv,
            });
        }
        Ok(())
    }
}
