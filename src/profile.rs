use crate::Error;
use serde::{Deserialize, Serialize};

pub const MAX_PACK_VOLTAGE_108S_DV: u16 = 4540;
pub const MIN_PACK_VOLTAGE_108S_DV: u16 = 2938;
pub const MAX_PACK_VOLTAGE_96S_DV: u16 = 4080;
pub const MIN_PACK_VOLTAGE_96S_DV: u16 = 2620;
pub const MAX_CELL_DEVIATION_MV: u16 = 250;
// Charging and discharging are halted if one cell leaves this window
pub const MAX_CELL_VOLTAGE_MV: u16 = 4260;
pub const MIN_CELL_VOLTAGE_MV: u16 = 2700;

/// Pack voltage window in decivolts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoltageLimit {
    pub minimum: u16,
    pub maximum: u16,
}

impl VoltageLimit {
    pub fn new(minimum: u16, maximum: u16) -> Result<Self, Error> {
        if minimum >= maximum {
            log::warn!("Rejecting voltage limit - minimum={minimum} maximum={maximum}");
            return Err(Error::InvalidVoltageLimit { minimum, maximum });
        }
        Ok(Self { minimum, maximum })
    }

    pub fn contains(&self, voltage_dv: u16) -> bool {
        (self.minimum..=self.maximum).contains(&voltage_dv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellLimit {
    pub min_mv: u16,
    pub max_mv: u16,
    pub max_deviation_mv: u16,
}

impl CellLimit {
    /// Checks both cell extremes against the window and the spread between them.
    pub fn permits(&self, cell_min_mv: u16, cell_max_mv: u16) -> bool {
        let in_window = cell_min_mv >= self.min_mv && cell_max_mv <= self.max_mv;
        let deviation = cell_max_mv.saturating_sub(cell_min_mv);
        in_window && deviation <= self.max_deviation_mv
    }
}

/// Series cell count of the pack. Exactly one variant is selected per configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackVariant {
    #[default]
    S108,
    S96,
}

impl PackVariant {
    pub fn voltage_limit(self) -> VoltageLimit {
        match self {
            PackVariant::S108 => VoltageLimit {
                minimum: MIN_PACK_VOLTAGE_108S_DV,
                maximum: MAX_PACK_VOLTAGE_108S_DV,
            },
            PackVariant::S96 => VoltageLimit {
                minimum: MIN_PACK_VOLTAGE_96S_DV,
                maximum: MAX_PACK_VOLTAGE_96S_DV,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryProfile {
    pub variant: PackVariant,
    pub pack: VoltageLimit,
    pub cell: CellLimit,
}

impl BatteryProfile {
    pub fn for_variant(variant: PackVariant) -> Self {
        Self {
            variant,
            pack: variant.voltage_limit(),
            cell: CellLimit {
                min_mv: MIN_CELL_VOLTAGE_MV,
                max_mv: MAX_CELL_VOLTAGE_MV,
                max_deviation_mv: MAX_CELL_DEVIATION_MV,
            },
        }
    }

    pub fn min_design_voltage_dv(&self) -> u16 {
        self.pack.minimum
    }

    pub fn max_design_voltage_dv(&self) -> u16 {
        self.pack.maximum
    }
}

impl Default for BatteryProfile {
    fn default() -> Self {
        Self::for_variant(PackVariant::default())
    }
}
