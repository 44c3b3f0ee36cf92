use crate::profile::BatteryProfile;
use crate::snapshot::{BatterySnapshot, UserVoltageOverride};
use serde::Serialize;

/// Headroom kept between the design limits of the pack and the cutoffs sent to the inverter.
pub const VOLTAGE_OFFSET_DV: u16 = 40;

/// Charge/discharge permissions and cutoffs for one dispatch cycle. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveLimits {
    pub charge_cutoff_dv: u16,
    pub discharge_cutoff_dv: u16,
    pub charge_allowed: bool,
    pub discharge_allowed: bool,
}

impl EffectiveLimits {
    pub fn forbid_all(&mut self) {
        self.charge_allowed = false;
        self.discharge_allowed = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyGate {
    profile: BatteryProfile,
    user_override: Option<UserVoltageOverride>,
    voltage_offset_dv: u16,
}

impl SafetyGate {
    pub fn new(profile: BatteryProfile) -> Self {
        Self {
            profile,
            user_override: None,
            voltage_offset_dv: VOLTAGE_OFFSET_DV,
        }
    }

    pub fn with_user_override(mut self, user_override: Option<UserVoltageOverride>) -> Self {
        self.user_override = user_override;
        self
    }

    pub fn with_voltage_offset(mut self, voltage_offset_dv: u16) -> Self {
        self.voltage_offset_dv = voltage_offset_dv;
        self
    }

    pub fn profile(&self) -> &BatteryProfile {
        &self.profile
    }

    pub fn compute(&self, snapshot: &BatterySnapshot) -> EffectiveLimits {
        let (charge_cutoff_dv, discharge_cutoff_dv) = match self.user_override {
            Some(user) => (user.charge_dv, user.discharge_dv),
            None => (
                self.profile
                    .max_design_voltage_dv()
                    .saturating_sub(self.voltage_offset_dv),
                self.profile
                    .min_design_voltage_dv()
                    .saturating_add(self.voltage_offset_dv),
            ),
        };

        let mut limits = EffectiveLimits {
            charge_cutoff_dv,
            discharge_cutoff_dv,
            charge_allowed: snapshot.max_charge_current_da != 0,
            discharge_allowed: snapshot.max_discharge_current_da != 0,
        };

        if !self.profile.pack.contains(snapshot.pack_voltage_dv) {
            log::warn!(
                "Pack voltage outside {:?} window - voltage={}dV",
                self.profile.variant,
                snapshot.pack_voltage_dv
            );
            limits.forbid_all();
        }
        if !self
            .profile
            .cell
            .permits(snapshot.cell_min_mv, snapshot.cell_max_mv)
        {
            log::warn!(
                "Cell voltages outside safe window - min={}mV max={}mV",
                snapshot.cell_min_mv,
                snapshot.cell_max_mv
            );
            limits.forbid_all();
        }

        // Must stay last: nothing may re-enable a faulted battery.
        if snapshot.is_faulted() {
            limits.forbid_all();
        }
        limits
    }
}

/// Derives the limits with the default voltage offset.
pub fn compute_limits(
    snapshot: &BatterySnapshot,
    profile: &BatteryProfile,
    user_override: Option<&UserVoltageOverride>,
) -> EffectiveLimits {
    SafetyGate::new(*profile)
        .with_user_override(user_override.copied())
        .compute(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PackVariant;
    use crate::snapshot::OperationalStatus;

    fn healthy() -> BatterySnapshot {
        BatterySnapshot {
            pack_voltage_dv: 3700,
            pack_current_da: 0,
            cell_max_mv: 3710,
            cell_min_mv: 3690,
            temp_max_dc: 250,
            temp_min_dc: 200,
            reported_soc_pptt: 5000,
            soh_pptt: 9900,
            max_charge_current_da: 500,
            max_discharge_current_da: 500,
            status: OperationalStatus::Normal,
        }
    }

    #[test]
    fn cutoffs_from_profile_with_headroom() {
        let limits = compute_limits(&healthy(), &BatteryProfile::default(), None);
        assert_eq!(limits.charge_cutoff_dv, 4540 - VOLTAGE_OFFSET_DV);
        assert_eq!(limits.discharge_cutoff_dv, 2938 + VOLTAGE_OFFSET_DV);
        assert!(limits.charge_allowed);
        assert!(limits.discharge_allowed);
    }

    #[test]
    fn user_override_bypasses_profile() {
        let user = UserVoltageOverride::new(4100, 3000).unwrap();
        let limits = compute_limits(&healthy(), &BatteryProfile::default(), Some(&user));
        assert_eq!(limits.charge_cutoff_dv, 4100);
        assert_eq!(limits.discharge_cutoff_dv, 3000);
    }

    #[test]
    fn zero_current_limit_forbids_direction() {
        let mut snapshot = healthy();
        snapshot.max_charge_current_da = 0;
        let limits = compute_limits(&snapshot, &BatteryProfile::default(), None);
        assert!(!limits.charge_allowed);
        assert!(limits.discharge_allowed);

        snapshot.max_charge_current_da = 10;
        snapshot.max_discharge_current_da = 0;
        let limits = compute_limits(&snapshot, &BatteryProfile::default(), None);
        assert!(limits.charge_allowed);
        assert!(!limits.discharge_allowed);
    }

    #[test]
    fn fault_forbids_everything() {
        let mut snapshot = healthy();
        snapshot.status = OperationalStatus::Fault;
        let limits = compute_limits(&snapshot, &BatteryProfile::default(), None);
        assert!(!limits.charge_allowed);
        assert!(!limits.discharge_allowed);
    }

    #[test]
    fn cell_violation_forbids_everything() {
        let mut snapshot = healthy();
        snapshot.cell_max_mv = 4300;
        let limits = compute_limits(&snapshot, &BatteryProfile::default(), None);
        assert!(!limits.charge_allowed);
        assert!(!limits.discharge_allowed);

        let mut snapshot = healthy();
        snapshot.cell_min_mv = 3400;
        snapshot.cell_max_mv = 3700;
        let limits = compute_limits(&snapshot, &BatteryProfile::default(), None);
        assert!(!limits.charge_allowed);
    }

    #[test]
    fn pack_voltage_checked_against_selected_variant() {
        let mut snapshot = healthy();
        snapshot.pack_voltage_dv = 4300;
        let s108_profile = BatteryProfile::for_variant(PackVariant::S108);
        let s96_profile = BatteryProfile::for_variant(PackVariant::S96);
        let s108 = compute_limits(&snapshot, &s108_profile, None);
        let s96 = compute_limits(&snapshot, &s96_profile, None);
        assert!(s108.charge_allowed);
        assert!(!s96.charge_allowed);
        assert!(!s96.discharge_allowed);
    }
}
