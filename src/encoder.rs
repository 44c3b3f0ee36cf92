//! Maps a battery snapshot and its effective limits onto the vendor frame layout.

use crate::profile::PackVariant;
use crate::protocol::*;
use crate::safety::EffectiveLimits;
use crate::snapshot::BatterySnapshot;
use serde::{Deserialize, Serialize};

/// Enough room for every system data frame on both channels.
pub const MAX_GROUP_FRAMES: usize = 2 * ids::SYSTEM_DATA.len();

const _: () = assert!(MAX_GROUP_FRAMES >= 2 * ids::SETUP_INFO.len());

pub type FrameGroup = heapless::Vec<WireFrame, MAX_GROUP_FRAMES>;

/// Channel 0 identifiers of the system data group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemDataIds {
    pub summary: u32,
    pub limits: u32,
    pub cell_voltages: u32,
    pub cell_temperatures: u32,
    pub status: u32,
    pub module_voltages: u32,
    pub module_temperatures: u32,
    pub permissions: u32,
    pub fault_extension: u32,
}

impl Default for SystemDataIds {
    fn default() -> Self {
        Self {
            summary: ids::SUMMARY,
            limits: ids::LIMITS,
            cell_voltages: ids::CELL_VOLTAGES,
            cell_temperatures: ids::CELL_TEMPERATURES,
            status: ids::STATUS,
            module_voltages: ids::MODULE_VOLTAGES,
            module_temperatures: ids::MODULE_TEMPERATURES,
            permissions: ids::PERMISSIONS,
            fault_extension: ids::FAULT_EXTENSION,
        }
    }
}

/// Bias used by inverters that cannot take negative currents.
pub const FERROAMP_CURRENT_OFFSET: u16 = 30000;

/// Channel 0 identifiers of every frame a layout emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTable {
    pub system_data: SystemDataIds,
    pub setup_info: [u32; 4],
    pub setup_info_alternate: [u32; 2],
}

impl Default for FrameTable {
    fn default() -> Self {
        Self {
            system_data: SystemDataIds::default(),
            setup_info: ids::SETUP_INFO,
            setup_info_alternate: ids::SETUP_INFO_ALTERNATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorLayout {
    pub byte_order: ByteOrder,
    pub channels: ChannelSet,
    pub current_offset: Option<u16>,
    pub frames: FrameTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    #[default]
    Solxpow,
    /// Reads voltages correctly only with low byte first.
    Sofar,
    Ferroamp,
}

impl Vendor {
    pub fn layout(self) -> VendorLayout {
        let (byte_order, current_offset) = match self {
            Vendor::Solxpow => (ByteOrder::HighLow, None),
            Vendor::Sofar => (ByteOrder::LowHigh, None),
            Vendor::Ferroamp => (ByteOrder::LowHigh, Some(FERROAMP_CURRENT_OFFSET)),
        };
        VendorLayout {
            byte_order,
            channels: ChannelSet::Primary,
            current_offset,
            frames: FrameTable::default(),
        }
    }
}

impl VendorLayout {
    fn current(&self, current_da: i16) -> u16 {
        let offset = self.current_offset.map_or(0, i32::from);
        (i32::from(current_da) + offset) as u16
    }

    fn max_charge_current(&self, current_da: u16) -> u16 {
        let offset = self.current_offset.map_or(0, i32::from);
        (i32::from(current_da) + offset) as u16
    }

    // Subtracted from the bias, unlike every other offset field.
    fn max_discharge_current(&self, current_da: u16) -> u16 {
        match self.current_offset {
            Some(offset) => (i32::from(offset) - i32::from(current_da)) as u16,
            None => current_da,
        }
    }

    fn expand(&self, base: &[WireFrame], group: &mut FrameGroup) {
        for &channel in self.channels.channels() {
            for frame in base {
                let pushed = group.push(frame.on_channel(channel));
                debug_assert!(pushed.is_ok(), "frame group capacity exceeded");
            }
        }
    }
}

fn percent(pptt: u16) -> u8 {
    (pptt / 100).min(u16::from(u8::MAX)) as u8
}

/// Static ensemble description answered on a setup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupInfo {
    pub hardware_version: [u8; 2],
    pub software_version: [u8; 4],
    pub module_count: u16,
    pub modules_in_series: u8,
    pub cells_per_module: u8,
    pub nominal_voltage_dv: u16,
    pub capacity_ah: u16,
    pub manufacturer: [u8; 8],
    pub model: [u8; 8],
}

impl SetupInfo {
    pub fn for_variant(variant: PackVariant) -> Self {
        let (modules, nominal_voltage_dv, model) = match variant {
            PackVariant::S108 => (9, 3942, *b"SPA-108S"),
            PackVariant::S96 => (8, 3504, *b"SPA-96S "),
        };
        Self {
            hardware_version: [0x01, 0x00],
            software_version: [0x02, 0x01, 0x01, 0x02],
            module_count: modules,
            modules_in_series: modules as u8,
            cells_per_module: 12,
            nominal_voltage_dv,
            capacity_ah: 120,
            manufacturer: *b"BMSBRDGE",
            model,
        }
    }
}

/// Encodes the system data group for every configured channel.
///
/// Channel copies are cut from one set of base frames, so their payloads are identical.
/// The fault override is applied to the finished group last.
pub fn encode_system_data(
    snapshot: &BatterySnapshot,
    limits: &EffectiveLimits,
    layout: &VendorLayout,
) -> FrameGroup {
    let order = layout.byte_order;
    let frame_ids = &layout.frames.system_data;

    let mut summary = WireFrame::empty(frame_ids.summary);
    order.put(&mut summary.data, 0, snapshot.pack_voltage_dv);
    order.put(
        &mut summary.data,
        2,
        layout.current(snapshot.pack_current_da),
    );
    // No BMS temperature available, the hottest cell stands in for it
    order.put(
        &mut summary.data,
        4,
        (i32::from(snapshot.temp_max_dc) + BMS_TEMPERATURE_OFFSET_DC) as u16,
    );
    summary.data[6] = percent(snapshot.reported_soc_pptt);
    summary.data[7] = percent(snapshot.soh_pptt);

    let mut cutoffs = WireFrame::empty(frame_ids.limits);
    order.put(&mut cutoffs.data, 0, limits.charge_cutoff_dv);
    order.put(&mut cutoffs.data, 2, limits.discharge_cutoff_dv);
    order.put(
        &mut cutoffs.data,
        4,
        layout.max_charge_current(snapshot.max_charge_current_da),
    );
    order.put(
        &mut cutoffs.data,
        6,
        layout.max_discharge_current(snapshot.max_discharge_current_da),
    );

    let mut cells = WireFrame::empty(frame_ids.cell_voltages);
    order.put(&mut cells.data, 0, snapshot.cell_max_mv);
    order.put(&mut cells.data, 2, snapshot.cell_min_mv);

    let mut cell_temps = WireFrame::empty(frame_ids.cell_temperatures);
    order.put(&mut cell_temps.data, 0, snapshot.temp_max_dc as u16);
    order.put(&mut cell_temps.data, 2, snapshot.temp_min_dc as u16);

    let mut status = WireFrame::empty(frame_ids.status);
    status.data[0] = StatusCode::derive(snapshot.is_faulted(), snapshot.pack_current_da) as u8;

    // Per module readings are not available, pack extremes are reported instead
    let mut module_temps = WireFrame::empty(frame_ids.module_temperatures);
    module_temps.data = cell_temps.data;

    let mut permissions = WireFrame::empty(frame_ids.permissions);
    permissions.data[0] = permission_byte(limits.charge_allowed);
    permissions.data[1] = permission_byte(limits.discharge_allowed);

    let base = [
        summary,
        cutoffs,
        cells,
        cell_temps,
        status,
        WireFrame::empty(frame_ids.module_voltages),
        module_temps,
        permissions,
        WireFrame::empty(frame_ids.fault_extension),
    ];

    let mut group = FrameGroup::new();
    layout.expand(&base, &mut group);
    apply_fault_override(&mut group, snapshot, frame_ids.permissions);
    group
}

/// Rewrites both permission bytes to forbidden on every permissions frame when faulted.
pub fn apply_fault_override(
    frames: &mut [WireFrame],
    snapshot: &BatterySnapshot,
    permissions_id: u32,
) {
    if !snapshot.is_faulted() {
        return;
    }
    for frame in frames
        .iter_mut()
        .filter(|frame| Channel::Primary.address(frame.id) == permissions_id)
    {
        frame.data[0] = PERMISSION_FORBIDDEN;
        frame.data[1] = PERMISSION_FORBIDDEN;
    }
}

pub fn encode_setup_info(setup: &SetupInfo, layout: &VendorLayout) -> FrameGroup {
    let order = layout.byte_order;
    let [version_id, topology_id, manufacturer_id, model_id] = layout.frames.setup_info;

    let mut version = WireFrame::empty(version_id);
    version.data[..2].copy_from_slice(&setup.hardware_version);
    version.data[2..6].copy_from_slice(&setup.software_version);

    let mut topology = WireFrame::empty(topology_id);
    order.put(&mut topology.data, 0, setup.module_count);
    topology.data[2] = setup.modules_in_series;
    topology.data[3] = setup.cells_per_module;
    order.put(&mut topology.data, 4, setup.nominal_voltage_dv);
    order.put(&mut topology.data, 6, setup.capacity_ah);

    let full = [
        version,
        topology,
        WireFrame::new(manufacturer_id, setup.manufacturer),
        WireFrame::new(model_id, setup.model),
    ];

    let mut group = FrameGroup::new();
    for &channel in layout.channels.channels() {
        let ids: &[u32] = match channel {
            Channel::Primary => &layout.frames.setup_info,
            Channel::Alternate => &layout.frames.setup_info_alternate,
        };
        for frame in full.iter().filter(|frame| ids.contains(&frame.id)) {
            let pushed = group.push(frame.on_channel(channel));
            debug_assert!(pushed.is_ok(), "frame group capacity exceeded");
        }
    }
    group
}
