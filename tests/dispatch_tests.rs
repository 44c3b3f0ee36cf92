use bmsbridge_lib::config::BridgeConfig;
use bmsbridge_lib::dispatcher::{Dispatcher, TransmitMode};
use bmsbridge_lib::encoder::Vendor;
use bmsbridge_lib::protocol::{ChannelSet, InboundFrame, WireFrame, POLL_ID};
use bmsbridge_lib::snapshot::{BatterySnapshot, OperationalStatus};
use bmsbridge_lib::transport::{CanInterface, RecordingSink, TransportSink};
use bmsbridge_lib::Error;

const SYSTEM_DATA_IDS: [u32; 9] = [
    0x4210, 0x4220, 0x4230, 0x4240, 0x4250, 0x4260, 0x4270, 0x4280, 0x4290,
];

fn snapshot() -> BatterySnapshot {
    BatterySnapshot {
        pack_voltage_dv: 3850,
        pack_current_da: -120,
        cell_max_mv: 3580,
        cell_min_mv: 3560,
        temp_max_dc: 215,
        temp_min_dc: 180,
        reported_soc_pptt: 6543,
        soh_pptt: 9712,
        max_charge_current_da: 1200,
        max_discharge_current_da: 1500,
        status: OperationalStatus::Normal,
    }
}

fn dispatcher(config: &BridgeConfig) -> Dispatcher<RecordingSink> {
    config.dispatcher(RecordingSink::new()).unwrap()
}

fn poll(command: u8) -> InboundFrame {
    InboundFrame::new(POLL_ID, &[command, 0, 0, 0, 0, 0, 0, 0]).unwrap()
}

fn frame(frames: &[WireFrame], id: u32) -> WireFrame {
    *frames.iter().find(|frame| frame.id == id).unwrap()
}

/// Sink whose bus is always down. Remembers what it was asked to send.
#[derive(Default)]
struct DeadBus {
    attempted: Vec<u32>,
}

impl TransportSink for DeadBus {
    fn transmit(&mut self, frame: &WireFrame, _interface: CanInterface) -> Result<(), Error> {
        self.attempted.push(frame.id);
        Err(Error::Transport("bus off".to_string()))
    }
}

#[test]
fn data_request_emits_system_data_group() {
    let mut dispatcher = dispatcher(&BridgeConfig::default());
    assert_eq!(dispatcher.handle_frame(&poll(0x00), snapshot()), 9);
    assert_eq!(dispatcher.sink().ids(), SYSTEM_DATA_IDS);
}

#[test]
fn setup_request_emits_setup_group() {
    let mut dispatcher = dispatcher(&BridgeConfig::default());
    assert_eq!(dispatcher.handle_frame(&poll(0x02), snapshot()), 4);
    assert_eq!(dispatcher.sink().ids(), [0x7310, 0x7320, 0x7330, 0x7340]);
}

#[test]
fn unrecognized_traffic_is_ignored() {
    let mut dispatcher = dispatcher(&BridgeConfig::default());
    for command in [0x01, 0x03, 0x10, 0xFF] {
        assert_eq!(dispatcher.handle_frame(&poll(command), snapshot()), 0);
    }
    let other = InboundFrame::new(0x4201, &[0x00]).unwrap();
    assert_eq!(dispatcher.handle_frame(&other, snapshot()), 0);
    let empty = InboundFrame::new(POLL_ID, &[]).unwrap();
    assert_eq!(dispatcher.handle_frame(&empty, snapshot()), 0);
    assert!(dispatcher.sink().is_empty());
}

#[test]
fn both_channels_carry_identical_payloads() {
    let config = BridgeConfig {
        channels: Some(ChannelSet::Both),
        ..BridgeConfig::default()
    };
    let mut dispatcher = dispatcher(&config);
    dispatcher.handle_frame(&poll(0x00), snapshot());
    let frames = dispatcher.sink_mut().take();
    assert_eq!(frames.len(), 18);
    for id in SYSTEM_DATA_IDS {
        assert_eq!(frame(&frames, id).data, frame(&frames, id + 1).data);
    }
}

#[test]
fn status_byte_follows_current_sign() {
    let mut dispatcher = dispatcher(&BridgeConfig::default());
    for (current, expected) in [(-1, 0x01), (1, 0x02), (0, 0x03)] {
        let mut snapshot = snapshot();
        snapshot.pack_current_da = current;
        dispatcher.handle_frame(&poll(0x00), snapshot);
        let frames = dispatcher.sink_mut().take();
        assert_eq!(frame(&frames, 0x4250).data[0], expected, "current={current}");
    }
}

#[test]
fn fault_forces_sleep_and_forbidden_markers() {
    let config = BridgeConfig {
        channels: Some(ChannelSet::Both),
        ..BridgeConfig::default()
    };
    let mut dispatcher = dispatcher(&config);
    for current in [-300, 0, 300] {
        let mut snapshot = snapshot();
        snapshot.pack_current_da = current;
        snapshot.status = OperationalStatus::Fault;
        dispatcher.handle_frame(&poll(0x00), snapshot);
        let frames = dispatcher.sink_mut().take();
        for id in [0x4280, 0x4281] {
            assert_eq!(frame(&frames, id).data[..2], [0xAA, 0xAA]);
        }
        for id in [0x4250, 0x4251] {
            assert_eq!(frame(&frames, id).data[0], 0x00);
        }
    }
}

#[test]
fn healthy_battery_is_allowed_both_ways() {
    let mut dispatcher = dispatcher(&BridgeConfig::default());
    dispatcher.handle_frame(&poll(0x00), snapshot());
    let frames = dispatcher.sink_mut().take();
    assert_eq!(frame(&frames, 0x4280).data, [0; 8]);
}

#[test]
fn soc_and_soh_truncate_to_percent() {
    let mut dispatcher = dispatcher(&BridgeConfig::default());
    for (pptt, expected) in [(9876, 98), (10000, 100), (0, 0), (99, 0)] {
        let mut snapshot = snapshot();
        snapshot.reported_soc_pptt = pptt;
        snapshot.soh_pptt = pptt;
        dispatcher.handle_frame(&poll(0x00), snapshot);
        let frames = dispatcher.sink_mut().take();
        assert_eq!(frame(&frames, 0x4210).data[6..], [expected, expected]);
    }
}

#[test]
fn limits_frame_high_low_layout() {
    let mut dispatcher = dispatcher(&BridgeConfig::default());
    dispatcher.handle_frame(&poll(0x00), snapshot());
    let frames = dispatcher.sink_mut().take();
    // 4500 dV, 2978 dV, 1200 dA, 1500 dA
    assert_eq!(
        frame(&frames, 0x4220).data,
        [0x11, 0x94, 0x0B, 0xA2, 0x04, 0xB0, 0x05, 0xDC]
    );
    assert_eq!(
        frame(&frames, 0x4230).data,
        [0x0D, 0xFC, 0x0D, 0xE8, 0, 0, 0, 0]
    );
}

#[test]
fn ferroamp_offsets_currents() {
    let config = BridgeConfig {
        vendor: Vendor::Ferroamp,
        ..BridgeConfig::default()
    };
    let mut dispatcher = dispatcher(&config);
    dispatcher.handle_frame(&poll(0x00), snapshot());
    let frames = dispatcher.sink_mut().take();
    // -120 + 30000 = 29880
    assert_eq!(frame(&frames, 0x4210).data[2..4], 29880u16.to_le_bytes());
    // 30000 + 1200, 30000 - 1500
    assert_eq!(frame(&frames, 0x4220).data[4..6], 31200u16.to_le_bytes());
    assert_eq!(frame(&frames, 0x4220).data[6..8], 28500u16.to_le_bytes());
}

#[test]
fn user_limits_replace_profile_cutoffs() {
    let config: BridgeConfig = serde_yaml::from_str(
        "user_voltage_limits:\n  charge_dv: 4200\n  discharge_dv: 3100\ninterface: addon_mcp2515\n",
    )
    .unwrap();
    let mut dispatcher = dispatcher(&config);
    dispatcher.handle_frame(&poll(0x00), snapshot());
    assert!(dispatcher
        .sink()
        .interfaces()
        .all(|interface| interface == CanInterface::AddonMcp2515));
    let frames = dispatcher.sink_mut().take();
    assert_eq!(frame(&frames, 0x4220).data[..4], [0x10, 0x68, 0x0C, 0x1C]);
}

#[test]
fn periodic_vendor_transmits_without_polls() {
    let config = BridgeConfig {
        transmit_mode: TransmitMode::Periodic { interval_ms: 500 },
        ..BridgeConfig::default()
    };
    let mut dispatcher = dispatcher(&config);
    assert_eq!(dispatcher.handle_frame(&poll(0x00), snapshot()), 0);
    assert_eq!(dispatcher.tick(0, snapshot()), 9);
    assert_eq!(dispatcher.tick(499, snapshot()), 0);
    assert_eq!(dispatcher.tick(500, snapshot()), 9);
    assert_eq!(dispatcher.sink().len(), 18);
}

#[test]
fn failing_transport_does_not_stop_the_group() {
    let mut dispatcher = BridgeConfig::default()
        .dispatcher(DeadBus::default())
        .unwrap();
    assert_eq!(dispatcher.handle_frame(&poll(0x00), snapshot()), 9);
    assert_eq!(dispatcher.sink().attempted, SYSTEM_DATA_IDS);

    assert_eq!(dispatcher.handle_frame(&poll(0x00), snapshot()), 9);
    assert_eq!(dispatcher.sink().attempted.len(), 18);
    assert_eq!(dispatcher.sink().attempted[9..], SYSTEM_DATA_IDS);
}
