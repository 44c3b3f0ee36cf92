//! Decides which frame group to put on the bus, either in answer to an inverter poll or on a timer.

use crate::encoder::{encode_setup_info, encode_system_data, FrameGroup, SetupInfo, VendorLayout};
use crate::protocol::{InboundFrame, COMMAND_SETUP_INFO, COMMAND_SYSTEM_DATA, POLL_ID};
use crate::safety::SafetyGate;
use crate::snapshot::BatterySnapshot;
use crate::transport::{CanInterface, TransportSink};
use serde::{Deserialize, Serialize};

/// Countdown restored whenever the inverter polls.
pub const CAN_STILL_ALIVE: u8 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransmitMode {
    /// Answer polls on the request identifier, never transmit unsolicited.
    #[default]
    Reactive,
    /// Send system data every `interval_ms`, ignore inbound traffic.
    Periodic { interval_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    SetupRequested,
    DataRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    SetupInfo,
    SystemData,
}

impl Request {
    fn state(self) -> DispatchState {
        match self {
            Request::SetupInfo => DispatchState::SetupRequested,
            Request::SystemData => DispatchState::DataRequested,
        }
    }
}

pub struct Dispatcher<S: TransportSink> {
    sink: S,
    interface: CanInterface,
    layout: VendorLayout,
    gate: SafetyGate,
    setup: SetupInfo,
    mode: TransmitMode,
    state: DispatchState,
    still_alive: u8,
    last_periodic_ms: Option<u64>,
}

impl<S: TransportSink> Dispatcher<S> {
    pub fn new(sink: S, layout: VendorLayout, gate: SafetyGate) -> Self {
        Self {
            sink,
            interface: CanInterface::default(),
            layout,
            setup: SetupInfo::for_variant(gate.profile().variant),
            gate,
            mode: TransmitMode::default(),
            state: DispatchState::Idle,
            still_alive: 0,
            last_periodic_ms: None,
        }
    }

    pub fn with_mode(mut self, mode: TransmitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_interface(mut self, interface: CanInterface) -> Self {
        self.interface = interface;
        self
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn inverter_alive(&self) -> bool {
        self.still_alive > 0
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Classifies an inbound frame. Anything that is not a known poll yields `None`.
    pub fn decode_request(&self, frame: &InboundFrame) -> Option<Request> {
        if self.mode != TransmitMode::Reactive || frame.id != POLL_ID {
            return None;
        }
        match frame.command()? {
            COMMAND_SYSTEM_DATA => Some(Request::SystemData),
            COMMAND_SETUP_INFO => Some(Request::SetupInfo),
            _ => None,
        }
    }

    /// Handles one inbound frame and returns the number of frames handed to the sink.
    pub fn handle_frame(&mut self, frame: &InboundFrame, snapshot: BatterySnapshot) -> usize {
        if self.mode == TransmitMode::Reactive && frame.id == POLL_ID {
            self.still_alive = CAN_STILL_ALIVE;
        }
        match self.decode_request(frame) {
            Some(request) => self.respond(request, snapshot),
            None => {
                log::trace!("Ignoring inbound frame {frame:?}");
                0
            }
        }
    }

    /// Periodic entry point. A no-op for reactive vendors apart from liveness bookkeeping.
    pub fn tick(&mut self, now_ms: u64, snapshot: BatterySnapshot) -> usize {
        match self.mode {
            TransmitMode::Reactive => {
                self.still_alive = self.still_alive.saturating_sub(1);
                0
            }
            TransmitMode::Periodic { interval_ms } => {
                // A clock that went backwards counts as due
                let due = self
                    .last_periodic_ms
                    .map_or(true, |last| now_ms.wrapping_sub(last) >= interval_ms);
                if !due {
                    return 0;
                }
                self.last_periodic_ms = Some(now_ms);
                self.respond(Request::SystemData, snapshot)
            }
        }
    }

    pub fn respond(&mut self, request: Request, snapshot: BatterySnapshot) -> usize {
        self.state = request.state();
        log::debug!("Dispatch {:?}", self.state);
        let group = self.encode(request, &snapshot);
        let sent = self.send(&group);
        self.state = DispatchState::Idle;
        sent
    }

    pub fn encode(&self, request: Request, snapshot: &BatterySnapshot) -> FrameGroup {
        match request {
            Request::SetupInfo => encode_setup_info(&self.setup, &self.layout),
            Request::SystemData => {
                let limits = self.gate.compute(snapshot);
                encode_system_data(snapshot, &limits, &self.layout)
            }
        }
    }

    fn send(&mut self, group: &FrameGroup) -> usize {
        for frame in group {
            log::trace!("TX {frame:?}");
            if let Err(e) = self.sink.transmit(frame, self.interface) {
                log::warn!("Transport rejected {frame:?}: {e}");
            }
        }
        group.len()
    }
}
