use crate::protocol::WireFrame;
use crate::Error;
use serde::{Deserialize, Serialize};

/// CAN controller the inverter is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanInterface {
    #[default]
    Native,
    AddonMcp2515,
    CanfdMcp2518,
}

/// Bus writer owned by the transport layer. Callers do not retry or wait for completion.
pub trait TransportSink {
    fn transmit(&mut self, frame: &WireFrame, interface: CanInterface) -> Result<(), Error>;
}

impl<T: TransportSink + ?Sized> TransportSink for &mut T {
    fn transmit(&mut self, frame: &WireFrame, interface: CanInterface) -> Result<(), Error> {
        (**self).transmit(frame, interface)
    }
}

/// Keeps every transmitted frame in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    frames: Vec<(CanInterface, WireFrame)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> impl Iterator<Item = &WireFrame> {
        self.frames.iter().map(|(_, frame)| frame)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.frames().map(|frame| frame.id).collect()
    }

    pub fn interfaces(&self) -> impl Iterator<Item = CanInterface> + '_ {
        self.frames.iter().map(|(interface, _)| *interface)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn take(&mut self) -> Vec<WireFrame> {
        self.frames.drain(..).map(|(_, frame)| frame).collect()
    }
}

impl TransportSink for RecordingSink {
    fn transmit(&mut self, frame: &WireFrame, interface: CanInterface) -> Result<(), Error> {
        self.frames.push((interface, *frame));
        Ok(())
    }
}

/// Writes frames to the log instead of a bus.
#[derive(Debug, Default)]
pub struct LogSink {
    sent: u64,
}

impl LogSink {
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl TransportSink for LogSink {
    fn transmit(&mut self, frame: &WireFrame, interface: CanInterface) -> Result<(), Error> {
        self.sent += 1;
        log::info!("{interface:?} TX {frame:?}");
        Ok(())
    }
}
