use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid voltage limit - minimum={minimum}dV must be below maximum={maximum}dV")]
    InvalidVoltageLimit { minimum: u16, maximum: u16 },
    #[error("Invalid user voltage limits - discharge={discharge_dv}dV must be below charge={charge_dv}dV")]
    InvalidOverride { charge_dv: u16, discharge_dv: u16 },
    #[error("CAN payload too long: {0} bytes (maximum 8)")]
    PayloadTooLong(usize),
    #[error("Transport error: {0}")]
    Transport(String),
}
