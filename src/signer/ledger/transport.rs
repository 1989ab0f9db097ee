//! Device transport seam
//!
//! A transport carries raw APDUs to the device and back. Opening and closing is
//! owned by [`super::LedgerSigner::perform`]; one transport is never shared
//! between concurrent calls.

use async_trait::async_trait;

/// Status word for a successful APDU
pub const SW_OK: u16 = 0x9000;

/// Status word for a user rejection on the device
pub const SW_CONDITIONS_NOT_SATISFIED: u16 = 0x6985;

/// Errors raised by a device transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The device is busy with another exchange; retrying later may succeed
    #[error("Ledger device is locked")]
    Locked,
    /// The device answered with a non-success status word
    #[error("{message}")]
    Status { code: u16, message: String },
    /// The link to the device failed
    #[error("{0}")]
    Io(String),
    /// Response could not be interpreted
    #[error("invalid device response: {0}")]
    Invalid(String),
}

impl TransportError {
    /// Build a status error with a readable message for well-known codes
    pub fn status(code: u16) -> Self {
        let message = match code {
            SW_CONDITIONS_NOT_SATISFIED => "Ledger device: Condition of use not satisfied (denied by the user?)",
            0x6a80 => "Ledger device: Invalid data received",
            0x6b00 => "Ledger device: Invalid parameter received",
            0x6d00 => "Ledger device: Instruction not supported (is the PARYS app open?)",
            0x6e00 => "Ledger device: CLA not supported",
            0x6511 | 0x6e01 => "Ledger device: PARYS app is not open",
            _ => "Ledger device: UNKNOWN_ERROR",
        };
        Self::Status {
            code,
            message: format!("{message} (0x{code:04x})"),
        }
    }
}

/// An open connection to a device
#[async_trait]
pub trait LedgerTransport: Send {
    /// Send one APDU, returning the raw response including the trailing status word
    async fn exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Release the connection
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens fresh transports on demand
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn LedgerTransport>, TransportError>;
}

/// Split a raw response into payload and status word, failing on non-success statuses
pub fn split_status(response: &[u8]) -> Result<&[u8], TransportError> {
    if response.len() < 2 {
        return Err(TransportError::Invalid(format!(
            "response too short ({} bytes)",
            response.len()
        )));
    }
    let (data, sw) = response.split_at(response.len() - 2);
    let code = u16::from_be_bytes([sw[0], sw[1]]);
    if code == SW_OK {
        Ok(data)
    } else {
        Err(TransportError::status(code))
    }
}
