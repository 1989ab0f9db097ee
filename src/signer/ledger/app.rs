//! APDU commands of the PARYS Ledger application

use super::transport::{split_status, LedgerTransport, TransportError};
use alloy::primitives::{Address, Bytes, B256};

const CLA: u8 = 0xe0;
const INS_GET_ADDRESS: u8 = 0x02;
const INS_SIGN: u8 = 0x04;
const INS_GET_APP_CONFIGURATION: u8 = 0x06;
const INS_SIGN_PERSONAL_MESSAGE: u8 = 0x08;
const INS_PROVIDE_ERC20_TOKEN_INFORMATION: u8 = 0x0a;

const P1_FIRST_CHUNK: u8 = 0x00;
const P1_MORE_CHUNKS: u8 = 0x80;
const MAX_CHUNK_SIZE: usize = 255;

const HARDENED: u32 = 0x8000_0000;

/// Configuration reported by the on-device app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfiguration {
    /// Whether the user allowed contract data in the app settings
    pub arbitrary_data_enabled: bool,
    /// `major.minor.patch`
    pub version: String,
}

/// Signature components as returned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSignature {
    /// Truncated to one byte by the device
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

/// Signed token descriptor the device uses to display token amounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub ticker: String,
    pub address: Address,
    pub decimals: u32,
    pub chain_id: u32,
    /// Ledger's signature over the descriptor
    pub signature: Bytes,
}

impl TokenInfo {
    fn encode(&self) -> Vec<u8> {
        let ticker = self.ticker.as_bytes();
        let mut data = Vec::with_capacity(1 + ticker.len() + 20 + 8 + self.signature.len());
        data.push(ticker.len() as u8);
        data.extend_from_slice(ticker);
        data.extend_from_slice(self.address.as_slice());
        data.extend_from_slice(&self.decimals.to_be_bytes());
        data.extend_from_slice(&self.chain_id.to_be_bytes());
        data.extend_from_slice(&self.signature);
        data
    }
}

/// Serialize a BIP-32 path like `44'/52752'/0'/0/0`
pub fn serialize_path(path: &str) -> Result<Vec<u8>, TransportError> {
    let segments: Vec<&str> = path
        .trim_start_matches("m/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() || segments.len() > 10 {
        return Err(TransportError::Invalid(format!("invalid derivation path {path}")));
    }

    let mut out = Vec::with_capacity(1 + segments.len() * 4);
    out.push(segments.len() as u8);
    for segment in segments {
        let (number, hardened) = match segment.strip_suffix('\'') {
            Some(n) => (n, true),
            None => (segment, false),
        };
        let index: u32 = number
            .parse()
            .map_err(|_| TransportError::Invalid(format!("invalid derivation path {path}")))?;
        let index = if hardened { index | HARDENED } else { index };
        out.extend_from_slice(&index.to_be_bytes());
    }
    Ok(out)
}

/// Command set of the PARYS app over an open transport
pub struct LedgerApp {
    transport: Box<dyn LedgerTransport>,
}

impl LedgerApp {
    pub fn new(transport: Box<dyn LedgerTransport>) -> Self {
        Self { transport }
    }

    /// Hand the transport back so the caller can close it
    pub fn into_transport(self) -> Box<dyn LedgerTransport> {
        self.transport
    }

    async fn send(&mut self, ins: u8, p1: u8, p2: u8, data: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut apdu = Vec::with_capacity(5 + data.len());
        apdu.extend_from_slice(&[CLA, ins, p1, p2, data.len() as u8]);
        apdu.extend_from_slice(data);
        let response = self.transport.exchange(&apdu).await?;
        split_status(&response).map(<[u8]>::to_vec)
    }

    async fn send_chunked(&mut self, ins: u8, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut response = Vec::new();
        for (i, chunk) in payload.chunks(MAX_CHUNK_SIZE).enumerate() {
            let p1 = if i == 0 { P1_FIRST_CHUNK } else { P1_MORE_CHUNKS };
            response = self.send(ins, p1, 0x00, chunk).await?;
        }
        Ok(response)
    }

    pub async fn get_app_configuration(&mut self) -> Result<AppConfiguration, TransportError> {
        let data = self.send(INS_GET_APP_CONFIGURATION, 0x00, 0x00, &[]).await?;
        if data.len() < 4 {
            return Err(TransportError::Invalid("short app configuration".into()));
        }
        Ok(AppConfiguration {
            arbitrary_data_enabled: data[0] & 0x01 != 0,
            version: format!("{}.{}.{}", data[1], data[2], data[3]),
        })
    }

    /// Address at `path`, without on-screen confirmation
    pub async fn get_address(&mut self, path: &str) -> Result<Address, TransportError> {
        let path = serialize_path(path)?;
        let data = self.send(INS_GET_ADDRESS, 0x00, 0x00, &path).await?;

        let pubkey_len = *data
            .first()
            .ok_or_else(|| TransportError::Invalid("empty address response".into()))?
            as usize;
        let addr_offset = 1 + pubkey_len;
        let addr_len = *data
            .get(addr_offset)
            .ok_or_else(|| TransportError::Invalid("missing address length".into()))?
            as usize;
        let ascii = data
            .get(addr_offset + 1..addr_offset + 1 + addr_len)
            .ok_or_else(|| TransportError::Invalid("truncated address".into()))?;
        let hex = std::str::from_utf8(ascii)
            .map_err(|e| TransportError::Invalid(format!("address is not ascii: {e}")))?;
        format!("0x{}", hex.trim_start_matches("0x"))
            .parse()
            .map_err(|e| TransportError::Invalid(format!("invalid address {hex}: {e}")))
    }

    /// Sign an RLP-encoded unsigned transaction
    pub async fn sign_transaction(
        &mut self,
        path: &str,
        unsigned_rlp: &[u8],
    ) -> Result<DeviceSignature, TransportError> {
        let mut payload = serialize_path(path)?;
        payload.extend_from_slice(unsigned_rlp);
        let data = self.send_chunked(INS_SIGN, &payload).await?;
        parse_signature(&data)
    }

    /// Sign a message with the personal-message prefix
    pub async fn sign_personal_message(
        &mut self,
        path: &str,
        message: &[u8],
    ) -> Result<DeviceSignature, TransportError> {
        let mut payload = serialize_path(path)?;
        payload.extend_from_slice(&(message.len() as u32).to_be_bytes());
        payload.extend_from_slice(message);
        let data = self.send_chunked(INS_SIGN_PERSONAL_MESSAGE, &payload).await?;
        parse_signature(&data)
    }

    pub async fn provide_erc20_token_information(
        &mut self,
        token: &TokenInfo,
    ) -> Result<(), TransportError> {
        self.send(INS_PROVIDE_ERC20_TOKEN_INFORMATION, 0x00, 0x00, &token.encode())
            .await
            .map(|_| ())
    }
}

fn parse_signature(data: &[u8]) -> Result<DeviceSignature, TransportError> {
    if data.len() < 65 {
        return Err(TransportError::Invalid(format!(
            "signature response too short ({} bytes)",
            data.len()
        )));
    }
    Ok(DeviceSignature {
        v: data[0],
        r: B256::from_slice(&data[1..33]),
        s: B256::from_slice(&data[33..65]),
    })
}
