//! Ledger hardware wallet signer
//!
//! Every device interaction goes through [`LedgerSigner::perform`], which opens
//! a transport, retries while the device reports it is locked, and always
//! closes the transport afterwards.

mod app;
pub mod transport;

pub use app::{serialize_path, AppConfiguration, DeviceSignature, LedgerApp, TokenInfo};
pub use transport::{LedgerTransport, TransportConnector, TransportError};

use super::{estimate_from, prepare_draft, TransactionSigner};
use crate::chain::RpcChain;
use crate::constants::{LEDGER_APP_MIN_VERSION, LEDGER_MAX_ATTEMPTS, LEDGER_RETRY_DELAY_MS};
use crate::error::{Result, SigningError};
use crate::transaction::TxDraft;
use alloy::primitives::{Address, Bytes, Signature, U256};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Check the on-device app against the minimum supported version.
///
/// The major version must match exactly; minor and patch must each be at least
/// the minimum. Contract data must be enabled in the app settings.
pub fn check_app_version(config: &AppConfiguration, min_version: &str) -> Result<(), SigningError> {
    let parse = |v: &str| -> Option<Vec<u32>> { v.split('.').map(|s| s.parse().ok()).collect() };
    let version = parse(&config.version)
        .filter(|segments| segments.len() == 3)
        .ok_or_else(|| SigningError::UnsupportedApp("Invalid Ledger app version segments".into()))?;
    let min = parse(min_version)
        .filter(|segments| segments.len() == 3)
        .ok_or_else(|| SigningError::UnsupportedApp(format!("Invalid minimum version {min_version}")))?;

    if version[0] != min[0] {
        return Err(SigningError::UnsupportedApp(format!(
            "Unsupported Ledger app major version, must be {}",
            min[0]
        )));
    }
    if version[1] < min[1] || version[2] < min[2] {
        return Err(SigningError::UnsupportedApp(format!(
            "Unsupported Ledger app version, must be at least {min_version}"
        )));
    }
    if !config.arbitrary_data_enabled {
        return Err(SigningError::UnsupportedApp(
            "Ledger does not allow contract data. Required for safe token transfers. Enable it from the ledger app settings.".into(),
        ));
    }
    Ok(())
}

/// Recover the signature parity from the device's one-byte `v`.
///
/// The device returns the low byte of `chain_id * 2 + 35 + parity`.
fn eip155_parity(v: u8, chain_id: u64) -> bool {
    let base = (chain_id.wrapping_mul(2).wrapping_add(35) & 0xff) as u8;
    v.wrapping_sub(base) & 1 == 1
}

/// Parity of a personal-message signature (`v` is 27 or 28)
fn personal_parity(v: u8) -> bool {
    let v = if v >= 27 { v - 27 } else { v };
    v & 1 == 1
}

fn to_signature(sig: &DeviceSignature, parity: bool) -> Signature {
    Signature::new(U256::from_be_bytes(sig.r.0), U256::from_be_bytes(sig.s.0), parity)
}

/// Signer backed by a Ledger device
pub struct LedgerSigner {
    connector: Arc<dyn TransportConnector>,
    path: String,
    address: Address,
    chain_id: u64,
    chain: RpcChain,
    token_data: HashMap<Address, TokenInfo>,
}

impl LedgerSigner {
    /// Connect to the device, validate the app and read the account address
    ///
    /// # Arguments
    ///
    /// * `connector` - Opens device transports (USB HID, Bluetooth, ...)
    /// * `path` - BIP-44 derivation path, e.g. [`crate::constants::DEFAULT_DERIVATION_PATH`]
    /// * `chain_id` - Chain the signer signs for
    /// * `chain` - Used for nonce lookup and gas estimation
    pub async fn connect(
        connector: Arc<dyn TransportConnector>,
        path: impl Into<String>,
        chain_id: u64,
        chain: RpcChain,
    ) -> Result<Self> {
        let path = path.into();
        let mut signer = Self {
            connector,
            path,
            address: Address::ZERO,
            chain_id,
            chain,
            token_data: HashMap::new(),
        };

        signer.validate_app_version().await?;

        let path = signer.path.clone();
        signer.address = signer
            .perform(move |app| {
                let path = path.clone();
                Box::pin(async move { app.get_address(&path).await })
            })
            .await?;
        tracing::info!(address = %signer.address, path = %signer.path, "Ledger signer connected");
        Ok(signer)
    }

    /// Register a signed token descriptor shown by the device when signing
    pub fn with_token_info(mut self, info: TokenInfo) -> Self {
        self.token_data.insert(info.address, info);
        self
    }

    pub fn derivation_path(&self) -> &str {
        &self.path
    }

    async fn validate_app_version(&self) -> Result<(), SigningError> {
        let config = match self
            .perform(|app| Box::pin(app.get_app_configuration()))
            .await
        {
            Ok(config) => config,
            Err(error) => {
                // The configuration query is flaky on some firmware
                tracing::warn!(%error, "Unable to get ledger app config, continuing");
                return Ok(());
            }
        };
        check_app_version(&config, LEDGER_APP_MIN_VERSION)
    }

    /// Run one device action with a freshly opened transport.
    ///
    /// Retries up to [`LEDGER_MAX_ATTEMPTS`] times while the device is locked,
    /// fails fast on a status error and always closes the transport.
    pub async fn perform<T, F>(&self, action: F) -> Result<T, SigningError>
    where
        T: Send,
        F: for<'a> Fn(&'a mut LedgerApp) -> BoxFuture<'a, Result<T, TransportError>> + Send + Sync,
    {
        let transport = self
            .connector
            .open()
            .await
            .map_err(|e| SigningError::Transport(e.to_string()))?;
        let mut app = LedgerApp::new(transport);

        let result = Self::attempt(&mut app, &action).await;

        let mut transport = app.into_transport();
        if let Err(error) = transport.close().await {
            tracing::warn!(%error, "Suppressing error during transport close");
        }
        result
    }

    async fn attempt<T, F>(app: &mut LedgerApp, action: &F) -> Result<T, SigningError>
    where
        F: for<'a> Fn(&'a mut LedgerApp) -> BoxFuture<'a, Result<T, TransportError>>,
    {
        for attempt in 1..=LEDGER_MAX_ATTEMPTS {
            match action(app).await {
                Ok(value) => return Ok(value),
                Err(TransportError::Locked) => {
                    tracing::warn!(attempt, "Ledger device locked");
                    if attempt < LEDGER_MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_millis(LEDGER_RETRY_DELAY_MS)).await;
                    }
                }
                Err(TransportError::Status { code, message }) => {
                    tracing::error!(status = code, %message, "Ledger responded with failure");
                    return Err(SigningError::DeviceStatus {
                        status: code,
                        message,
                    });
                }
                Err(TransportError::Io(message)) => {
                    tracing::error!(%message, "Ledger transport error");
                    return Err(SigningError::Transport(message));
                }
                Err(error @ TransportError::Invalid(_)) => {
                    tracing::error!(%error, "Unknown ledger error");
                    break;
                }
            }
        }
        Err(SigningError::DeviceUnavailable)
    }

    async fn provide_token_info(&self, info: TokenInfo) -> Result<(), SigningError> {
        self.perform(move |app| {
            let info = info.clone();
            Box::pin(async move { app.provide_erc20_token_information(&info).await })
        })
        .await
    }
}

impl TransactionSigner for LedgerSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn sign_transaction(&self, tx: &TxDraft) -> Result<Bytes> {
        let tx = prepare_draft(tx, self.address, self.chain_id, &self.chain).await?;

        let to_info = tx.to.and_then(|to| self.token_data.get(&to)).cloned();
        let fee_info = tx
            .fee_currency
            .and_then(|token| self.token_data.get(&token))
            .filter(|fee| to_info.as_ref().is_none_or(|to| to.address != fee.address))
            .cloned();
        if let Some(info) = to_info {
            self.provide_token_info(info).await?;
        }
        if let Some(info) = fee_info {
            self.provide_token_info(info).await?;
        }

        let unsigned = tx.unsigned_rlp()?;
        let path = self.path.clone();
        let device_sig = self
            .perform(move |app| {
                let path = path.clone();
                let unsigned = unsigned.clone();
                Box::pin(async move { app.sign_transaction(&path, &unsigned).await })
            })
            .await?;

        let signature = to_signature(&device_sig, eip155_parity(device_sig.v, self.chain_id));
        let recovered = signature
            .recover_address_from_prehash(&tx.signing_hash()?)
            .map_err(|e| SigningError::Mismatch(format!("Invalid Ledger signature: {e}")))?;
        if recovered != self.address {
            return Err(SigningError::Mismatch(format!(
                "Ledger signature is from {recovered}, expected {}",
                self.address
            ))
            .into());
        }

        Ok(tx.encode_signed(&signature)?)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature> {
        let path = self.path.clone();
        let message = message.to_vec();
        let device_sig = self
            .perform(move |app| {
                let path = path.clone();
                let message = message.clone();
                Box::pin(async move { app.sign_personal_message(&path, &message).await })
            })
            .await?;
        Ok(to_signature(&device_sig, personal_parity(device_sig.v)))
    }

    async fn estimate_gas(&self, tx: &TxDraft) -> Result<u64> {
        estimate_from(&self.chain, tx, self.address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParysError;
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct DeviceState {
        responses: VecDeque<Result<Vec<u8>, TransportError>>,
        apdus: Vec<Vec<u8>>,
        opened: usize,
        closed: usize,
    }

    /// Replays scripted responses and records traffic
    #[derive(Clone, Default)]
    struct ScriptedDevice(Arc<Mutex<DeviceState>>);

    impl ScriptedDevice {
        fn push(&self, response: Result<Vec<u8>, TransportError>) -> &Self {
            self.0.lock().unwrap().responses.push_back(response);
            self
        }

        fn ok(&self, data: &[u8]) -> &Self {
            let mut response = data.to_vec();
            response.extend_from_slice(&[0x90, 0x00]);
            self.push(Ok(response))
        }

        fn exchanges(&self) -> usize {
            self.0.lock().unwrap().apdus.len()
        }

        fn opened_and_closed(&self) -> (usize, usize) {
            let state = self.0.lock().unwrap();
            (state.opened, state.closed)
        }
    }

    #[async_trait]
    impl LedgerTransport for ScriptedDevice {
        async fn exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
            let mut state = self.0.lock().unwrap();
            state.apdus.push(apdu.to_vec());
            state
                .responses
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Io("no scripted response".into())))
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.0.lock().unwrap().closed += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl TransportConnector for ScriptedDevice {
        async fn open(&self) -> Result<Box<dyn LedgerTransport>, TransportError> {
            self.0.lock().unwrap().opened += 1;
            Ok(Box::new(self.clone()))
        }
    }

    fn address_response(address: Address) -> Vec<u8> {
        let mut data = vec![65];
        data.extend_from_slice(&[0x04; 65]);
        let hex = alloy::hex::encode(address.as_slice());
        data.push(hex.len() as u8);
        data.extend_from_slice(hex.as_bytes());
        data
    }

    fn chain() -> RpcChain {
        RpcChain::connect("http://127.0.0.1:8545").unwrap()
    }

    fn signer_with(device: &ScriptedDevice, address: Address) -> LedgerSigner {
        LedgerSigner {
            connector: Arc::new(device.clone()),
            path: "44'/52752'/0'/0/0".into(),
            address,
            chain_id: 42220,
            chain: chain(),
            token_data: HashMap::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_twice_then_success() {
        let device = ScriptedDevice::default();
        device
            .push(Err(TransportError::Locked))
            .push(Err(TransportError::Locked))
            .ok(&[0x01, 1, 0, 3]);
        let signer = signer_with(&device, Address::ZERO);

        let start = tokio::time::Instant::now();
        let config = signer
            .perform(|app| Box::pin(app.get_app_configuration()))
            .await
            .unwrap();
        assert_eq!(config.version, "1.0.3");
        assert!(config.arbitrary_data_enabled);
        assert_eq!(device.exchanges(), 3);
        assert_eq!(device.opened_and_closed(), (1, 1));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_exhaustion() {
        let device = ScriptedDevice::default();
        for _ in 0..4 {
            device.push(Err(TransportError::Locked));
        }
        let signer = signer_with(&device, Address::ZERO);
        let err = signer
            .perform(|app| Box::pin(app.get_app_configuration()))
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::DeviceUnavailable));
        assert_eq!(device.exchanges(), LEDGER_MAX_ATTEMPTS);
        assert_eq!(device.opened_and_closed(), (1, 1));
    }

    #[tokio::test]
    async fn test_status_error_fails_fast() {
        let device = ScriptedDevice::default();
        device.push(Ok(vec![0x69, 0x85])).ok(&[0x01, 1, 0, 3]);
        let signer = signer_with(&device, Address::ZERO);
        let err = signer
            .perform(|app| Box::pin(app.get_app_configuration()))
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::DeviceStatus { status: 0x6985, .. }));
        assert_eq!(device.exchanges(), 1);
        assert_eq!(device.opened_and_closed(), (1, 1));
    }

    #[test]
    fn test_check_app_version() {
        let config = |version: &str, enabled: bool| AppConfiguration {
            arbitrary_data_enabled: enabled,
            version: version.into(),
        };
        assert!(check_app_version(&config("1.0.3", true), "1.0.3").is_ok());
        assert!(check_app_version(&config("1.2.3", true), "1.0.3").is_ok());
        assert!(check_app_version(&config("2.0.3", true), "1.0.3").is_err());
        assert!(check_app_version(&config("1.0.2", true), "1.0.3").is_err());
        // segment-wise: a newer minor with a lower patch is still rejected
        assert!(check_app_version(&config("1.1.0", true), "1.0.3").is_err());
        assert!(check_app_version(&config("1.0", true), "1.0.3").is_err());
        let err = check_app_version(&config("1.0.3", false), "1.0.3").unwrap_err();
        assert!(err.to_string().contains("contract data"));
    }

    #[tokio::test]
    async fn test_connect_fails_open_on_config_query() {
        let device = ScriptedDevice::default();
        let expected = Address::repeat_byte(0xab);
        device
            .push(Err(TransportError::Io("hid read failed".into())))
            .ok(&address_response(expected));
        let signer = LedgerSigner::connect(Arc::new(device.clone()), "44'/52752'/0'/0/0", 42220, chain())
            .await
            .unwrap();
        assert_eq!(signer.address(), expected);
        assert_eq!(device.opened_and_closed(), (2, 2));
    }

    #[tokio::test]
    async fn test_connect_rejects_old_app() {
        let device = ScriptedDevice::default();
        device.ok(&[0x01, 1, 0, 1]);
        let result =
            LedgerSigner::connect(Arc::new(device.clone()), "44'/52752'/0'/0/0", 42220, chain()).await;
        assert!(matches!(
            result,
            Err(ParysError::Signing(SigningError::UnsupportedApp(_)))
        ));
    }

    #[tokio::test]
    async fn test_sign_transaction_rebuilds_v() {
        let key = PrivateKeySigner::random();
        let device = ScriptedDevice::default();
        let pusd = Address::repeat_byte(0x77);
        let signer = signer_with(&device, key.address()).with_token_info(TokenInfo {
            ticker: "pUSD".into(),
            address: pusd,
            decimals: 18,
            chain_id: 42220,
            signature: Bytes::from(vec![0x30]),
        });

        let mut tx = TxDraft::new(pusd, vec![0xab; 300])
            .with_nonce(3)
            .with_chain_id(42220)
            .with_gas_limit(95_000);
        tx.gas_price = Some(U256::from(1_000_000_000u64));
        tx.fee_currency = Some(pusd);

        let hash = tx.signing_hash().unwrap();
        let expected = key.sign_hash_sync(&hash).unwrap();
        let v = ((42220u64 * 2 + 35 + expected.v() as u64) & 0xff) as u8;
        let mut sig = vec![v];
        sig.extend_from_slice(&expected.r().to_be_bytes::<32>());
        sig.extend_from_slice(&expected.s().to_be_bytes::<32>());

        // token info once (to == fee token), then two sign chunks
        device.ok(&[]).ok(&[]).ok(&sig);
        let raw = signer.sign_transaction(&tx).await.unwrap();
        assert_eq!(raw, tx.encode_signed(&expected).unwrap());
        assert_eq!(device.exchanges(), 3);
        assert_eq!(device.opened_and_closed(), (2, 2));

        let apdus = device.0.lock().unwrap().apdus.clone();
        assert_eq!(apdus[0][1], 0x0a);
        assert_eq!(&apdus[1][..3], &[0xe0, 0x04, 0x00]);
        assert_eq!(&apdus[2][..3], &[0xe0, 0x04, 0x80]);
    }

    #[tokio::test]
    async fn test_sign_transaction_rejects_wrong_signer() {
        let key = PrivateKeySigner::random();
        let device = ScriptedDevice::default();
        let signer = signer_with(&device, Address::repeat_byte(1));
        let mut tx = TxDraft::new(Address::repeat_byte(2), vec![])
            .with_nonce(0)
            .with_chain_id(42220)
            .with_gas_limit(21_000);
        tx.gas_price = Some(U256::from(1u8));

        let expected = key.sign_hash_sync(&tx.signing_hash().unwrap()).unwrap();
        let mut sig = vec![((42220u64 * 2 + 35 + expected.v() as u64) & 0xff) as u8];
        sig.extend_from_slice(&expected.r().to_be_bytes::<32>());
        sig.extend_from_slice(&expected.s().to_be_bytes::<32>());
        device.ok(&sig);

        let err = signer.sign_transaction(&tx).await.unwrap_err();
        assert!(matches!(err, ParysError::Signing(SigningError::Mismatch(_))));
    }

    #[test]
    fn test_parity_reconstruction() {
        // 42220 * 2 + 35 = 0x149fb
        assert!(!eip155_parity(0xfb, 42220));
        assert!(eip155_parity(0xfc, 42220));
        // low byte wraps past 0xff
        assert!(eip155_parity(0x00, 110));
        assert!(!personal_parity(27));
        assert!(personal_parity(28));
    }
}
