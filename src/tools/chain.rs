//! JSON-RPC client for the chain endpoint backing the wallet tools
//!
//! Every request body is signed with HMAC-SHA256 using the wallet signing
//! secret and sent as a hex digest in `X-Wallet-Signature`. The endpoint is
//! expected to manage the wallet key and only accept signed requests.

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "X-Wallet-Signature";

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
const ETHER_DECIMALS: usize = 18;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum ChainError {
    /// Could not reach the endpoint or make sense of its reply
    #[error("chain transport error: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error
    #[error("chain rejected {method}: {message} (code {code})")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },
}

impl ChainError {
    /// Errors the model can reasonably act on
    pub fn is_rejection(&self) -> bool {
        matches!(self, ChainError::Rpc { .. })
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Signed JSON-RPC client
pub struct ChainClient {
    client: Client,
    url: String,
    mac: HmacSha256,
    next_id: AtomicU64,
}

impl ChainClient {
    pub fn new(url: impl Into<String>, signing_secret: &str) -> Result<Self, ChainError> {
        let mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
            .map_err(|e| ChainError::Transport(format!("invalid signing secret: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            mac,
            next_id: AtomicU64::new(1),
        })
    }

    /// Hex HMAC-SHA256 of a request body
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Issue a JSON-RPC call. A `null` result deserializes into `T` as-is,
    /// so callers expecting one ask for an `Option`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .map_err(|e| ChainError::Transport(format!("failed to encode request: {e}")))?;
        let signature = self.sign(&body);

        tracing::debug!(method, id, "Chain RPC request");

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ChainError::Transport(format!("{method}: failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(ChainError::Transport(format!("{method}: HTTP {status}: {text}")));
        }

        let parsed: RpcResponse<Value> = serde_json::from_str(&text)
            .map_err(|e| ChainError::Transport(format!("{method}: malformed response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(ChainError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(parsed.result.unwrap_or(Value::Null))
            .map_err(|e| ChainError::Transport(format!("{method}: unexpected result: {e}")))
    }

    pub async fn accounts(&self) -> Result<Vec<String>, ChainError> {
        self.call("eth_accounts", json!([])).await
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let raw: String = self.call("eth_chainId", json!([])).await?;
        parse_quantity(&raw)
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| ChainError::Transport(format!("eth_chainId: bad quantity {raw}")))
    }

    /// Balance in wei at the latest block
    pub async fn balance(&self, address: &str) -> Result<u128, ChainError> {
        let raw: String = self
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity(&raw)
            .ok_or_else(|| ChainError::Transport(format!("eth_getBalance: bad quantity {raw}")))
    }

    /// Submit a native transfer signed by the endpoint; returns the tx hash
    pub async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        value_wei: u128,
    ) -> Result<String, ChainError> {
        self.call(
            "eth_sendTransaction",
            json!([{ "from": from, "to": to, "value": format!("0x{value_wei:x}") }]),
        )
        .await
    }

    pub async fn transaction_receipt(&self, hash: &str) -> Result<Option<Value>, ChainError> {
        self.call("eth_getTransactionReceipt", json!([hash])).await
    }
}

/// The signing account exposed by the chain endpoint
pub struct Wallet {
    pub client: ChainClient,
    pub address: String,
}

impl Wallet {
    pub fn new(client: ChainClient, address: String) -> Self {
        Self { client, address }
    }

    /// Resolve the wallet address from the endpoint's first account
    pub async fn connect(client: ChainClient) -> Result<Self, ChainError> {
        let address = client
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::Transport("endpoint exposes no accounts".to_string()))?;
        tracing::info!(address = %address, "Wallet connected");
        Ok(Self::new(client, address))
    }
}

/// Parse a `0x`-prefixed hex quantity
pub fn parse_quantity(raw: &str) -> Option<u128> {
    let digits = raw.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    u128::from_str_radix(digits, 16).ok()
}

/// `0x` followed by 40 hex digits
pub fn is_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// `0x` followed by 64 hex digits
pub fn is_tx_hash(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Render wei as a decimal ether amount without trailing zeros
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_ETHER;
    let frac = wei % WEI_PER_ETHER;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0width$}", width = ETHER_DECIMALS);
    format!("{whole}.{}", frac.trim_end_matches('0'))
}

/// Parse a decimal ether amount into wei
pub fn parse_ether(amount: &str) -> Result<u128, String> {
    let amount = amount.trim();
    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err("amount is empty".to_string());
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid amount: {amount}"));
    }
    if frac.len() > ETHER_DECIMALS {
        return Err(format!("amount has more than {ETHER_DECIMALS} decimal places"));
    }

    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| format!("amount too large: {amount}"))?
    };
    let frac: u128 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<width$}", width = ETHER_DECIMALS)
            .parse()
            .map_err(|_| format!("invalid amount: {amount}"))?
    };

    whole
        .checked_mul(WEI_PER_ETHER)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| format!("amount too large: {amount}"))
}
