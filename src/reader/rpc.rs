// JSON-RPC reader: one `getMultipleAccounts` POST per batch

use std::time::Duration;

use base64::Engine as _;
use tracing::{debug, instrument, warn};

use super::rpc_types::{MultipleAccounts, RpcResponse};
use super::{AccountReader, RemoteAccount, TransportError};
use crate::state::Address;

// Typical node cap on keys per getMultipleAccounts call.
pub const MAX_ACCOUNTS_PER_CALL: usize = 100;

pub struct JsonRpcReader {
    pub url: String, // e.g. "https://api.mainnet-beta.solana.com"
    pub commitment: String,
    client: reqwest::Client,
}

impl JsonRpcReader {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url: url.to_string(), commitment: "processed".into(), client })
    }

    fn request_body(&self, addresses: &[Address]) -> serde_json::Value {
        let keys: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getMultipleAccounts",
            "params": [keys, {"encoding": "base64", "commitment": self.commitment}],
        })
    }
}

/// Map the RPC response back onto the requested addresses, position by position.
pub fn parse_response(
    response: RpcResponse<MultipleAccounts>,
    addresses: &[Address],
) -> Result<Vec<Option<RemoteAccount>>, TransportError> {
    if let Some(err) = response.error {
        return Err(TransportError::Rpc { code: err.code, message: err.message });
    }
    let result = response
        .result
        .ok_or_else(|| TransportError::Malformed("response has neither result nor error".into()))?;
    if result.value.len() != addresses.len() {
        return Err(TransportError::LengthMismatch {
            requested: addresses.len(),
            returned: result.value.len(),
        });
    }
    debug!(slot = result.context.slot, count = addresses.len(), "getMultipleAccounts returned");

    result
        .value
        .into_iter()
        .zip(addresses)
        .map(|(ui, address)| {
            let Some(ui) = ui else { return Ok(None) };
            let (payload, encoding) = ui.data;
            if encoding != "base64" {
                return Err(TransportError::Malformed(format!("unexpected encoding {}", encoding)));
            }
            let data = base64::engine::general_purpose::STANDARD
                .decode(payload)
                .map_err(|e| TransportError::Malformed(format!("bad base64 for {}: {}", address, e)))?;
            Ok(Some(RemoteAccount { address: *address, data }))
        })
        .collect()
}

#[async_trait::async_trait]
impl AccountReader for JsonRpcReader {
    #[instrument(skip_all, fields(count = addresses.len()))]
    async fn read_accounts(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<Option<RemoteAccount>>, TransportError> {
        if addresses.len() > MAX_ACCOUNTS_PER_CALL {
            warn!(count = addresses.len(), "batch exceeds typical node key limit");
        }
        let res = self
            .client
            .post(&self.url)
            .json(&self.request_body(addresses))
            .send()
            .await?
            .error_for_status()?;

        let body: RpcResponse<MultipleAccounts> = res.json().await?;
        parse_response(body, addresses)
    }
}
