// Wire types for JSON-RPC `getMultipleAccounts`
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>, // absent on error
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

#[derive(Debug, Deserialize)]
pub struct MultipleAccounts {
    pub context: RpcContext,
    pub value: Vec<Option<UiAccount>>, // null = no account at that address
}

#[derive(Debug, Deserialize)]
pub struct UiAccount {
    pub data: (String, String), // (payload, encoding), encoding is "base64"
    pub owner: String,
    pub lamports: u64,
    // we ignore executable / rentEpoch
}
