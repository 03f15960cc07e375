// Shared trait + result type for batched ledger readers

use crate::state::Address;

/// Raw account data as returned by the ledger, tagged with the address it was
/// read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAccount {
    pub address: Address,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("requested {requested} accounts, got {returned}")]
    LengthMismatch { requested: usize, returned: usize },
}

/// One round trip over an ordered address list.
///
/// Implementations must return exactly one entry per requested address, in
/// request order; `None` means the ledger has no data at that address. A
/// transport failure fails the whole call.
#[async_trait::async_trait]
pub trait AccountReader: Send + Sync {
    async fn read_accounts(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<Option<RemoteAccount>>, TransportError>;
}

#[async_trait::async_trait]
impl<R: AccountReader + ?Sized> AccountReader for std::sync::Arc<R> {
    async fn read_accounts(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<Option<RemoteAccount>>, TransportError> {
        (**self).read_accounts(addresses).await
    }
}

pub mod memory;
pub mod rpc;
pub mod rpc_types;
