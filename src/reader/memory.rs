// Map-backed reader for dry runs and tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::{AccountReader, RemoteAccount, TransportError};
use crate::state::Address;

#[derive(Debug, Default)]
pub struct InMemoryReader {
    accounts: RwLock<HashMap<Address, Vec<u8>>>,
    round_trips: AtomicUsize,
}

impl InMemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the data stored at `address`.
    pub fn insert(&self, address: Address, data: Vec<u8>) {
        self.accounts.write().insert(address, data);
    }

    pub fn remove(&self, address: &Address) -> Option<Vec<u8>> {
        self.accounts.write().remove(address)
    }

    /// Number of `read_accounts` calls served so far.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl AccountReader for InMemoryReader {
    async fn read_accounts(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<Option<RemoteAccount>>, TransportError> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        let accounts = self.accounts.read();
        Ok(addresses
            .iter()
            .map(|a| {
                accounts
                    .get(a)
                    .map(|data| RemoteAccount { address: *a, data: data.clone() })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_preserves_order_and_marks_absent() {
        let reader = InMemoryReader::new();
        reader.insert(Address([1; 32]), vec![1]);
        reader.insert(Address([3; 32]), vec![3]);

        let res = reader
            .read_accounts(&[Address([3; 32]), Address([2; 32]), Address([1; 32])])
            .await
            .unwrap();
        assert_eq!(res.len(), 3);
        assert_eq!(res[0].as_ref().map(|r| r.data.clone()), Some(vec![3]));
        assert!(res[1].is_none());
        assert_eq!(res[2].as_ref().map(|r| r.address), Some(Address([1; 32])));
        assert_eq!(reader.round_trips(), 1);
    }
}
