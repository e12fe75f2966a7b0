//! Mock relay, index, and wallet signer for tests
//!
//! Deterministic in-memory doubles for the external attestation services,
//! mirroring the trait seams so flows and route handlers are fully testable
//! without a network.

use crate::attestation::index::{AttestationIndex, IndexError, TicketLinkRecord};
use crate::attestation::relay::{AttestationRelay, DelegatedAttestation, NonceError, RelayError};
use crate::attestation::typed_data::{SignError, WalletSigner};
use alloy::primitives::{Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// In-memory relay double.
///
/// Hands out monotonic nonces, records submissions, and returns
/// deterministic `0xmock...` UIDs. Failure modes are toggled per test.
#[derive(Default)]
pub struct MockRelay {
    next_nonce: AtomicU64,
    submissions: Mutex<Vec<DelegatedAttestation>>,
    fail_nonce: AtomicBool,
    fail_submit: AtomicBool,
}

impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent nonce fetches fail
    pub fn fail_nonce(&self) {
        self.fail_nonce.store(true, Ordering::SeqCst);
    }

    /// Make subsequent submissions fail
    pub fn fail_submit(&self) {
        self.fail_submit.store(true, Ordering::SeqCst);
    }

    /// Submissions recorded so far
    pub fn submissions(&self) -> Vec<DelegatedAttestation> {
        self.submissions.lock().expect("mock lock poisoned").clone()
    }
}

#[async_trait]
impl AttestationRelay for MockRelay {
    async fn nonce(&self, _attester: Address) -> Result<u64, NonceError> {
        if self.fail_nonce.load(Ordering::SeqCst) {
            return Err(NonceError::Unavailable("mock nonce failure".into()));
        }
        Ok(self.next_nonce.fetch_add(1, Ordering::SeqCst))
    }

    async fn submit(
        &self,
        _token: &str,
        attestation: &DelegatedAttestation,
    ) -> Result<String, RelayError> {
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(RelayError::Transport("mock submit failure".into()));
        }
        let mut submissions = self.submissions.lock().expect("mock lock poisoned");
        submissions.push(attestation.clone());
        Ok(format!("0xmock{:064x}", submissions.len()))
    }
}

/// In-memory attestation index double
#[derive(Default)]
pub struct MockIndex {
    records: Mutex<Vec<TicketLinkRecord>>,
    fail: AtomicBool,
}

impl MockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TicketLinkRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            fail: AtomicBool::new(false),
        }
    }

    pub fn push(&self, record: TicketLinkRecord) {
        self.records.lock().expect("mock lock poisoned").push(record);
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AttestationIndex for MockIndex {
    async fn ticket_links(
        &self,
        _schema: B256,
        nullifier: &str,
    ) -> Result<Vec<TicketLinkRecord>, IndexError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IndexError::Query("mock index failure".into()));
        }
        // Tests seed only records for the queried nullifier
        let _ = nullifier;
        Ok(self.records.lock().expect("mock lock poisoned").clone())
    }
}

/// Wallet double backed by a fixed test key.
///
/// Produces real recoverable signatures so digest plumbing is exercised;
/// `rejecting()` simulates the user declining the prompt.
pub struct MockWalletSigner {
    inner: PrivateKeySigner,
    reject: AtomicBool,
}

/// Well-known test key (never holds funds)
const MOCK_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

impl MockWalletSigner {
    pub fn new() -> Self {
        Self {
            inner: MOCK_KEY.parse().expect("mock key is valid"),
            reject: AtomicBool::new(false),
        }
    }

    /// A signer that declines every prompt
    pub fn rejecting() -> Self {
        let signer = Self::new();
        signer.reject.store(true, Ordering::SeqCst);
        signer
    }
}

impl Default for MockWalletSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletSigner for MockWalletSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_digest(&self, digest: B256) -> Result<Signature, SignError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(SignError::Rejected);
        }
        self.inner
            .sign_hash_sync(&digest)
            .map_err(|e| SignError::Wallet(e.to_string()))
    }
}
