//! EIP-712 typed data for delegated attestations
//!
//! Builds the `Attest` typed-data request the wallet signs so the relay can
//! submit the attestation on the signer's behalf. The domain is the EAS
//! contract (name "EAS", version "1.2.0") on the configured chain.
//!
//! Signing is a suspend point: the real signer may prompt the user through a
//! wallet UI, and a rejection is user intent, not a transient failure.

use alloy::primitives::{keccak256, Address, Signature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

/// EAS contract deployed at the same address on OP-stack chains
pub const EAS_CONTRACT: &str = "0x4200000000000000000000000000000000000021";

/// keccak256 of the Attest struct type string
const ATTEST_TYPE: &str = "Attest(bytes32 schema,address recipient,uint64 expirationTime,bool revocable,bytes32 refUID,bytes data,uint256 value,uint256 nonce,uint64 deadline)";

/// keccak256 of the EIP-712 domain type string
const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Errors from the wallet signing seam
#[derive(Debug, Error)]
pub enum SignError {
    /// The user declined the signing prompt. Terminal; never retried.
    #[error("signing rejected by the wallet")]
    Rejected,

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// EIP-712 domain parameters for the attestation contract
#[derive(Debug, Clone, Copy)]
pub struct AttestationDomain {
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl AttestationDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
        }
    }

    /// EIP-712 domain separator: name "EAS", version "1.2.0"
    pub fn separator(&self) -> B256 {
        let mut buf = Vec::with_capacity(5 * 32);
        buf.extend_from_slice(keccak256(DOMAIN_TYPE.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(b"EAS").as_slice());
        buf.extend_from_slice(keccak256(b"1.2.0").as_slice());
        buf.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf.extend_from_slice(&address_word(self.verifying_contract));
        keccak256(&buf)
    }
}

/// The Attest message a wallet signs.
///
/// Expiration, refUID, value, and deadline are fixed to their "no limit"
/// values; the relay supplies the nonce.
#[derive(Debug, Clone)]
pub struct AttestRequest {
    pub schema: B256,
    pub recipient: Address,
    pub data: Vec<u8>,
    pub nonce: u64,
}

impl AttestRequest {
    /// EIP-712 struct hash of the Attest message
    pub fn struct_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(10 * 32);
        buf.extend_from_slice(keccak256(ATTEST_TYPE.as_bytes()).as_slice());
        buf.extend_from_slice(self.schema.as_slice());
        buf.extend_from_slice(&address_word(self.recipient));
        buf.extend_from_slice(&U256::ZERO.to_be_bytes::<32>()); // expirationTime
        buf.extend_from_slice(&U256::from(1u64).to_be_bytes::<32>()); // revocable = true
        buf.extend_from_slice(B256::ZERO.as_slice()); // refUID
        buf.extend_from_slice(keccak256(&self.data).as_slice());
        buf.extend_from_slice(&U256::ZERO.to_be_bytes::<32>()); // value
        buf.extend_from_slice(&U256::from(self.nonce).to_be_bytes::<32>());
        buf.extend_from_slice(&U256::ZERO.to_be_bytes::<32>()); // deadline
        keccak256(&buf)
    }

    /// Final EIP-712 digest: keccak256(0x1901 || domainSeparator || structHash)
    pub fn eip712_digest(&self, domain: &AttestationDomain) -> B256 {
        let mut buf = Vec::with_capacity(2 + 64);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(domain.separator().as_slice());
        buf.extend_from_slice(self.struct_hash().as_slice());
        keccak256(&buf)
    }

    /// Typed-data JSON document for wallets that sign the full request
    pub fn typed_data_json(&self, domain: &AttestationDomain) -> Value {
        json!({
            "types": {
                "Attest": [
                    { "name": "schema", "type": "bytes32" },
                    { "name": "recipient", "type": "address" },
                    { "name": "expirationTime", "type": "uint64" },
                    { "name": "revocable", "type": "bool" },
                    { "name": "refUID", "type": "bytes32" },
                    { "name": "data", "type": "bytes" },
                    { "name": "value", "type": "uint256" },
                    { "name": "nonce", "type": "uint256" },
                    { "name": "deadline", "type": "uint64" },
                ],
            },
            "primaryType": "Attest",
            "domain": {
                "name": "EAS",
                "version": "1.2.0",
                "chainId": domain.chain_id,
                "verifyingContract": format!("{:#x}", domain.verifying_contract),
            },
            "message": {
                "schema": format!("{:#x}", self.schema),
                "recipient": format!("{:#x}", self.recipient),
                "expirationTime": 0,
                "revocable": true,
                "refUID": format!("{:#x}", B256::ZERO),
                "data": format!("0x{}", hex::encode(&self.data)),
                "value": 0,
                "nonce": self.nonce,
                "deadline": 0,
            },
        })
    }
}

/// Render a signature as 0x-prefixed flat hex (r || s || v)
pub fn signature_to_hex(signature: &Signature) -> String {
    format!("0x{}", hex::encode(signature.as_bytes()))
}

/// Wallet signing seam.
///
/// The real implementation may block on a user prompt for an unbounded time;
/// callers treat `Rejected` as a terminal cancellation.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// The wallet address acting as attester
    fn address(&self) -> Address;

    /// Sign a 32-byte EIP-712 digest
    async fn sign_digest(&self, digest: B256) -> Result<Signature, SignError>;
}

/// Local private-key signer (server-held or test wallets)
pub struct LocalWalletSigner {
    inner: PrivateKeySigner,
}

impl LocalWalletSigner {
    /// Build from a 0x-prefixed hex private key
    pub fn from_hex_key(key: &str) -> Result<Self, SignError> {
        let inner: PrivateKeySigner = key
            .trim()
            .parse()
            .map_err(|e: alloy::signers::local::LocalSignerError| {
                SignError::InvalidKey(e.to_string())
            })?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl WalletSigner for LocalWalletSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_digest(&self, digest: B256) -> Result<Signature, SignError> {
        self.inner
            .sign_hash_sync(&digest)
            .map_err(|e| SignError::Wallet(e.to_string()))
    }
}

/// Left-pad a 20-byte address into a 32-byte ABI word
fn address_word(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::claim::ClaimData;

    const TEST_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    fn request(nonce: u64) -> AttestRequest {
        AttestRequest {
            schema: B256::repeat_byte(0x11),
            recipient: "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB"
                .parse()
                .unwrap(),
            data: ClaimData::standard_vouch().encode().unwrap(),
            nonce,
        }
    }

    fn domain() -> AttestationDomain {
        AttestationDomain::new(84532, EAS_CONTRACT.parse().unwrap())
    }

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(
            request(7).eip712_digest(&domain()),
            request(7).eip712_digest(&domain())
        );
    }

    #[test]
    fn nonce_changes_digest() {
        // A stale nonce must produce a different signature payload
        assert_ne!(
            request(7).eip712_digest(&domain()),
            request(8).eip712_digest(&domain())
        );
    }

    #[test]
    fn chain_id_changes_domain_separator() {
        let base = AttestationDomain::new(8453, EAS_CONTRACT.parse().unwrap());
        let sepolia = AttestationDomain::new(84532, EAS_CONTRACT.parse().unwrap());
        assert_ne!(base.separator(), sepolia.separator());
    }

    #[test]
    fn typed_data_json_carries_message_fields() {
        let doc = request(3).typed_data_json(&domain());

        assert_eq!(doc["primaryType"], "Attest");
        assert_eq!(doc["domain"]["name"], "EAS");
        assert_eq!(doc["domain"]["version"], "1.2.0");
        assert_eq!(doc["domain"]["chainId"], 84532);
        assert_eq!(doc["message"]["nonce"], 3);
        assert_eq!(doc["message"]["revocable"], true);
        assert_eq!(doc["message"]["expirationTime"], 0);
        assert_eq!(doc["message"]["deadline"], 0);
    }

    #[tokio::test]
    async fn local_signer_produces_recoverable_signature() {
        let signer = LocalWalletSigner::from_hex_key(TEST_KEY).unwrap();
        let digest = request(1).eip712_digest(&domain());

        let signature = signer.sign_digest(digest).await.unwrap();
        let recovered = signature.recover_address_from_prehash(&digest).unwrap();

        assert_eq!(recovered, signer.address());

        let hex = signature_to_hex(&signature);
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 2 + 65 * 2);
    }

    #[test]
    fn invalid_key_is_rejected() {
        assert!(matches!(
            LocalWalletSigner::from_hex_key("not-a-key"),
            Err(SignError::InvalidKey(_))
        ));
    }
}
