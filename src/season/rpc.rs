//! JSON-RPC reads against the vouching season contract
//!
//! Plain `eth_call` plumbing: 4-byte keccak selector plus 32-byte words in,
//! fixed-layout words out. `vouchingSeasons(uint256)` returns five words,
//! `accountVouches(address,uint256)` two.

use super::{AccountVouchState, ContractError, Season, SeasonContract};
use alloy::primitives::{keccak256, Address, U256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    message: String,
}

/// Season contract reader over a JSON-RPC endpoint
#[derive(Clone)]
pub struct RpcSeasonContract {
    http: reqwest::Client,
    rpc_url: String,
    contract: Address,
}

impl RpcSeasonContract {
    pub fn new(http: reqwest::Client, rpc_url: impl Into<String>, contract: Address) -> Self {
        Self {
            http,
            rpc_url: rpc_url.into(),
            contract,
        }
    }

    async fn eth_call(&self, calldata: Vec<u8>) -> Result<Vec<u8>, ContractError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {
                    "to": format!("{:#x}", self.contract),
                    "data": format!("0x{}", hex::encode(&calldata)),
                },
                "latest",
            ],
        });

        let response = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ContractError::Transport(e.to_string()))?;

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ContractError::Transport(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(ContractError::Rpc(error.message));
        }

        let result = parsed
            .result
            .ok_or_else(|| ContractError::Rpc("empty result".into()))?;

        hex::decode(result.trim_start_matches("0x"))
            .map_err(|e| ContractError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SeasonContract for RpcSeasonContract {
    async fn current_season(&self) -> Result<u64, ContractError> {
        let data = self.eth_call(selector("currentSeason()").to_vec()).await?;
        let words = decode_words(&data, 1)?;
        word_to_u64(words[0])
    }

    async fn vouching_season(&self, season: u64) -> Result<Season, ContractError> {
        let mut calldata = selector("vouchingSeasons(uint256)").to_vec();
        calldata.extend_from_slice(&U256::from(season).to_be_bytes::<32>());

        let data = self.eth_call(calldata).await?;
        let words = decode_words(&data, 5)?;

        Ok(Season {
            start_timestamp: word_to_u64(words[0])?,
            end_timestamp: word_to_u64(words[1])?,
            max_account_vouches: word_to_u64(words[2])?,
            max_total_vouches: word_to_u64(words[3])?,
            total_vouches: word_to_u64(words[4])?,
        })
    }

    async fn account_vouches(
        &self,
        address: Address,
        season: u64,
    ) -> Result<AccountVouchState, ContractError> {
        let mut calldata = selector("accountVouches(address,uint256)").to_vec();
        let mut addr_word = [0u8; 32];
        addr_word[12..].copy_from_slice(address.as_slice());
        calldata.extend_from_slice(&addr_word);
        calldata.extend_from_slice(&U256::from(season).to_be_bytes::<32>());

        let data = self.eth_call(calldata).await?;
        let words = decode_words(&data, 2)?;

        Ok(AccountVouchState {
            total_vouches: word_to_u64(words[0])?,
            last_vouch_timestamp: word_to_u64(words[1])?,
        })
    }
}

/// First four bytes of keccak256 of the function signature
fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Split return data into exactly `count` 32-byte words
fn decode_words(data: &[u8], count: usize) -> Result<Vec<&[u8]>, ContractError> {
    if data.len() != count * 32 {
        return Err(ContractError::Decode(format!(
            "expected {} words, got {} bytes",
            count,
            data.len()
        )));
    }
    Ok(data.chunks_exact(32).collect())
}

fn word_to_u64(word: &[u8]) -> Result<u64, ContractError> {
    let value = U256::from_be_slice(word);
    u64::try_from(value).map_err(|_| ContractError::Decode("word exceeds u64".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_keccak_prefix() {
        // Well-known selector for transfer(address,uint256) = 0xa9059cbb
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn word_decoding_enforces_length() {
        let data = vec![0u8; 64];
        assert!(decode_words(&data, 2).is_ok());
        assert!(decode_words(&data, 5).is_err());
    }

    #[test]
    fn word_to_u64_rejects_overflow() {
        let mut word = [0u8; 32];
        word[0] = 1; // high byte set, far above u64
        assert!(word_to_u64(&word).is_err());

        let mut small = [0u8; 32];
        small[31] = 42;
        assert_eq!(word_to_u64(&small).unwrap(), 42);
    }
}
