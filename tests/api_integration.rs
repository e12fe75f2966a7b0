//! REST API integration scenarios
//!
//! End-to-end route tests over the real router and an in-memory database,
//! with every external service mocked:
//! 1. Vouch issuance and quota exhaustion (the 0xAAA/0xBBB scenario)
//! 2. Self-vouch and attester-mismatch rejection
//! 3. Relay failure compensation
//! 4. Paginated user listing
//! 5. Ticket-link deduplication
//! 6. Derived-credential signing (fail-closed without a key)
//! 7. Remaining-quota reads

use agorapass::attestation::index::TicketLinkRecord;
use agorapass::attestation::mock::{MockIndex, MockRelay};
use agorapass::attestation::typed_data::EAS_CONTRACT;
use agorapass::attestation::AttestationParams;
use agorapass::identity::MockIdentityProvider;
use agorapass::season::{AccountVouchState, MockSeasonContract, Season};
use agorapass::server::{router, AppState};
use agorapass::store::{NewUser, Store};
use agorapass::zupass::{PodError, PodIssuer, PodSigner};
use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const WALLET_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const WALLET_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const POD_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

/// Pod issuer double returning a fixed document
struct MockPodIssuer;

#[async_trait]
impl PodIssuer for MockPodIssuer {
    async fn create_pod(
        &self,
        _token: &str,
        wallet: &str,
        score: f64,
    ) -> Result<Value, PodError> {
        Ok(json!({ "pod": { "wallet": wallet, "score": score } }))
    }
}

struct Harness {
    state: AppState,
    relay: Arc<MockRelay>,
    index: Arc<MockIndex>,
    identity: Arc<MockIdentityProvider>,
    season: Arc<MockSeasonContract>,
}

async fn harness(with_pod_key: bool) -> Harness {
    let store = Store::open_in_memory().await.unwrap();
    let relay = Arc::new(MockRelay::new());
    let index = Arc::new(MockIndex::new());
    let identity = Arc::new(MockIdentityProvider::new());
    let season = Arc::new(MockSeasonContract::new(
        1,
        Season {
            start_timestamp: 1_000,
            end_timestamp: 2_000,
            max_account_vouches: 5,
            max_total_vouches: 100,
            total_vouches: 0,
        },
    ));

    let pod_signer = with_pod_key.then(|| Arc::new(PodSigner::from_hex_key(POD_KEY).unwrap()));

    let state = AppState {
        store,
        identity: identity.clone(),
        relay: relay.clone(),
        index: index.clone(),
        season: season.clone(),
        pod_issuer: Arc::new(MockPodIssuer),
        pod_signer,
        params: AttestationParams {
            chain_id: 84532,
            eas_contract: EAS_CONTRACT.parse().unwrap(),
            schema: B256::repeat_byte(0x11),
            zupass_schema: B256::repeat_byte(0x22),
        },
    };

    Harness {
        state,
        relay,
        index,
        identity,
        season,
    }
}

impl Harness {
    /// Create a user with a granted session token
    async fn seed_user(&self, id: &str, wallet: &str, token: &str) {
        self.state
            .store
            .create_user(NewUser {
                id: id.into(),
                wallet: wallet.into(),
                name: Some(format!("user-{id}")),
                bio: None,
                email: None,
            })
            .await
            .unwrap();
        self.identity.grant(token, id);
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", token);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router(self.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn vouches_available(&self, id: &str) -> i64 {
        self.state
            .store
            .get_user(id)
            .await
            .unwrap()
            .unwrap()
            .vouches_available
    }
}

fn vouch_body(recipient: &str, attester: &str) -> Value {
    json!({
        "recipient": recipient,
        "attester": attester,
        "signature": format!("0x{}", "11".repeat(65)),
        "nonce": 0,
        "claim": { "kind": "standardVouch" },
    })
}

#[tokio::test]
async fn scenario_vouch_then_quota_exhausted() {
    let h = harness(false).await;
    h.seed_user("u-aaa", WALLET_A, "tok-a").await;
    h.state.store.set_vouches_available("u-aaa", 1).await.unwrap();

    // First vouch succeeds and consumes the only unit
    let (status, body) = h
        .request(
            "POST",
            "/api/createAttestation",
            Some("tok-a"),
            Some(vouch_body(WALLET_B, WALLET_A)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["newAttestationUID"].as_str().unwrap().starts_with("0xmock"));
    assert_eq!(h.vouches_available("u-aaa").await, 0);

    let submissions = h.relay.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].attester, WALLET_A.parse::<Address>().unwrap());
    assert_eq!(submissions[0].recipient, WALLET_B.parse::<Address>().unwrap());

    // Second attempt hits the distinguished quota status
    let (status, body) = h
        .request(
            "POST",
            "/api/createAttestation",
            Some("tok-a"),
            Some(vouch_body(WALLET_B, WALLET_A)),
        )
        .await;
    assert_eq!(status.as_u16(), 550);
    assert_eq!(body["error"], "you have no vouches available");
    assert_eq!(h.vouches_available("u-aaa").await, 0, "counter unchanged");
    assert_eq!(h.relay.submissions().len(), 1, "nothing new submitted");
}

#[tokio::test]
async fn self_vouch_is_rejected_without_decrement() {
    let h = harness(false).await;
    h.seed_user("u-aaa", WALLET_A, "tok-a").await;

    let (status, body) = h
        .request(
            "POST",
            "/api/createAttestation",
            Some("tok-a"),
            Some(vouch_body(WALLET_A, WALLET_A)),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "you can't vouch yourself");
    assert_eq!(h.vouches_available("u-aaa").await, 3);
    assert!(h.relay.submissions().is_empty());
}

#[tokio::test]
async fn attester_must_match_session_wallet() {
    let h = harness(false).await;
    h.seed_user("u-aaa", WALLET_A, "tok-a").await;

    // Session belongs to WALLET_A but the body claims WALLET_B as attester
    let (status, _) = h
        .request(
            "POST",
            "/api/createAttestation",
            Some("tok-a"),
            Some(vouch_body(WALLET_A, WALLET_B)),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.relay.submissions().is_empty());
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let h = harness(false).await;

    let (status, _) = h
        .request(
            "POST",
            "/api/createAttestation",
            None,
            Some(vouch_body(WALLET_B, WALLET_A)),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h
        .request(
            "POST",
            "/api/createAttestation",
            Some("unknown-token"),
            Some(vouch_body(WALLET_B, WALLET_A)),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn relay_failure_restores_quota() {
    let h = harness(false).await;
    h.seed_user("u-aaa", WALLET_A, "tok-a").await;
    h.state.store.set_vouches_available("u-aaa", 1).await.unwrap();
    h.relay.fail_submit();

    let (status, _) = h
        .request(
            "POST",
            "/api/createAttestation",
            Some("tok-a"),
            Some(vouch_body(WALLET_B, WALLET_A)),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        h.vouches_available("u-aaa").await,
        1,
        "reserved quota is given back after a failed submission"
    );
}

#[tokio::test]
async fn user_creation_and_duplicate_rejection() {
    let h = harness(false).await;
    h.identity.grant("tok-new", "u-new");

    let body = json!({
        "name": "Alice",
        "email": { "address": "alice@example.org" },
        "wallet": { "address": WALLET_A },
    });

    let (status, response) = h
        .request("POST", "/api/user", Some("tok-new"), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["newUser"]["name"], "Alice");
    assert_eq!(response["newUser"]["vouchesAvailables"], 3);

    let (status, _) = h
        .request("POST", "/api/user", Some("tok-new"), Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_patch_validates_name() {
    let h = harness(false).await;
    h.seed_user("u-aaa", WALLET_A, "tok-a").await;

    let (status, _) = h
        .request(
            "PATCH",
            "/api/user",
            Some("tok-a"),
            Some(json!({ "name": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h
        .request(
            "PATCH",
            "/api/user",
            Some("tok-a"),
            Some(json!({ "name": "  Alice  ", "bio": "hello" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["bio"], "hello");
}

#[tokio::test]
async fn listing_pages_by_rank_score() {
    let h = harness(false).await;
    for n in 0..25u32 {
        let id = format!("u-{n}");
        h.state
            .store
            .create_user(NewUser {
                id: id.clone(),
                wallet: format!("0x{:040x}", n + 1),
                name: Some(format!("User {n}")),
                bio: None,
                email: None,
            })
            .await
            .unwrap();
        h.state.store.set_rank_score(&id, n as f64).await.unwrap();
    }

    let (status, body) = h
        .request("GET", "/api/users?page=1&limit=12", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 12);
    assert_eq!(body["total"], 25);
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["nextPage"], 2);
    assert_eq!(body["users"][0]["rankScore"], 24.0);

    let (_, body) = h
        .request("GET", "/api/users?page=3&limit=12", None, None)
        .await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["hasMore"], false);
    assert!(body.get("nextPage").is_none(), "no next page on the last page");
}

#[tokio::test]
async fn check_semaphore_dedup_policy() {
    let h = harness(false).await;
    h.seed_user("u-aaa", WALLET_A, "tok-a").await;

    let body = json!({ "semaphoreId": "0xnull1", "ticketType": "GA" });

    // Fresh credential: no match
    let (status, response) = h
        .request("POST", "/api/zupass/checkSemaphore", Some("tok-a"), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["exists"], false);
    assert_eq!(response["isSameWallet"], false);

    // Linked to this wallet: idempotent, and the row is persisted
    h.index.push(TicketLinkRecord {
        uid: "0xlinked".into(),
        recipient: WALLET_A.parse().unwrap(),
        ticket_type: "GA".into(),
    });
    let (_, response) = h
        .request("POST", "/api/zupass/checkSemaphore", Some("tok-a"), Some(body.clone()))
        .await;
    assert_eq!(response["exists"], true);
    assert_eq!(response["isSameWallet"], true);

    let (_, lookup) = h
        .request("GET", &format!("/api/users/wallet/{WALLET_A}"), None, None)
        .await;
    assert_eq!(lookup["zupass"]["attestationUID"], "0xlinked");

    // Same credential from another account: claimed elsewhere
    h.seed_user("u-bbb", WALLET_B, "tok-b").await;
    let (_, response) = h
        .request("POST", "/api/zupass/checkSemaphore", Some("tok-b"), Some(body))
        .await;
    assert_eq!(response["exists"], true);
    assert_eq!(response["isSameWallet"], false);
}

#[tokio::test]
async fn sign_pod_fails_closed_without_key() {
    let h = harness(false).await;
    h.seed_user("u-aaa", WALLET_A, "tok-a").await;

    let (status, _) = h
        .request(
            "POST",
            "/api/zupass/sign-pod",
            Some("tok-a"),
            Some(json!({ "timestamp": 1_700_000_000u64 })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn sign_pod_issues_then_returns_cached_url() {
    let h = harness(true).await;
    h.seed_user("u-aaa", WALLET_A, "tok-a").await;

    let (status, first) = h
        .request(
            "POST",
            "/api/zupass/sign-pod",
            Some("tok-a"),
            Some(json!({ "timestamp": 1_700_000_000u64 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cached"], false);
    let url = first["url"].as_str().unwrap().to_string();
    assert!(first["podpcd"]["signature"].as_str().unwrap().starts_with("0x"));

    let (status, second) = h
        .request(
            "POST",
            "/api/zupass/sign-pod",
            Some("tok-a"),
            Some(json!({ "timestamp": 1_800_000_000u64 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cached"], true);
    assert_eq!(second["url"], url);
}

#[tokio::test]
async fn pod_create_forwards_score() {
    let h = harness(false).await;
    h.seed_user("u-aaa", WALLET_A, "tok-a").await;
    h.state.store.set_rank_score("u-aaa", 12.5).await.unwrap();

    let (status, body) = h
        .request("POST", "/api/zupass/pod/create", Some("tok-a"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pod"]["score"], 12.5);
    assert_eq!(body["pod"]["wallet"], WALLET_A);
}

#[tokio::test]
async fn remaining_quota_reads_the_contract() {
    let h = harness(false).await;
    h.season.set_account(
        WALLET_A.parse().unwrap(),
        AccountVouchState {
            total_vouches: 2,
            last_vouch_timestamp: 1_500,
        },
    );

    let (status, body) = h
        .request("GET", &format!("/api/season/remaining/{WALLET_A}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], 3);
}

#[tokio::test]
async fn remaining_quota_is_null_when_reads_fail() {
    let h = harness(false).await;
    h.season.fail();

    let (_, body) = h
        .request("GET", &format!("/api/season/remaining/{WALLET_A}"), None, None)
        .await;
    assert!(body["remaining"].is_null(), "unknown, never zero");
}

#[tokio::test]
async fn wallet_lookup_404_for_unknown_wallet() {
    let h = harness(false).await;
    let (status, _) = h
        .request("GET", &format!("/api/users/wallet/{WALLET_B}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
