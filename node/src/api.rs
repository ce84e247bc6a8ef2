//! # REST API
//!
//! Builds the axum router that exposes the vault lifecycle over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! Keys travel as hex-encoded Ed25519 secrets in request bodies. This is a
//! devnet service; nothing here is meant to face the internet.
//!
//! ## Endpoints
//!
//! | Method | Path                                        | Description                       |
//! |--------|---------------------------------------------|-----------------------------------|
//! | GET    | `/health`                                   | Liveness probe                    |
//! | GET    | `/vaults`                                   | Every stored vault address        |
//! | POST   | `/vaults`                                   | Deploy and persist a vault        |
//! | GET    | `/vaults/:vault`                            | Full status snapshot              |
//! | DELETE | `/vaults/:vault`                            | Drop the record (owner only)      |
//! | GET    | `/vaults/:vault/dashboard`                  | Owner summary                     |
//! | POST   | `/vaults/:vault/fund`                       | Send native currency to the vault |
//! | POST   | `/vaults/:vault/setup`                      | Replace the beneficiary set       |
//! | POST   | `/vaults/:vault/beneficiaries`              | Add one beneficiary               |
//! | GET    | `/vaults/:vault/beneficiaries/:beneficiary` | Beneficiary view                  |
//! | DELETE | `/vaults/:vault/beneficiaries/:beneficiary` | Remove one beneficiary            |
//! | POST   | `/vaults/:vault/checkin`                    | Owner check-in                    |
//! | POST   | `/vaults/:vault/claim`                      | Beneficiary claim                 |
//! | POST   | `/devnet/keygen`                            | Fresh account key                 |
//! | POST   | `/devnet/faucet`                            | Mint native currency              |
//! | GET    | `/devnet/accounts/:address`                 | Native balance of any account     |

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use lastwill_contracts::SimulatedChain;
use lastwill_protocol::crypto::AccountKey;
use lastwill_protocol::primitives::{Address, Amount, Asset};
use lastwill_protocol::storage::StoreError;
use lastwill_protocol::time::CheckInPeriod;
use lastwill_protocol::validation::validate_address;
use lastwill_protocol::vault::BeneficiaryInput;
use lastwill_protocol::{VaultEngine, VaultError};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub engine: Arc<VaultEngine>,
    /// The devnet the engine talks to. Only the `/devnet` routes touch it
    /// directly.
    pub chain: Arc<SimulatedChain>,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/vaults", get(list_vaults_handler).post(create_vault_handler))
        .route(
            "/vaults/:vault",
            get(vault_status_handler).delete(delete_vault_handler),
        )
        .route("/vaults/:vault/dashboard", get(dashboard_handler))
        .route("/vaults/:vault/fund", post(fund_vault_handler))
        .route("/vaults/:vault/setup", post(setup_handler))
        .route("/vaults/:vault/beneficiaries", post(add_beneficiary_handler))
        .route(
            "/vaults/:vault/beneficiaries/:beneficiary",
            get(beneficiary_view_handler).delete(remove_beneficiary_handler),
        )
        .route("/vaults/:vault/checkin", post(check_in_handler))
        .route("/vaults/:vault/claim", post(claim_handler))
        .route("/devnet/keygen", post(keygen_handler))
        .route("/devnet/faucet", post(faucet_handler))
        .route("/devnet/accounts/:address", get(account_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request Types
// ---------------------------------------------------------------------------

/// Body of `POST /vaults`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateVaultRequest {
    pub owner_key: String,
    pub period: CheckInPeriod,
    #[serde(default)]
    pub initial_funding: Option<Amount>,
}

/// Body of `POST /vaults/:vault/fund`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FundRequest {
    pub funder_key: String,
    pub amount: Amount,
}

/// Body of `POST /vaults/:vault/setup`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetupRequest {
    pub owner_key: String,
    pub beneficiaries: Vec<BeneficiaryInput>,
    /// Unlock time for the new delegations. Defaults to the vault deadline.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

/// Body of `POST /vaults/:vault/beneficiaries`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddBeneficiaryRequest {
    pub owner_key: String,
    pub beneficiary: BeneficiaryInput,
}

/// Body of the owner-only calls that carry nothing else.
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerRequest {
    pub owner_key: String,
}

/// Body of `POST /vaults/:vault/checkin`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub owner_key: String,
    /// Switches the vault to a new period from this check-in on.
    #[serde(default)]
    pub period: Option<CheckInPeriod>,
}

/// Body of `POST /vaults/:vault/claim`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub beneficiary_key: String,
}

/// Body of `POST /devnet/faucet`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FaucetRequest {
    pub address: String,
    pub amount: Amount,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /vaults`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultListResponse {
    pub vaults: Vec<Address>,
}

/// Response payload for `POST /devnet/keygen`.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeygenResponse {
    /// Hex-encoded secret. Shown once; the node keeps no copy.
    pub secret_key: String,
    pub public_key: String,
    pub address: Address,
}

/// Response payload for `GET /devnet/accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    pub balance: Amount,
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable kind, e.g. `too_early`.
    pub code: String,
    pub error: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Handler error. Renders as an [`ErrorResponse`].
#[derive(Debug)]
pub enum ApiError {
    /// The request body was well-formed JSON but carried an unusable value.
    BadRequest(String),
    Vault(VaultError),
}

impl From<VaultError> for ApiError {
    fn from(e: VaultError) -> Self {
        ApiError::Vault(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Vault(e) => match e {
                VaultError::Validation(_) => StatusCode::BAD_REQUEST,
                VaultError::VaultNotFound(_) | VaultError::BeneficiaryNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                VaultError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                VaultError::AlreadyClaimed(_)
                | VaultError::DelegationDisabled(_)
                | VaultError::TooEarly { .. }
                | VaultError::NoActiveDelegations(_)
                | VaultError::Storage(StoreError::VersionConflict { .. }) => StatusCode::CONFLICT,
                VaultError::Deployment(_)
                | VaultError::Funding { .. }
                | VaultError::Signing { .. }
                | VaultError::Redemption(_)
                | VaultError::Chain(_) => StatusCode::BAD_GATEWAY,
                VaultError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Vault(e) => match e {
                VaultError::Validation(_) => "validation",
                VaultError::Deployment(_) => "deployment_failed",
                VaultError::Funding { .. } => "funding_failed",
                VaultError::Signing { .. } => "signing_failed",
                VaultError::VaultNotFound(_) => "vault_not_found",
                VaultError::BeneficiaryNotFound { .. } => "beneficiary_not_found",
                VaultError::AlreadyClaimed(_) => "already_claimed",
                VaultError::DelegationDisabled(_) => "delegation_disabled",
                VaultError::TooEarly { .. } => "too_early",
                VaultError::NoActiveDelegations(_) => "no_active_delegations",
                VaultError::Unauthorized { .. } => "unauthorized",
                VaultError::Redemption(_) => "redemption_failed",
                VaultError::Chain(_) => "chain_unavailable",
                VaultError::Storage(StoreError::VersionConflict { .. }) => "version_conflict",
                VaultError::Storage(_) => "storage",
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Vault(e) => e.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(%status, "{}", error);
        } else {
            tracing::debug!(%status, "{}", error);
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            error,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn parse_key(field: &str, hex_str: &str) -> ApiResult<AccountKey> {
    AccountKey::from_hex(hex_str).map_err(|e| ApiError::BadRequest(format!("{field}: {e}")))
}

fn parse_address(raw: &str) -> ApiResult<Address> {
    validate_address(raw).map_err(|e| ApiError::Vault(e.into()))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "version": state.version }))
}

/// `GET /vaults`
async fn list_vaults_handler(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let vaults = state.engine.list_vaults()?;
    Ok(Json(VaultListResponse { vaults }))
}

/// `POST /vaults`: deploys the owner's smart account and persists a vault
/// with no beneficiaries.
///
/// A failed initial funding still leaves the vault in place; the error body
/// then names it and the caller retries with `/fund`.
async fn create_vault_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateVaultRequest>,
) -> ApiResult<impl IntoResponse> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    let owner = parse_key("owner_key", &req.owner_key)?;
    let result = state
        .engine
        .create_vault(&owner, req.period, req.initial_funding)
        .await;
    // The vault exists even when its funding transfer did not land.
    if result.is_ok() || matches!(result, Err(VaultError::Funding { .. })) {
        state.metrics.vaults_created_total.inc();
    }
    Ok((StatusCode::CREATED, Json(result?)))
}

/// `GET /vaults/:vault`
async fn vault_status_handler(
    Path(vault): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let vault = parse_address(&vault)?;
    Ok(Json(state.engine.get_status(&vault).await?))
}

/// `GET /vaults/:vault/dashboard`
async fn dashboard_handler(
    Path(vault): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let vault = parse_address(&vault)?;
    let status = state.engine.get_status(&vault).await?;
    Ok(Json(status.owner_dashboard()))
}

/// `DELETE /vaults/:vault`: forgets the record. Funds and delegations on
/// the chain are left alone.
async fn delete_vault_handler(
    Path(vault): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<OwnerRequest>,
) -> ApiResult<impl IntoResponse> {
    let vault = parse_address(&vault)?;
    let owner = parse_key("owner_key", &req.owner_key)?;
    let record = state.engine.record(&vault)?;
    if record.config.owner != owner.address() {
        return Err(VaultError::Unauthorized {
            vault,
            presented: owner.address(),
        }
        .into());
    }
    state.engine.delete_vault(&vault)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /vaults/:vault/fund`
async fn fund_vault_handler(
    Path(vault): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<FundRequest>,
) -> ApiResult<impl IntoResponse> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    let vault = parse_address(&vault)?;
    let funder = parse_key("funder_key", &req.funder_key)?;
    Ok(Json(state.engine.fund_vault(&vault, &funder, req.amount).await?))
}

/// `POST /vaults/:vault/setup`
async fn setup_handler(
    Path(vault): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<SetupRequest>,
) -> ApiResult<impl IntoResponse> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    let vault = parse_address(&vault)?;
    let owner = parse_key("owner_key", &req.owner_key)?;
    let outcome = state
        .engine
        .setup_beneficiaries(&vault, &owner, req.beneficiaries, req.deadline)
        .await?;
    state
        .metrics
        .disable_failures_total
        .inc_by(outcome.pending_disables.len() as u64);
    Ok(Json(outcome))
}

/// `POST /vaults/:vault/beneficiaries`
async fn add_beneficiary_handler(
    Path(vault): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<AddBeneficiaryRequest>,
) -> ApiResult<impl IntoResponse> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    let vault = parse_address(&vault)?;
    let owner = parse_key("owner_key", &req.owner_key)?;
    let outcome = state
        .engine
        .add_beneficiary(&vault, &owner, req.beneficiary)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `DELETE /vaults/:vault/beneficiaries/:beneficiary`
async fn remove_beneficiary_handler(
    Path((vault, beneficiary)): Path<(String, String)>,
    State(state): State<AppState>,
    Json(req): Json<OwnerRequest>,
) -> ApiResult<impl IntoResponse> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    let vault = parse_address(&vault)?;
    let beneficiary = parse_address(&beneficiary)?;
    let owner = parse_key("owner_key", &req.owner_key)?;
    let outcome = state
        .engine
        .remove_beneficiary(&vault, &owner, &beneficiary)
        .await?;
    Ok(Json(outcome))
}

/// `GET /vaults/:vault/beneficiaries/:beneficiary`: what the named address
/// stands to inherit. Strangers get `eligible: false`, not a 404.
async fn beneficiary_view_handler(
    Path((vault, beneficiary)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let vault = parse_address(&vault)?;
    let beneficiary = parse_address(&beneficiary)?;
    let status = state.engine.get_status(&vault).await?;
    Ok(Json(status.beneficiary_view(&beneficiary)))
}

/// `POST /vaults/:vault/checkin`
async fn check_in_handler(
    Path(vault): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<CheckInRequest>,
) -> ApiResult<impl IntoResponse> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    let vault = parse_address(&vault)?;
    let owner = parse_key("owner_key", &req.owner_key)?;
    let outcome = state.engine.check_in(&vault, &owner, req.period).await?;
    state.metrics.check_ins_total.inc();
    state
        .metrics
        .disable_failures_total
        .inc_by(outcome.pending_disables.len() as u64);
    Ok(Json(outcome))
}

/// `POST /vaults/:vault/claim`
async fn claim_handler(
    Path(vault): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> ApiResult<impl IntoResponse> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    let vault = parse_address(&vault)?;
    let beneficiary = parse_key("beneficiary_key", &req.beneficiary_key)?;
    match state.engine.claim(&vault, &beneficiary).await {
        Ok(outcome) => {
            state.metrics.claims_total.inc();
            Ok(Json(outcome))
        }
        Err(e) => {
            state.metrics.claim_rejections_total.inc();
            Err(e.into())
        }
    }
}

/// `POST /devnet/keygen`
async fn keygen_handler() -> impl IntoResponse {
    let key = AccountKey::generate();
    Json(KeygenResponse {
        secret_key: key.to_hex(),
        public_key: key.public_key().to_hex(),
        address: key.address(),
    })
}

/// `POST /devnet/faucet`
async fn faucet_handler(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> ApiResult<impl IntoResponse> {
    let to = parse_address(&req.address)?;
    let receipt = state
        .chain
        .faucet(&to, req.amount)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(receipt))
}

/// `GET /devnet/accounts/:address`
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let address = parse_address(&address)?;
    let balance = state.chain.balance(&address, &Asset::Native);
    Ok(Json(AccountResponse { address, balance }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use lastwill_contracts::ChainConfig;
    use lastwill_protocol::config::EngineConfig;
    use lastwill_protocol::storage::{MemoryStore, VaultStore};
    use lastwill_protocol::time::ManualClock;
    use lastwill_protocol::vault::{OwnerDashboard, VaultState, VaultStatus};
    use lastwill_protocol::TxReceipt;
    use serde_json::json;
    use tower::ServiceExt;

    const START: i64 = 1_700_000_000;

    struct TestNode {
        router: Router,
        state: AppState,
        clock: Arc<ManualClock>,
    }

    /// Free devnet, in-memory store, clock frozen at `START`.
    fn test_node() -> TestNode {
        test_node_with_store(Arc::new(MemoryStore::new()))
    }

    fn test_node_with_store(store: Arc<dyn VaultStore>) -> TestNode {
        let clock = Arc::new(ManualClock::at_timestamp(START));
        let chain = Arc::new(SimulatedChain::new(
            ChainConfig {
                gas_price: 0,
                ..ChainConfig::default()
            },
            clock.clone(),
        ));
        let engine = Arc::new(VaultEngine::new(
            chain.clone(),
            store,
            clock.clone(),
            EngineConfig::default(),
        ));
        let state = AppState {
            version: "0.1.0-test".into(),
            engine,
            chain,
            metrics: Arc::new(crate::metrics::NodeMetrics::new().unwrap()),
        };
        TestNode {
            router: create_router(state.clone()),
            state,
            clock,
        }
    }

    fn key(seed: u8) -> AccountKey {
        AccountKey::from_seed(&[seed; 32])
    }

    fn five_minutes() -> serde_json::Value {
        json!({ "count": 5, "unit": "minutes" })
    }

    /// Sends a request and returns the (status, body_bytes).
    async fn send(
        router: &Router,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(path);
        let req = match body {
            Some(b) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&b).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        send(router, "GET", path, None).await
    }

    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        send(router, "POST", path, Some(body)).await
    }

    fn error_code(body: &[u8]) -> String {
        let err: ErrorResponse = serde_json::from_slice(body).unwrap();
        err.code
    }

    /// Owner seed 1 funds a vault with 1000 wei and returns its address.
    async fn funded_vault(node: &TestNode) -> Address {
        node.state
            .chain
            .faucet(&key(1).address(), Amount::new(5_000))
            .unwrap();
        let (status, body) = post_json(
            &node.router,
            "/vaults",
            json!({
                "owner_key": key(1).to_hex(),
                "period": five_minutes(),
                "initial_funding": "1000",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: serde_json::Value = serde_json::from_slice(&body).unwrap();
        serde_json::from_value(created["address"].clone()).unwrap()
    }

    /// Seeds 2 and 3 inherit 600 and 400.
    async fn configured_vault(node: &TestNode) -> Address {
        let vault = funded_vault(node).await;
        let (status, _) = post_json(
            &node.router,
            &format!("/vaults/{vault}/setup"),
            json!({
                "owner_key": key(1).to_hex(),
                "beneficiaries": [
                    { "address": key(2).address(), "name": "Alice",
                      "allocation": { "asset": "native", "amount": "600" } },
                    { "address": key(3).address(), "name": "Bob",
                      "allocation": { "asset": "native", "amount": "400" } },
                ],
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        vault
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let node = test_node();
        let (status, body) = get(&node.router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "0.1.0-test");
    }

    #[tokio::test]
    async fn created_vault_is_listed_and_funded() {
        let node = test_node();
        let vault = funded_vault(&node).await;

        let (status, body) = get(&node.router, "/vaults").await;
        assert_eq!(status, StatusCode::OK);
        let list: VaultListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.vaults, vec![vault.clone()]);

        let (_, body) = get(&node.router, &format!("/vaults/{vault}")).await;
        let state: VaultState = serde_json::from_slice(&body).unwrap();
        assert_eq!(state.status, VaultStatus::Created);
        assert_eq!(state.total_value, Amount::new(1_000));
        assert_eq!(state.owner, key(1).address());
        assert_eq!(node.state.metrics.vaults_created_total.get(), 1);
    }

    #[tokio::test]
    async fn setup_activates_the_vault() {
        let node = test_node();
        let vault = configured_vault(&node).await;

        let (status, body) = get(&node.router, &format!("/vaults/{vault}/dashboard")).await;
        assert_eq!(status, StatusCode::OK);
        let dash: OwnerDashboard = serde_json::from_slice(&body).unwrap();
        assert_eq!(dash.status, VaultStatus::Active);
        assert_eq!(dash.beneficiary_count, 2);
        assert_eq!(dash.allocated, Amount::new(1_000));
        assert_eq!(dash.unallocated, Amount::ZERO);
    }

    #[tokio::test]
    async fn over_allocation_is_a_bad_request() {
        let node = test_node();
        let vault = funded_vault(&node).await;
        let (status, body) = post_json(
            &node.router,
            &format!("/vaults/{vault}/setup"),
            json!({
                "owner_key": key(1).to_hex(),
                "beneficiaries": [
                    { "address": key(2).address(), "name": "Alice",
                      "allocation": { "asset": "native", "amount": "1001" } },
                ],
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "validation");
    }

    #[tokio::test]
    async fn claim_waits_for_the_deadline() {
        let node = test_node();
        let vault = configured_vault(&node).await;
        let claim = json!({ "beneficiary_key": key(2).to_hex() });

        let (status, body) =
            post_json(&node.router, &format!("/vaults/{vault}/claim"), claim.clone()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_code(&body), "too_early");

        node.clock.advance_secs(301);
        let (status, _) =
            post_json(&node.router, &format!("/vaults/{vault}/claim"), claim.clone()).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = get(
            &node.router,
            &format!("/devnet/accounts/{}", key(2).address()),
        )
        .await;
        let account: AccountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(account.balance, Amount::new(600));

        let (status, body) =
            post_json(&node.router, &format!("/vaults/{vault}/claim"), claim).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_code(&body), "already_claimed");

        assert_eq!(node.state.metrics.claims_total.get(), 1);
        assert_eq!(node.state.metrics.claim_rejections_total.get(), 2);
    }

    #[tokio::test]
    async fn check_in_pushes_the_deadline_out() {
        let node = test_node();
        let vault = configured_vault(&node).await;

        node.clock.advance_secs(200);
        let (status, _) = post_json(
            &node.router,
            &format!("/vaults/{vault}/checkin"),
            json!({ "owner_key": key(1).to_hex() }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(node.state.metrics.check_ins_total.get(), 1);

        // Past the original deadline, inside the new one.
        node.clock.advance_secs(150);
        let (status, body) = post_json(
            &node.router,
            &format!("/vaults/{vault}/claim"),
            json!({ "beneficiary_key": key(3).to_hex() }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error_code(&body), "too_early");
    }

    #[tokio::test]
    async fn strangers_cannot_act_for_the_owner() {
        let node = test_node();
        let vault = configured_vault(&node).await;

        let (status, body) = post_json(
            &node.router,
            &format!("/vaults/{vault}/checkin"),
            json!({ "owner_key": key(9).to_hex() }),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error_code(&body), "unauthorized");

        let (status, _) = send(
            &node.router,
            "DELETE",
            &format!("/vaults/{vault}"),
            Some(json!({ "owner_key": key(9).to_hex() })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn beneficiary_view_for_member_and_stranger() {
        let node = test_node();
        let vault = configured_vault(&node).await;

        let (status, body) = get(
            &node.router,
            &format!("/vaults/{vault}/beneficiaries/{}", key(2).address()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(view["eligible"], true);
        assert_eq!(view["name"], "Alice");
        assert_eq!(view["claimable_now"], false);

        let (_, body) = get(
            &node.router,
            &format!("/vaults/{vault}/beneficiaries/{}", key(7).address()),
        )
        .await;
        let view: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(view["eligible"], false);
    }

    #[tokio::test]
    async fn add_then_remove_a_beneficiary() {
        let node = test_node();
        let vault = funded_vault(&node).await;
        let (status, _) = post_json(
            &node.router,
            &format!("/vaults/{vault}/beneficiaries"),
            json!({
                "owner_key": key(1).to_hex(),
                "beneficiary": { "address": key(4).address(), "name": "Carol",
                                 "allocation": { "asset": "native", "amount": "250" } },
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &node.router,
            "DELETE",
            &format!("/vaults/{vault}/beneficiaries/{}", key(4).address()),
            Some(json!({ "owner_key": key(1).to_hex() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = get(&node.router, &format!("/vaults/{vault}")).await;
        let state: VaultState = serde_json::from_slice(&body).unwrap();
        assert!(state.beneficiaries.is_empty());
    }

    #[tokio::test]
    async fn unknown_vault_is_404_and_bad_address_is_400() {
        let node = test_node();
        let missing = Address::derive(b"nowhere");

        let (status, body) = get(&node.router, &format!("/vaults/{missing}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error_code(&body), "vault_not_found");

        let (status, _) = get(&node.router, "/vaults/not-an-address").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_key_is_rejected() {
        let node = test_node();
        let (status, body) = post_json(
            &node.router,
            "/vaults",
            json!({ "owner_key": "zz", "period": five_minutes() }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "bad_request");
    }

    #[tokio::test]
    async fn short_period_is_rejected() {
        let node = test_node();
        let (status, body) = post_json(
            &node.router,
            "/vaults",
            json!({
                "owner_key": key(1).to_hex(),
                "period": { "count": 4, "unit": "minutes" },
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&body), "validation");
        assert!(node.state.engine.list_vaults().unwrap().is_empty());
    }

    #[tokio::test]
    async fn keygen_and_faucet() {
        let node = test_node();
        let (status, body) = post_json(&node.router, "/devnet/keygen", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let generated: KeygenResponse = serde_json::from_slice(&body).unwrap();
        let restored = AccountKey::from_hex(&generated.secret_key).unwrap();
        assert_eq!(restored.address(), generated.address);

        let (status, body) = post_json(
            &node.router,
            "/devnet/faucet",
            json!({ "address": generated.address, "amount": "77" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let _: TxReceipt = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            node.state.chain.balance(&generated.address, &Asset::Native),
            Amount::new(77)
        );
    }

    #[tokio::test]
    async fn owner_can_delete_the_record() {
        let node = test_node();
        let vault = funded_vault(&node).await;

        let (status, _) = send(
            &node.router,
            "DELETE",
            &format!("/vaults/{vault}"),
            Some(json!({ "owner_key": key(1).to_hex() })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = get(&node.router, &format!("/vaults/{vault}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        // The money stays on the chain.
        assert_eq!(
            node.state.chain.balance(&vault, &Asset::Native),
            Amount::new(1_000)
        );
    }

    #[tokio::test]
    async fn file_backed_records_outlive_the_router() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn VaultStore> =
            Arc::new(lastwill_protocol::storage::FileStore::open(dir.path()).unwrap());
        let node = test_node_with_store(store);
        let vault = funded_vault(&node).await;
        drop(node);

        let reopened = test_node_with_store(Arc::new(
            lastwill_protocol::storage::FileStore::open(dir.path()).unwrap(),
        ));
        let (status, body) = get(&reopened.router, "/vaults").await;
        assert_eq!(status, StatusCode::OK);
        let list: VaultListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.vaults, vec![vault]);
    }
}
