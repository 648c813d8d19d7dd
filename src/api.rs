//! HTTP routing layer for stridechain.
//!
//! A thin axum surface over the orchestrator: every handler delegates to
//! `Node` and maps admission errors to client-facing rejections. The
//! consensus engine itself never depends on this module.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::blockchain::Block;
use crate::error::Result;
use crate::node::Node;
use crate::transaction::{Transaction, TxKind};

pub fn build_router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/blockchain", get(get_blockchain))
        .route("/blocks", get(get_blocks).post(submit_block))
        .route("/blocks/latest", get(get_latest_block))
        .route("/blocks/:index", get(get_block_by_index))
        .route("/transactions", post(submit_transaction))
        .route("/balance/:address", get(get_balance))
        .route("/peers", get(get_peers).post(add_peer).delete(remove_peer))
        .route("/sync", get(synchronize))
        .route("/mining", get(mining_status))
        .route("/mining/start", post(start_mining))
        .route("/mining/stop", post(stop_mining))
        .with_state(node)
}

/// Binds the API server and serves requests until shutdown.
pub async fn serve(node: Arc<Node>, port: u16) -> Result<()> {
    let router = build_router(node);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "API server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

fn bad_request(message: impl std::fmt::Display) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.to_string() })),
    )
        .into_response()
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_blockchain(State(node): State<Arc<Node>>) -> Response {
    let chain = node.blockchain.read().await;
    Json(&*chain).into_response()
}

async fn get_blocks(State(node): State<Arc<Node>>) -> Response {
    let chain = node.blockchain.read().await;
    Json(json!({ "chain": &chain.chain })).into_response()
}

async fn get_latest_block(State(node): State<Arc<Node>>) -> Response {
    let chain = node.blockchain.read().await;
    Json(json!({ "block": chain.latest_block() })).into_response()
}

async fn get_block_by_index(
    State(node): State<Arc<Node>>,
    Path(index): Path<u64>,
) -> Response {
    let chain = node.blockchain.read().await;
    match chain.chain.get(index as usize) {
        Some(block) => Json(json!({ "block": block })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "block not found" })),
        )
            .into_response(),
    }
}

/// Admits a block submitted by a peer. A resubmission of the current
/// head and a failed proof-of-work are rejected before the admission
/// path is ever invoked.
async fn submit_block(State(node): State<Arc<Node>>, Json(block): Json<Block>) -> Response {
    {
        let chain = node.blockchain.read().await;
        if block.hash == chain.latest_block().hash {
            return bad_request("block already accepted");
        }
        if !block.is_valid_proof_of_work(chain.difficulty) {
            return bad_request("invalid proof of work");
        }
    }

    match node.add_block(block).await {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({ "message": "block added to the blockchain" })),
        )
            .into_response(),
        Err(e) => bad_request(e),
    }
}

#[derive(Deserialize)]
struct TransactionSubmission {
    #[serde(flatten)]
    tx: Transaction,
    /// Set by peers relaying a transaction, to suppress re-broadcast.
    #[serde(default, rename = "isBroadcast")]
    is_broadcast: bool,
}

async fn submit_transaction(
    State(node): State<Arc<Node>>,
    Json(submission): Json<TransactionSubmission>,
) -> Response {
    let tx = submission.tx;

    if tx.kind == TxKind::Reward {
        return bad_request("reward transactions cannot be submitted");
    }
    if tx.from_address.is_none() {
        return bad_request("transaction has no origin address");
    }
    if let Err(e) = tx.is_valid() {
        return bad_request(e);
    }

    match node.add_transaction(tx.clone(), !submission.is_broadcast).await {
        Ok(()) => Json(json!({
            "message": "transaction added to the pool",
            "transaction": tx,
        }))
        .into_response(),
        Err(e) => bad_request(e),
    }
}

async fn get_balance(State(node): State<Arc<Node>>, Path(address): Path<String>) -> Response {
    let chain = node.blockchain.read().await;
    Json(json!({ "balance": chain.validated_balance(&address) })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeerRequest {
    peer_url: String,
}

async fn get_peers(State(node): State<Arc<Node>>) -> Response {
    Json(json!({ "peers": node.peers.all() })).into_response()
}

async fn add_peer(
    State(node): State<Arc<Node>>,
    Json(request): Json<PeerRequest>,
) -> Response {
    if node.peers.add(&request.peer_url) {
        Json(json!({ "message": "peer added", "peers": node.peers.all() })).into_response()
    } else {
        bad_request("peer already exists")
    }
}

async fn remove_peer(
    State(node): State<Arc<Node>>,
    Json(request): Json<PeerRequest>,
) -> Response {
    if node.peers.remove(&request.peer_url) {
        Json(json!({ "message": "peer removed", "peers": node.peers.all() })).into_response()
    } else {
        bad_request("peer not found")
    }
}

async fn synchronize(State(node): State<Arc<Node>>) -> Response {
    if node.synchronize_with_peers().await {
        Json(json!({ "message": "longer chain found, local blockchain updated" }))
            .into_response()
    } else {
        StatusCode::NOT_MODIFIED.into_response()
    }
}

async fn mining_status(State(node): State<Arc<Node>>) -> Response {
    let status = if node.is_mining() { "mining" } else { "idle" };
    Json(json!({ "status": status })).into_response()
}

async fn start_mining(State(node): State<Arc<Node>>) -> Response {
    node.start_mining_loop();
    Json(json!({ "message": "mining loop started" })).into_response()
}

async fn stop_mining(State(node): State<Arc<Node>>) -> Response {
    node.stop_mining_loop();
    Json(json!({ "message": "mining loop stopped" })).into_response()
}
