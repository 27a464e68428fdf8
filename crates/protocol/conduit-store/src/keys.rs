//! Store key layout.
//!
//! ```text
//! definition:{name}                                -> ServiceDefinition
//! binding:{name}:{provider}                        -> ServiceBinding
//! pricing:{name}:{provider}                        -> Pricing
//! withdrawAddr:{provider}                          -> Address
//! earnedFees:{provider}                            -> Coins
//! reqctx:{ctx}                                     -> RequestContext
//! reqctxSeq                                        -> u64
//! request:{expirationHeight:020}:{requestID}       -> Request
//! activeRequest:{ctx}:{requestID}                  -> expirationHeight
//! newBatch:{height:020}:{ctx}                      -> ()
//! response:{ctx}:{requestID}                       -> Response
//! requestVolume:{consumer}:{name}:{provider}       -> u64
//! ```
//!
//! Addresses and ids are lowercase hex and heights are zero-padded, so
//! lexical key order equals numeric order. Service names cannot contain
//! `:`, which keeps every prefix unambiguous.

use conduit_crypto::Address;
use conduit_types::{BlockHeight, RequestContextId, RequestId};

fn addr(a: &Address) -> String {
    hex::encode(a.0)
}

pub fn definition(name: &str) -> Vec<u8> {
    format!("definition:{}", name).into_bytes()
}

pub fn binding(name: &str, provider: &Address) -> Vec<u8> {
    format!("binding:{}:{}", name, addr(provider)).into_bytes()
}

/// Every binding of one service.
pub fn bindings_of(name: &str) -> Vec<u8> {
    format!("binding:{}:", name).into_bytes()
}

/// Every binding of every service.
pub fn all_bindings() -> Vec<u8> {
    b"binding:".to_vec()
}

pub fn pricing(name: &str, provider: &Address) -> Vec<u8> {
    format!("pricing:{}:{}", name, addr(provider)).into_bytes()
}

pub fn withdraw_address(provider: &Address) -> Vec<u8> {
    format!("withdrawAddr:{}", addr(provider)).into_bytes()
}

pub fn earned_fees(provider: &Address) -> Vec<u8> {
    format!("earnedFees:{}", addr(provider)).into_bytes()
}

pub fn all_earned_fees() -> Vec<u8> {
    b"earnedFees:".to_vec()
}

pub fn request_context(id: &RequestContextId) -> Vec<u8> {
    format!("reqctx:{}", id.to_hex()).into_bytes()
}

pub fn all_request_contexts() -> Vec<u8> {
    b"reqctx:".to_vec()
}

pub fn request_context_sequence() -> Vec<u8> {
    b"reqctxSeq".to_vec()
}

pub fn request(expiration_height: BlockHeight, id: &RequestId) -> Vec<u8> {
    format!("request:{:020}:{}", expiration_height, id.to_hex()).into_bytes()
}

/// Requests expiring at one height.
pub fn requests_expiring_at(height: BlockHeight) -> Vec<u8> {
    format!("request:{:020}:", height).into_bytes()
}

pub fn all_requests() -> Vec<u8> {
    b"request:".to_vec()
}

pub fn active_request(ctx: &RequestContextId, id: &RequestId) -> Vec<u8> {
    format!("activeRequest:{}:{}", ctx.to_hex(), id.to_hex()).into_bytes()
}

/// Outstanding requests of one context.
pub fn active_requests_of(ctx: &RequestContextId) -> Vec<u8> {
    format!("activeRequest:{}:", ctx.to_hex()).into_bytes()
}

pub fn new_batch(height: BlockHeight, ctx: &RequestContextId) -> Vec<u8> {
    format!("newBatch:{:020}:{}", height, ctx.to_hex()).into_bytes()
}

/// Rounds scheduled to start at one height.
pub fn new_batches_at(height: BlockHeight) -> Vec<u8> {
    format!("newBatch:{:020}:", height).into_bytes()
}

pub fn all_new_batches() -> Vec<u8> {
    b"newBatch:".to_vec()
}

pub fn response(ctx: &RequestContextId, id: &RequestId) -> Vec<u8> {
    format!("response:{}:{}", ctx.to_hex(), id.to_hex()).into_bytes()
}

/// Stored responses of one context's current round.
pub fn responses_of(ctx: &RequestContextId) -> Vec<u8> {
    format!("response:{}:", ctx.to_hex()).into_bytes()
}

pub fn request_volume(consumer: &Address, name: &str, provider: &Address) -> Vec<u8> {
    format!(
        "requestVolume:{}:{}:{}",
        addr(consumer),
        name,
        addr(provider)
    )
    .into_bytes()
}

/// Parse the context id out of a `newBatch:` key.
pub fn context_id_from_new_batch(key: &[u8]) -> Option<RequestContextId> {
    let text = std::str::from_utf8(key).ok()?;
    let hex_id = text.rsplit(':').next()?;
    conduit_crypto::Hash::from_hex(hex_id).ok()
}
