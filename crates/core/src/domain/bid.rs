use serde::{Deserialize, Serialize};

use crate::money::Money;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BidId(pub String);

/// One contractor's priced offer against a request. Owned exclusively by its
/// approval request and immutable once created; there is no update operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub contractor: String,
    pub quote: Money,
}

/// A bid as submitted by the client, before the store has assigned a durable
/// id. `client_ref` is a transient identifier used only to reconcile the
/// submitter's recommended pick against persisted bids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidDraft {
    pub client_ref: String,
    pub contractor: String,
    pub quote: Money,
}
