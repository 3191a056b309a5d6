use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::bid::{Bid, BidDraft};
use crate::money::Money;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("a request must carry at least one bid")]
    EmptyBidSet,
    #[error("invalid bid at position {index}: {reason}")]
    InvalidBid { index: usize, reason: String },
}

/// The bid set of one approval request, immutable after creation.
///
/// Holds bids in submission order and answers the comparison questions the
/// review screen and notifications need: which bid is cheapest, and how far
/// above it every other bid sits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BidLedger {
    bids: Vec<Bid>,
}

impl BidLedger {
    pub fn new(bids: Vec<Bid>) -> Result<Self, LedgerError> {
        if bids.is_empty() {
            return Err(LedgerError::EmptyBidSet);
        }

        for (index, bid) in bids.iter().enumerate() {
            if bid.contractor.trim().is_empty() {
                return Err(LedgerError::InvalidBid {
                    index,
                    reason: "contractor name must not be empty".to_string(),
                });
            }
            if bid.quote.is_negative() {
                return Err(LedgerError::InvalidBid {
                    index,
                    reason: "quote must not be negative".to_string(),
                });
            }
        }

        Ok(Self { bids })
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    /// The minimum-quote bid. Ties break to the earliest-submitted bid: a
    /// stable reduce over submission order, not a re-sort, so repeated calls
    /// resolve equal lowest quotes to the same bid.
    pub fn cheapest(&self) -> &Bid {
        self.bids
            .iter()
            .reduce(|min, bid| if bid.quote < min.quote { bid } else { min })
            .expect("ledger construction rejects empty bid sets")
    }

    /// `bid.quote - cheapest().quote`; zero for the cheapest bid itself.
    pub fn delta_for(&self, bid: &Bid) -> Money {
        bid.quote - self.cheapest().quote
    }

    /// Percentage above the cheapest quote. Defined as exactly zero, not
    /// infinite or NaN, when the cheapest quote is zero.
    pub fn percent_for(&self, bid: &Bid) -> Decimal {
        let cheapest = self.cheapest();
        if !cheapest.quote.is_positive() {
            return Decimal::ZERO;
        }
        match self.delta_for(bid).checked_div(cheapest.quote) {
            Some(ratio) => ratio * Decimal::ONE_HUNDRED,
            None => Decimal::ZERO,
        }
    }

    /// Reconciles the submitter's recommended pick against persisted bids.
    ///
    /// The creation command carries client-generated transient refs the store
    /// never sees, so after persistence assigns durable ids the recommended
    /// draft is re-matched on `(contractor, quote)` equality, first match
    /// wins. No match means the recommendation stays unset; that is not an
    /// error.
    pub fn resolve_recommended<'a>(
        &'a self,
        recommended_ref: &str,
        drafts: &[BidDraft],
    ) -> Option<&'a Bid> {
        let draft = drafts.iter().find(|draft| draft.client_ref == recommended_ref)?;
        self.bids
            .iter()
            .find(|bid| bid.contractor == draft.contractor && bid.quote == draft.quote)
    }
}
