pub mod access;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod money;
pub mod notify;
pub mod store;
pub mod workflow;

pub use access::{permits, Identity, Role};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::approval::{
    ActionId, ActionType, ApprovalAction, ApprovalRequest, ApprovalRequestId, ApprovalStatus,
};
pub use domain::bid::{Bid, BidDraft, BidId};
pub use errors::{FieldViolation, WorkflowError};
pub use ledger::{BidLedger, LedgerError};
pub use money::{Money, MoneyError};
pub use notify::{LoggingNotifier, NotificationDispatch, Notifier, NotifyError};
pub use store::{ApprovalStore, NewAction, NewBid, NewRequest, StoreError};
pub use workflow::{BidSubmission, SubmitCommand, WorkflowEngine};
