pub mod approval;
pub mod memory;

pub use approval::SqlApprovalStore;
pub use memory::InMemoryApprovalStore;
