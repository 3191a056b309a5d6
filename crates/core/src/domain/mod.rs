pub mod approval;
pub mod bid;
