pub mod criteria;
pub mod envelope;
pub mod error;
