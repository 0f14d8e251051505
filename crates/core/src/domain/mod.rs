pub mod idempotency;
pub mod material;
pub mod party;
pub mod response;
pub mod rfq;
