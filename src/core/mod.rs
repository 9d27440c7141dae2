pub mod ctc;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod router;
