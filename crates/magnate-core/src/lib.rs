//! Pure domain math for the idle-economy core: investment valuation curves,
//! elapsed-income accrual, and purchase planning. No I/O; persistence and
//! scheduling live in the API crate.

pub mod accrual;
pub mod purchase;
pub mod valuation;

pub use accrual::{elapsed_credit, ElapsedCredit};
pub use purchase::{apply_purchase, plan_purchase, PurchaseError, PurchasePlan};
pub use valuation::{income_per_minute, upgrade_cost};
