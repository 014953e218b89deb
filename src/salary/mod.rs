//! Payroll cycle & settlement engine.
//!
//! `window` resolves the next unpaid cycle's boundaries, `breakdown` holds
//! the pure pay/deduction/carry-forward arithmetic, `lock` guards settled
//! history against retroactive edits, and `engine` ties them to the store
//! behind the creation/payment transactions.

pub mod breakdown;
pub mod engine;
pub mod lock;
pub mod window;

pub use breakdown::Breakdown;
pub use engine::{PaidPeriod, PaymentSummary, SettlementEngine};
