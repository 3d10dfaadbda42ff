//! Balance diagnostics for mapped journal rows.
//!
//! Rows carry either separate debit/credit amounts or a single amount with
//! an optional debit/credit indicator; [`BalanceValidator`] sums them per
//! journal entry and per file and reports residuals above a tolerance.

mod amount;
mod balance;
mod row;

pub use amount::parse_amount;
pub use balance::{BalanceReport, BalanceValidator, DEFAULT_EPSILON, UnbalancedEntry};
pub use row::{ColumnMap, MappedRow, Side};
