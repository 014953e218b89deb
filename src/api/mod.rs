pub mod advance;
pub mod attendance;
pub mod expense;
pub mod salary;
pub mod worker;

use crate::salary::SettlementEngine;
use crate::store::mysql::MySqlStore;

/// Concrete engine type the handlers work against.
pub type Engine = SettlementEngine<MySqlStore>;
