pub mod calculator;
pub mod error;
pub mod hts;
pub mod models;
pub mod rate;
pub mod report;

pub use calculator::calculate;
pub use error::ValidationError;
pub use hts::{HtsHierarchy, HtsNumber};
pub use models::*;
pub use rate::RateContext;
pub use report::{format_money, render_breakdown};
