pub mod manager;
pub mod models;
pub mod portfolio;

pub use manager::{latest_close, RiskManager};
pub use models::*;
pub use portfolio::{build_decision_context, AgentSignal, PortfolioDecisionContext};
