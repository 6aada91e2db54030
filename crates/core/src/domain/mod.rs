pub mod brief;
pub mod contract;
pub mod horizon;
pub mod recommendation;
pub mod snapshot;

pub use brief::{BriefSource, DailyBrief, DebateMessage};
pub use horizon::Horizon;
pub use recommendation::{
    Action, ActionItem, AgentKind, AgentRecommendation, CouncilOutcome, CouncilPick, Priority,
};
pub use snapshot::StockSnapshot;
