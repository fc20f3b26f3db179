pub mod framework;
pub mod live_vars;
pub mod reaching_defs;

pub use framework::{iterate_to_fixpoint, FunctionBlockInformation};
pub use live_vars::{analyze as analyze_live_vars, LiveFacts, LiveInfo};
pub use reaching_defs::{analyze as analyze_reaching_defs, DefSite, ReachingFacts, ReachingInfo};
