pub mod update_rule;
pub mod momentum;
pub mod clipping;
pub mod dropout;

pub use update_rule::{ParamId, ParamKind, UpdateRule};
pub use momentum::{MomentumOptimizer, StepReport};
pub use dropout::Dropout;
