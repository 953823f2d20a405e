pub mod bootstrap;

pub use crate::domain::model::{BootstrapPlan, ServerLaunch, Step, StepReport, StepStatus};
pub use crate::domain::ports::StepRunner;
pub use crate::utils::error::Result;
