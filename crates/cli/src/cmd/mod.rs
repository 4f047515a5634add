mod info;
mod install;
mod plan;

pub use info::cmd_info;
pub use install::{InstallArgs, cmd_install};
pub use plan::cmd_plan;
