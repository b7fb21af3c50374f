// ABOUTME: Validated domain types shared by the platform client and deploy phases.
// ABOUTME: App names, blue/green slots, API targets, process topologies and cname sets.

mod app_name;
mod cname_set;
mod target;
mod topology;

pub use app_name::{AppName, AppNameError, Slot};
pub use cname_set::CnameSet;
pub use target::{ApiTarget, ApiTargetError};
pub use topology::ProcessTopology;
