//! Screen host access: a validated, wait-with-timeout registry.

pub mod gate;
pub mod registry;

pub use gate::OneShotGate;
pub use registry::{HostRegistry, HostStatus};
