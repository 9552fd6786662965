//! Application layer - services that drive the ports.

pub mod relay;
pub mod retry;

pub use relay::RelayService;
pub use retry::RetryPolicy;
