/// Logger
pub mod logger;
/// Cooperative shutdown signal
pub mod shutdown;
