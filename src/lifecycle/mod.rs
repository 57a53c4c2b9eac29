//! Process lifecycle for the daemon

mod shutdown;

pub use shutdown::ShutdownSignal;
