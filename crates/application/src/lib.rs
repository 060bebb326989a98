//! Application layer - Bridge workflows over the domain ports

pub mod messaging;
pub mod scanner;
pub mod sync_loop;

pub use messaging::{CommandRouter, DiscoveryPublisher, Outcome};
pub use scanner::{InputScanner, ScanReport};
pub use sync_loop::{LoopStats, SyncLoop, SyncLoopConfig};
