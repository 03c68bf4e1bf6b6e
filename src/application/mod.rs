pub mod notifier;
pub mod sampler;
pub mod watcher;

pub use notifier::WarningNotifier;
pub use sampler::TargetSampler;
pub use watcher::{ChainWatcher, WatcherConfig, WatchSnapshot};
