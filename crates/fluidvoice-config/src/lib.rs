pub mod jsonc;
pub mod paths;
pub mod watcher;

pub use jsonc::{load, load_or_default, parse};
pub use paths::{config_dir, config_file_path};
pub use watcher::ConfigWatcher;
