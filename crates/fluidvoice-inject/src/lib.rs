pub mod clipboard_sandwich;
pub mod focus;
pub mod injector;
pub mod manager;
pub mod synthesized_typing;
pub mod types;

pub use clipboard_sandwich::ClipboardSandwichInjector;
pub use focus::{activate_and_verify, FrontmostChecker, NullTargetLocator, TargetLocator};
pub use injector::TextInjector;
pub use manager::StrategyManager;
pub use synthesized_typing::SynthesizedTypingInjector;
pub use types::{AppTarget, InjectionOutcome};
