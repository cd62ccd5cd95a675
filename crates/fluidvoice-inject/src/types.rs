use std::time::Instant;

#[derive(Debug, Clone)]
pub struct AppTarget {
    pub pid: u32,
    pub process_name: String,
    pub activation_verified_at: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionOutcome {
    Injected,
    InjectedViaFallback,
}
