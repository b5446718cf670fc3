#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Tear the browser session down and launch a fresh one.
    RecycleSession,
}
