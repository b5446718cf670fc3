/// Counts shown at the end of a discovery batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub with_documents: usize,
    pub without_documents: usize,
    pub errors: usize,
    pub session_recycles: u32,
}
