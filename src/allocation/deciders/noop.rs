use crate::allocation::AllocationDecider;

/// Permits everything and places nothing.
pub struct NoopDecider;

impl AllocationDecider for NoopDecider {
    fn name(&self) -> &'static str {
        "noop"
    }
}
