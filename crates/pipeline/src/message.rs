//! Reference-counted messages and the error cause flowing between handlers.

use buffer::ByteBuf;

/// Error cause routed through `exception_caught` rather than returned to the
/// original caller.
pub type Cause = Box<dyn std::error::Error + Send + Sync>;

/// Explicit lifetime tracking shared by every message type a pipeline moves.
///
/// A message emitted downstream carries exactly one owning reference, which
/// transfers with the value. Handlers that hold a message beyond the current
/// event retain it; handlers that drop a message they consumed release it.
pub trait ReferenceCounted {
    /// Adds one reference.
    fn retain(&self) -> Result<(), Cause>;

    /// Removes one reference. Returns `true` when this call deallocated the
    /// underlying resource.
    fn release(&self) -> Result<bool, Cause>;

    /// Current reference count. Messages without a counted payload report 1.
    fn ref_count(&self) -> usize;
}

impl ReferenceCounted for ByteBuf {
    fn retain(&self) -> Result<(), Cause> {
        Self::retain(self).map_err(Cause::from)
    }

    fn release(&self) -> Result<bool, Cause> {
        Self::release(self).map_err(Cause::from)
    }

    fn ref_count(&self) -> usize {
        Self::ref_count(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffer::copied_buffer;

    #[test]
    fn byte_buf_counts_through_the_trait() {
        let buf = copied_buffer(b"msg");
        ReferenceCounted::retain(&buf).expect("retain");
        assert_eq!(ReferenceCounted::ref_count(&buf), 2);
        assert!(!ReferenceCounted::release(&buf).expect("release"));
        assert!(ReferenceCounted::release(&buf).expect("final release"));
    }
}
