pub mod ical;

use crate::model::issue::Issue;

/// Renders the aggregated issues into an output document.
///
/// Implementations must be pure: the same issues always produce the same
/// bytes.
pub trait IssueSink {
    fn generate(&self, issues: &[Issue]) -> Vec<u8>;
}
