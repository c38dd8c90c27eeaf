//! Verdict derivation from the three business legs of an order.
use crate::db_types::{BusinessStatus, ExceptionStep};

/// The tentative verdict derived from the reported leg statuses, before any amount validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A leg reported failure. Carries the step code of the first failing leg.
    Reject(ExceptionStep),
    /// At least one leg is still processing; the order stays pending.
    Pending,
    /// All legs succeeded. Subject to amount validation before it becomes a real success.
    TentativeSuccess,
}

/// Combines the three leg statuses into a [`Verdict`].
///
/// Failures win over everything and are checked payment first, then split, then notification; the
/// first failing leg determines the step code.
pub fn derive_verdict(pay: BusinessStatus, split: BusinessStatus, notify: BusinessStatus) -> Verdict {
    if pay == BusinessStatus::Failure {
        return Verdict::Reject(ExceptionStep::Payment);
    }
    if split == BusinessStatus::Failure {
        return Verdict::Reject(ExceptionStep::Split);
    }
    if notify == BusinessStatus::Failure {
        return Verdict::Reject(ExceptionStep::Notification);
    }
    let any_processing = pay == BusinessStatus::Processing
        || split == BusinessStatus::Processing
        || notify == BusinessStatus::Processing;
    if any_processing {
        Verdict::Pending
    } else {
        Verdict::TentativeSuccess
    }
}
