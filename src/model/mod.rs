mod aggregate;
mod change;
mod revision;

pub use aggregate::{FileAggregate, RevisionAggregate};
pub use change::{ChangeRecord, Classification};
pub use revision::Revision;
