//! Domain models for mail entities

mod label;
mod record;

pub use label::{Label, LabelId};
pub use record::{Record, RecordBuilder, RecordId};
