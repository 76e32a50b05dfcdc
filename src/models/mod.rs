mod value;
mod record;
mod display_record;

pub use value::FieldValue;
pub use record::Record;
pub use display_record::DisplayRecord;
