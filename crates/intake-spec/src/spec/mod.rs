pub mod field;
pub mod form;

pub use field::{FieldDescriptor, FieldType};
pub use form::CompiledForm;
