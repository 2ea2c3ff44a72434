#![allow(missing_docs)]

pub mod compile;
pub mod evaluate;
pub mod group;
pub mod locale;
pub mod render;
pub mod rules;
pub mod source;
pub mod spec;
pub mod template;
pub mod values;
pub mod values_schema;

pub use compile::{compile, compile_from_str};
pub use evaluate::{FieldOutcome, FieldReport, ValidationResult};
pub use group::{RenderMode, Section, SectionItem, children_of, group_fields};
pub use locale::{Locale, LocalePair};
pub use render::{
    RenderField, RenderPayload, RenderSection, RenderStatus, build_render_payload, render_json_ui,
    render_text,
};
pub use rules::{BaseRule, FieldRule, Pattern, Ruleset};
pub use source::{
    DescriptorSource, FileSource, SourceError, StaticSource, load_descriptors, records_from_value,
};
pub use spec::{CompiledForm, FieldDescriptor, FieldType};
pub use template::DefaultMessages;
pub use values::{FormSession, FormValues};
pub use values_schema::{descriptor_schema, generate as values_schema};
