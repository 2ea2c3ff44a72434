use std::collections::BTreeSet;

use crate::{
    locale::Locale,
    spec::field::{FieldDescriptor, FieldType},
};

/// Who is looking at the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Disabled fields are hidden.
    #[default]
    Patient,
    /// Disabled fields stay visible so they can be configured.
    Admin,
}

impl RenderMode {
    pub fn includes(&self, field: &FieldDescriptor) -> bool {
        match self {
            RenderMode::Patient => field.enabled,
            RenderMode::Admin => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionItem<'a> {
    Input(&'a FieldDescriptor),
    Heading(&'a FieldDescriptor),
    Checkmenu {
        field: &'a FieldDescriptor,
        children: Vec<&'a FieldDescriptor>,
    },
}

impl<'a> SectionItem<'a> {
    pub fn field(&self) -> &'a FieldDescriptor {
        match self {
            SectionItem::Input(field) | SectionItem::Heading(field) => *field,
            SectionItem::Checkmenu { field, .. } => *field,
        }
    }
}

/// One collapsible block of fields sharing a group label.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    /// `None` for fields without a group.
    pub label: Option<String>,
    pub items: Vec<SectionItem<'a>>,
}

/// Splits fields into sections by their group label in `locale`, ordered by
/// first occurrence. Fields claimed by a checkmenu are nested under it.
pub fn group_fields<'a>(
    fields: &'a [FieldDescriptor],
    locale: Locale,
    mode: RenderMode,
) -> Vec<Section<'a>> {
    let menus = fields
        .iter()
        .filter(|field| mode.includes(field) && field.is_kind(&FieldType::Checkmenu))
        .map(|field| field.name.as_str())
        .collect::<BTreeSet<_>>();

    let mut sections: Vec<Section<'a>> = Vec::new();
    for field in fields.iter().filter(|field| mode.includes(field)) {
        if field
            .parent
            .as_deref()
            .is_some_and(|parent| menus.contains(parent))
        {
            continue;
        }

        let item = match field.kind {
            Some(FieldType::Placeholder) => SectionItem::Heading(field),
            Some(FieldType::Checkmenu) => SectionItem::Checkmenu {
                field,
                children: children_of(fields, &field.name, mode),
            },
            _ => SectionItem::Input(field),
        };

        let label = field.group().text(locale).map(String::from);
        match sections.iter_mut().find(|section| section.label == label) {
            Some(section) => section.items.push(item),
            None => sections.push(Section {
                label,
                items: vec![item],
            }),
        }
    }
    sections
}

/// Fields whose `parent` is `parent`, in declaration order.
pub fn children_of<'a>(
    fields: &'a [FieldDescriptor],
    parent: &str,
    mode: RenderMode,
) -> Vec<&'a FieldDescriptor> {
    fields
        .iter()
        .filter(|field| mode.includes(field) && field.parent.as_deref() == Some(parent))
        .collect()
}
