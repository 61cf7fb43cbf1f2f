//! Resume document shape: the typed read contract shared by the live preview
//! and the export renderer, the entry kinds that carry identifiers, and the
//! load-time normalization of stored documents.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::collections::new_entry_id;
use crate::editor::node::Node;
use crate::editor::path::{DocPath, PathStep};

/// Top-level collections whose elements are identified entries.
pub const ENTRY_COLLECTIONS: [&str; 4] = ["experience", "education", "skills", "sections"];

/// A snapshot part that the typed contract cannot read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{path}' does not match the resume shape: {message}")]
pub struct ShapeError {
    pub path: String,
    pub message: String,
}

impl ShapeError {
    fn new(path: impl Into<String>, message: impl ToString) -> Self {
        Self {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeDocument {
    pub personal_info: PersonalInfo,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<SkillEntry>,
    pub sections: Vec<CustomSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    #[serde(deserialize_with = "lenient::text")]
    pub full_name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub email: String,
    #[serde(deserialize_with = "lenient::text")]
    pub phone: String,
    #[serde(deserialize_with = "lenient::text")]
    pub location: String,
    #[serde(deserialize_with = "lenient::text")]
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub portfolio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceEntry {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub company: String,
    #[serde(deserialize_with = "lenient::text")]
    pub position: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub start_date: String,
    #[serde(deserialize_with = "lenient::text")]
    pub end_date: String,
    #[serde(deserialize_with = "lenient::flag")]
    pub current: bool,
    /// Legacy free-text shape, one achievement per line.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub description: Option<String>,
    /// Structured shape. Once present it is the only source of truth.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_lines")]
    pub bullet_points: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub school: String,
    #[serde(deserialize_with = "lenient::text")]
    pub degree: String,
    #[serde(deserialize_with = "lenient::text")]
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub start_date: String,
    #[serde(deserialize_with = "lenient::text")]
    pub end_date: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub gpa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SkillEntry {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    /// Any number the editor stored; templates decide how to draw it.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::level")]
    pub level: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub category: Option<String>,
}

/// A free-form block. Holds either flat `content` or nested `items`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomSection {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SectionItem>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionItem {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_text")]
    pub description: Option<String>,
}

/// Scalar readers that accept whatever `setValue` may have stored in a leaf:
/// null, a string, a number or a boolean. Only containers are rejected.
mod lenient {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::{Number, Value};

    fn scalar_text(value: Value) -> Result<Option<String>, String> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::Number(n) => Ok(Some(n.to_string())),
            other => Err(format!("expected text, found {other}")),
        }
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        scalar_text(Value::deserialize(d)?)
            .map(Option::unwrap_or_default)
            .map_err(D::Error::custom)
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        scalar_text(Value::deserialize(d)?).map_err(D::Error::custom)
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            Value::String(s) => Ok(s.trim().eq_ignore_ascii_case("true")),
            Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
            other => Err(D::Error::custom(format!("expected a flag, found {other}"))),
        }
    }

    /// Unparseable text reads as "no level".
    pub fn level<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Number>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(n)),
            Value::String(s) => Ok(s.trim().parse::<Number>().ok()),
            Value::Bool(_) => Ok(None),
            other => Err(D::Error::custom(format!("expected a level, found {other}"))),
        }
    }

    pub fn opt_lines<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Array(items) => items
                .into_iter()
                .map(|item| scalar_text(item).map(Option::unwrap_or_default))
                .collect::<Result<Vec<_>, _>>()
                .map(Some)
                .map_err(D::Error::custom),
            other => Err(D::Error::custom(format!("expected a list, found {other}"))),
        }
    }
}

impl ResumeDocument {
    /// Reads a snapshot through the typed contract. Each part is read on its
    /// own so a failure names the offending location, e.g. `experience[2]`.
    pub fn from_node(node: &Node) -> Result<Self, ShapeError> {
        let root = node
            .as_object()
            .ok_or_else(|| ShapeError::new("$", "expected an object"))?;
        Ok(ResumeDocument {
            personal_info: read_part(root, "personalInfo")?,
            experience: read_entries(root, "experience")?,
            education: read_entries(root, "education")?,
            skills: read_entries(root, "skills")?,
            sections: read_entries(root, "sections")?,
        })
    }

    /// Every identified entry in document order, sections' items included.
    pub fn entries(&self) -> Vec<EntryRef<'_>> {
        let mut out: Vec<EntryRef<'_>> = Vec::new();
        out.extend(self.experience.iter().map(EntryRef::Experience));
        out.extend(self.education.iter().map(EntryRef::Education));
        out.extend(self.skills.iter().map(EntryRef::Skill));
        for section in &self.sections {
            out.push(EntryRef::Section(section));
            if let Some(items) = &section.items {
                out.extend(items.iter().map(EntryRef::SectionItem));
            }
        }
        out
    }
}

fn read_part<T: DeserializeOwned + Default>(
    root: &BTreeMap<String, Node>,
    name: &str,
) -> Result<T, ShapeError> {
    match root.get(name) {
        None | Some(Node::Null) => Ok(T::default()),
        Some(node) => serde_json::from_value(node.to_value()).map_err(|e| ShapeError::new(name, e)),
    }
}

fn read_entries<T: DeserializeOwned>(
    root: &BTreeMap<String, Node>,
    name: &str,
) -> Result<Vec<T>, ShapeError> {
    match root.get(name) {
        None | Some(Node::Null) => Ok(Vec::new()),
        Some(Node::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item.to_value())
                    .map_err(|e| ShapeError::new(format!("{name}[{i}]"), e))
            })
            .collect(),
        Some(_) => Err(ShapeError::new(name, "expected an array")),
    }
}

/// The kinds of array element that carry a stable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Experience,
    Education,
    Skill,
    Section,
    SectionItem,
}

impl EntryKind {
    /// Which entry kind lives in the array at `path`, if any. Arrays of plain
    /// values such as `bulletPoints` are not entry collections.
    pub fn for_array_path(path: &DocPath) -> Option<Self> {
        match path.steps() {
            [PathStep::Field(name)] => match name.as_str() {
                "experience" => Some(EntryKind::Experience),
                "education" => Some(EntryKind::Education),
                "skills" => Some(EntryKind::Skill),
                "sections" => Some(EntryKind::Section),
                _ => None,
            },
            [PathStep::Field(sections), PathStep::Index(_), PathStep::Field(items)]
                if sections == "sections" && items == "items" =>
            {
                Some(EntryKind::SectionItem)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryRef<'a> {
    Experience(&'a ExperienceEntry),
    Education(&'a EducationEntry),
    Skill(&'a SkillEntry),
    Section(&'a CustomSection),
    SectionItem(&'a SectionItem),
}

impl<'a> EntryRef<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            EntryRef::Experience(e) => &e.id,
            EntryRef::Education(e) => &e.id,
            EntryRef::Skill(e) => &e.id,
            EntryRef::Section(e) => &e.id,
            EntryRef::SectionItem(e) => &e.id,
        }
    }
}

/// Parses the legacy free-text description into achievement lines: one per
/// line, trimmed, with a leading `-` or `•` glyph removed and blank lines
/// dropped.
pub fn legacy_bullet_lines(description: &str) -> Vec<String> {
    description
        .lines()
        .map(str::trim)
        .map(|line| {
            line.strip_prefix('-')
                .or_else(|| line.strip_prefix('•'))
                .map(str::trim_start)
                .unwrap_or(line)
        })
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// The document a brand-new resume starts from.
pub fn blank_document() -> Node {
    let mut root = BTreeMap::new();
    root.insert("personalInfo".to_string(), blank_personal_info());
    for collection in ENTRY_COLLECTIONS {
        root.insert(collection.to_string(), Node::empty_array());
    }
    Node::object(root)
}

fn blank_personal_info() -> Node {
    let fields = ["fullName", "title", "email", "phone", "location", "summary"]
        .into_iter()
        .map(|name| (name.to_string(), Node::string("")))
        .collect();
    Node::object(fields)
}

/// Repairs a stored document so the engine's invariants hold: the root and
/// `personalInfo` are objects, the four entry collections are arrays, and
/// every entry (including section items) carries a string identifier.
///
/// Documents that already satisfy this come back unchanged and fully shared.
pub fn normalize_document(doc: Node) -> Node {
    let mut doc = match doc {
        Node::Object(_) => doc,
        _ => return blank_document(),
    };

    if let Node::Object(root) = &mut doc {
        if !matches!(root.get("personalInfo"), Some(Node::Object(_))) {
            Arc::make_mut(root).insert("personalInfo".to_string(), blank_personal_info());
        }

        for collection in ENTRY_COLLECTIONS {
            match root.get(collection) {
                Some(Node::Array(items)) if !needs_ids(items, collection == "sections") => {}
                Some(Node::Array(_)) => {
                    if let Some(Node::Array(items)) = Arc::make_mut(root).get_mut(collection) {
                        assign_missing_ids(Arc::make_mut(items).as_mut_slice(), collection == "sections");
                    }
                }
                _ => {
                    Arc::make_mut(root).insert(collection.to_string(), Node::empty_array());
                }
            }
        }
    }

    doc
}

fn needs_ids(items: &[Node], nested_items: bool) -> bool {
    items.iter().any(|item| {
        let Node::Object(_) = item else {
            return false;
        };
        let missing = item.entry_id().map_or(true, str::is_empty);
        let nested = nested_items
            && item
                .field("items")
                .and_then(Node::as_array)
                .is_some_and(|children| needs_ids(children, false));
        missing || nested
    })
}

fn assign_missing_ids(items: &mut [Node], nested_items: bool) {
    for item in items.iter_mut() {
        let Node::Object(fields) = item else {
            continue;
        };
        if fields
            .get("id")
            .and_then(Node::as_str)
            .map_or(true, str::is_empty)
        {
            Arc::make_mut(fields).insert("id".to_string(), Node::string(new_entry_id()));
        }
        if nested_items {
            let children_need_ids = fields
                .get("items")
                .and_then(Node::as_array)
                .is_some_and(|children| needs_ids(children, false));
            if children_need_ids {
                if let Some(Node::Array(children)) = Arc::make_mut(fields).get_mut("items") {
                    assign_missing_ids(Arc::make_mut(children).as_mut_slice(), false);
                }
            }
        }
    }
}
