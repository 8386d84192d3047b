//! Report templates: ordered sections plus style and formatting settings.
//!
//! A [`Template`] is only ever obtained through a validating constructor
//! ([`Template::from_json`], [`Template::from_value`], [`Template::custom`],
//! [`Template::default_report`]), so holders can rely on non-empty sections
//! with unique ids.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ReportError, Result};
use crate::types::{ContentType, OutputFormat};

/// Top-level fields every template document must carry, checked in order.
const REQUIRED_FIELDS: [&str; 4] = ["metadata", "structure", "style", "formatting"];

/// Fields every section object must carry.
const REQUIRED_SECTION_FIELDS: [&str; 3] = ["id", "title", "order"];

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A report template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub metadata: TemplateMetadata,
    pub structure: TemplateStructure,
    pub style: TemplateStyle,
    pub formatting: Formatting,
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<OutputFormat>,
    #[serde(default = "default_citation_style")]
    pub citation_style: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStructure {
    pub sections: Vec<Section>,
}

/// One named unit of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Unique within the template.
    pub id: String,
    pub title: String,
    /// Render position; ascending, need not be contiguous.
    pub order: i64,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStyle {
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_writing_style")]
    pub writing_style: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_formality")]
    pub formality: String,
}

impl Default for TemplateStyle {
    fn default() -> Self {
        Self {
            tone: default_tone(),
            writing_style: default_writing_style(),
            language: default_language(),
            formality: default_formality(),
        }
    }
}

/// Page and typography settings. Sizes are in points, margins in inches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formatting {
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_line_spacing")]
    pub line_spacing: f64,
    #[serde(default)]
    pub margins: Margins,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            line_spacing: default_line_spacing(),
            margins: Margins::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    #[serde(default = "default_margin")]
    pub top: f64,
    #[serde(default = "default_margin")]
    pub bottom: f64,
    #[serde(default = "default_margin")]
    pub left: f64,
    #[serde(default = "default_margin")]
    pub right: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 1.0,
            bottom: 1.0,
            left: 1.0,
            right: 1.0,
        }
    }
}

fn default_output_formats() -> Vec<OutputFormat> {
    OutputFormat::ALL.to_vec()
}
fn default_citation_style() -> String {
    "apa".into()
}
fn default_version() -> String {
    "1.0".into()
}
fn default_tone() -> String {
    "professional".into()
}
fn default_writing_style() -> String {
    "analytical".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_formality() -> String {
    "formal".into()
}
fn default_margin() -> f64 {
    1.0
}

fn default_font_family() -> String {
    "Arial".into()
}
fn default_font_size() -> f64 {
    12.0
}
fn default_line_spacing() -> f64 {
    1.5
}

// ---------------------------------------------------------------------------
// Edit requests
// ---------------------------------------------------------------------------

/// A section to append. Omitted fields get generated defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSection {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl NewSection {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update of one section. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionUpdate {
    pub title: Option<String>,
    pub order: Option<i64>,
    pub required: Option<bool>,
    pub content_type: Option<ContentType>,
    /// `Some(None)` clears the limit.
    pub max_length: Option<Option<u32>>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleUpdate {
    pub tone: Option<String>,
    pub writing_style: Option<String>,
    pub language: Option<String>,
    pub formality: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormattingUpdate {
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub line_spacing: Option<f64>,
    pub margins: Option<Margins>,
}

// ---------------------------------------------------------------------------
// Construction and validation
// ---------------------------------------------------------------------------

impl Template {
    /// Parse and validate a template from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| ReportError::structural(format!("Invalid template JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validate a loosely-shaped JSON value and convert it into a template.
    ///
    /// Checks run in a fixed order and the first violation is reported.
    pub fn from_value(value: Value) -> Result<Self> {
        check_shape(&value)?;

        let template: Template = serde_json::from_value(value)
            .map_err(|e| ReportError::structural(format!("Invalid template: {e}")))?;
        template.validate()?;
        Ok(template)
    }

    /// Check invariants on an already-typed template.
    pub fn validate(&self) -> Result<()> {
        if self.structure.sections.is_empty() {
            return Err(ReportError::structural(
                "Template must have at least one section",
            ));
        }

        let mut seen = HashSet::new();
        for (i, section) in self.structure.sections.iter().enumerate() {
            if section.id.trim().is_empty() {
                return Err(ReportError::structural(format!(
                    "Section {i} has an empty id"
                )));
            }
            if section.title.trim().is_empty() {
                return Err(ReportError::structural(format!(
                    "Section {i} has an empty title"
                )));
            }
            if !seen.insert(section.id.as_str()) {
                return Err(ReportError::structural(format!(
                    "Duplicate section ID: {}",
                    section.id
                )));
            }
        }
        Ok(())
    }

    /// The built-in consulting report layout.
    pub fn default_report() -> Self {
        let section = |id: &str, title: &str, order, required, content_type, instructions: &str| {
            Section {
                id: id.into(),
                title: title.into(),
                order,
                required,
                content_type,
                max_length: None,
                instructions: instructions.into(),
            }
        };

        let mut sections = vec![
            section(
                "executive_summary",
                "Executive Summary",
                1,
                true,
                ContentType::Text,
                "Provide a high-level overview of key findings and recommendations",
            ),
            section(
                "introduction",
                "Introduction",
                2,
                true,
                ContentType::Text,
                "Set the context and objectives of the analysis",
            ),
            section(
                "methodology",
                "Methodology",
                3,
                false,
                ContentType::Text,
                "Describe the approach and methods used",
            ),
            section(
                "findings",
                "Key Findings",
                4,
                true,
                ContentType::List,
                "Present main findings with supporting evidence",
            ),
            section(
                "analysis",
                "Analysis",
                5,
                true,
                ContentType::Text,
                "Provide detailed analysis and insights",
            ),
            section(
                "recommendations",
                "Recommendations",
                6,
                true,
                ContentType::List,
                "Present actionable recommendations",
            ),
            section(
                "conclusion",
                "Conclusion",
                7,
                true,
                ContentType::Text,
                "Summarize key points and next steps",
            ),
        ];
        sections[0].max_length = Some(500);

        Self {
            metadata: TemplateMetadata {
                name: "Default Consulting Report".into(),
                version: default_version(),
                description: "Standard consulting report template".into(),
                created_at: Utc::now(),
            },
            structure: TemplateStructure { sections },
            style: TemplateStyle::default(),
            formatting: Formatting::default(),
            output_formats: default_output_formats(),
            citation_style: default_citation_style(),
        }
    }

    /// A template with default style and formatting, the given metadata,
    /// and the given sections.
    pub fn custom(
        name: impl Into<String>,
        description: impl Into<String>,
        sections: Vec<Section>,
    ) -> Result<Self> {
        let mut template = Self::default_report();
        template.metadata.name = name.into();
        template.metadata.description = description.into();
        template.metadata.created_at = Utc::now();
        template.structure.sections = sections;
        template.validate()?;
        Ok(template)
    }

    /// Pretty-printed JSON export.
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::Serialization(e.to_string()))
    }

    /// Inverse of [`Template::export_json`], validated.
    pub fn import_json(json: &str) -> Result<Self> {
        Self::from_json(json)
    }
}

/// Field-presence checks on the raw document, before typed deserialization.
fn check_shape(value: &Value) -> Result<()> {
    let Some(root) = value.as_object() else {
        return Err(ReportError::structural("Template must be a JSON object"));
    };

    for field in REQUIRED_FIELDS {
        if !root.contains_key(field) {
            return Err(ReportError::structural(format!(
                "Missing required field: {field}"
            )));
        }
    }

    let Some(sections) = root["structure"].get("sections") else {
        return Err(ReportError::structural("Template must have sections"));
    };
    let sections = match sections.as_array() {
        Some(list) if !list.is_empty() => list,
        _ => {
            return Err(ReportError::structural(
                "Template must have at least one section",
            ));
        }
    };

    let mut seen: Vec<&Value> = Vec::with_capacity(sections.len());
    for (i, section) in sections.iter().enumerate() {
        let Some(obj) = section.as_object() else {
            return Err(ReportError::structural(format!(
                "Section {i} must be an object"
            )));
        };
        for field in REQUIRED_SECTION_FIELDS {
            if !obj.contains_key(field) {
                return Err(ReportError::structural(format!(
                    "Section {i} missing required field: {field}"
                )));
            }
        }
        let id = &obj["id"];
        if seen.contains(&id) {
            let shown = id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string());
            return Err(ReportError::structural(format!(
                "Duplicate section ID: {shown}"
            )));
        }
        seen.push(id);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Editing
// ---------------------------------------------------------------------------

impl Template {
    /// Sections in the order they are stored.
    pub fn sections(&self) -> &[Section] {
        &self.structure.sections
    }

    /// Look up a section by id.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.structure.sections.iter().find(|s| s.id == id)
    }

    /// Sections flagged as required, in stored order.
    pub fn required_sections(&self) -> Vec<&Section> {
        self.structure.sections.iter().filter(|s| s.required).collect()
    }

    /// Sections sorted by ascending `order`, ties kept in stored order.
    pub fn ordered_sections(&self) -> Vec<&Section> {
        let mut sections: Vec<&Section> = self.structure.sections.iter().collect();
        sections.sort_by_key(|s| s.order);
        sections
    }

    /// Append a section and re-sort by order. Returns the section's id.
    pub fn add_section(&mut self, new: NewSection) -> Result<String> {
        if new.title.trim().is_empty() {
            return Err(ReportError::structural("Section title must not be empty"));
        }

        let count = self.structure.sections.len();
        let id = match new.id {
            Some(id) if self.section(&id).is_some() => {
                return Err(ReportError::structural(format!(
                    "Duplicate section ID: {id}"
                )));
            }
            Some(id) if id.trim().is_empty() => {
                return Err(ReportError::structural("Section id must not be empty"));
            }
            Some(id) => id,
            None => {
                let mut n = count + 1;
                while self.section(&format!("section_{n}")).is_some() {
                    n += 1;
                }
                format!("section_{n}")
            }
        };

        self.structure.sections.push(Section {
            id: id.clone(),
            title: new.title,
            order: new.order.unwrap_or(count as i64 + 1),
            required: new.required.unwrap_or(false),
            content_type: new.content_type.unwrap_or_default(),
            max_length: new.max_length,
            instructions: new.instructions.unwrap_or_default(),
        });
        self.sort_sections();
        Ok(id)
    }

    /// Remove a section by id, returning it if it existed.
    ///
    /// Removing the only remaining section is a `Structural` error and leaves
    /// the template unchanged.
    pub fn remove_section(&mut self, id: &str) -> Result<Option<Section>> {
        let Some(index) = self.structure.sections.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        if self.structure.sections.len() == 1 {
            return Err(ReportError::structural(
                "Cannot remove the last section of a template",
            ));
        }
        Ok(Some(self.structure.sections.remove(index)))
    }

    /// Apply a partial update. Returns whether the section exists.
    pub fn update_section(&mut self, id: &str, update: SectionUpdate) -> bool {
        let Some(section) = self.structure.sections.iter_mut().find(|s| s.id == id) else {
            return false;
        };

        if let Some(title) = update.title {
            section.title = title;
        }
        if let Some(required) = update.required {
            section.required = required;
        }
        if let Some(content_type) = update.content_type {
            section.content_type = content_type;
        }
        if let Some(max_length) = update.max_length {
            section.max_length = max_length;
        }
        if let Some(instructions) = update.instructions {
            section.instructions = instructions;
        }
        let reorder = match update.order {
            Some(order) if order != section.order => {
                section.order = order;
                true
            }
            _ => false,
        };

        if reorder {
            self.sort_sections();
        }
        true
    }

    /// Assign `order` from each id's 1-based position in `ids`.
    ///
    /// Sections whose id is not listed are dropped. Unknown ids and repeats
    /// are ignored, but still occupy their position. A list naming no
    /// existing section is a `Structural` error and changes nothing.
    pub fn reorder_sections<I, S>(&mut self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<S> = ids.into_iter().collect();
        if !ids.iter().any(|id| self.section(id.as_ref()).is_some()) {
            return Err(ReportError::structural(
                "Reorder must keep at least one existing section",
            ));
        }

        let mut by_id: IndexMap<String, Section> = self
            .structure
            .sections
            .drain(..)
            .map(|s| (s.id.clone(), s))
            .collect();

        let mut reordered = Vec::with_capacity(by_id.len());
        for (i, id) in ids.into_iter().enumerate() {
            if let Some(mut section) = by_id.shift_remove(id.as_ref()) {
                section.order = i as i64 + 1;
                reordered.push(section);
            }
        }

        if !by_id.is_empty() {
            tracing::debug!(
                dropped = ?by_id.keys().collect::<Vec<_>>(),
                "sections dropped by reorder"
            );
        }
        self.structure.sections = reordered;
        Ok(())
    }

    pub fn update_style(&mut self, update: StyleUpdate) {
        let style = &mut self.style;
        if let Some(tone) = update.tone {
            style.tone = tone;
        }
        if let Some(writing_style) = update.writing_style {
            style.writing_style = writing_style;
        }
        if let Some(language) = update.language {
            style.language = language;
        }
        if let Some(formality) = update.formality {
            style.formality = formality;
        }
    }

    pub fn update_formatting(&mut self, update: FormattingUpdate) {
        let formatting = &mut self.formatting;
        if let Some(font_family) = update.font_family {
            formatting.font_family = font_family;
        }
        if let Some(font_size) = update.font_size {
            formatting.font_size = font_size;
        }
        if let Some(line_spacing) = update.line_spacing {
            formatting.line_spacing = line_spacing;
        }
        if let Some(margins) = update.margins {
            formatting.margins = margins;
        }
    }

    fn sort_sections(&mut self) {
        self.structure.sections.sort_by_key(|s| s.order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal(sections: Value) -> Value {
        json!({
            "metadata": {"name": "T"},
            "structure": {"sections": sections},
            "style": {},
            "formatting": {}
        })
    }

    fn abc() -> Template {
        Template::from_value(minimal(json!([
            {"id": "a", "title": "A", "order": 1},
            {"id": "b", "title": "B", "order": 2},
            {"id": "c", "title": "C", "order": 3}
        ])))
        .expect("valid template")
    }

    fn structural_message(result: Result<Template>) -> String {
        match result {
            Err(ReportError::Structural { message }) => message,
            other => panic!("expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn missing_top_level_fields_fail_in_order() {
        for field in REQUIRED_FIELDS {
            let mut value = minimal(json!([{"id": "a", "title": "A", "order": 1}]));
            value.as_object_mut().unwrap().remove(field);
            let message = structural_message(Template::from_value(value));
            assert_eq!(message, format!("Missing required field: {field}"));
        }

        let message = structural_message(Template::from_value(json!({})));
        assert_eq!(message, "Missing required field: metadata");
    }

    #[test]
    fn sections_must_be_non_empty_list() {
        let message = structural_message(Template::from_value(minimal(json!([]))));
        assert_eq!(message, "Template must have at least one section");

        let message = structural_message(Template::from_value(minimal(json!("nope"))));
        assert_eq!(message, "Template must have at least one section");

        let mut value = minimal(json!([]));
        value["structure"] = json!({});
        let message = structural_message(Template::from_value(value));
        assert_eq!(message, "Template must have sections");
    }

    #[test]
    fn section_fields_required() {
        let message = structural_message(Template::from_value(minimal(json!([
            {"id": "a", "title": "A", "order": 1},
            {"id": "b", "order": 2}
        ]))));
        assert_eq!(message, "Section 1 missing required field: title");
    }

    #[test]
    fn duplicate_ids_rejected() {
        let message = structural_message(Template::from_value(minimal(json!([
            {"id": "a", "title": "A", "order": 1},
            {"id": "a", "title": "Again", "order": 2}
        ]))));
        assert_eq!(message, "Duplicate section ID: a");

        let mut template = abc();
        template.structure.sections[1].id = "a".into();
        assert!(matches!(
            template.validate(),
            Err(ReportError::Structural { .. })
        ));
    }

    #[test]
    fn unknown_content_type_is_structural() {
        let result = Template::from_value(minimal(json!([
            {"id": "a", "title": "A", "order": 1, "content_type": "table"}
        ])));
        assert!(matches!(result, Err(ReportError::Structural { .. })));
    }

    #[test]
    fn minimal_template_gets_defaults() {
        let template = abc();
        assert_eq!(template.style.tone, "professional");
        assert_eq!(template.formatting.font_family, "Arial");
        assert_eq!(template.output_formats, OutputFormat::ALL.to_vec());
        assert_eq!(template.sections()[0].content_type, ContentType::Text);
        assert!(!template.sections()[0].required);
    }

    #[test]
    fn default_report_layout() {
        let template = Template::default_report();
        template.validate().expect("default template is valid");
        assert_eq!(template.sections().len(), 7);
        assert_eq!(template.required_sections().len(), 6);
        assert_eq!(
            template.section("findings").map(|s| s.content_type),
            Some(ContentType::List)
        );
        assert_eq!(
            template.section("executive_summary").and_then(|s| s.max_length),
            Some(500)
        );
        assert_eq!(template.citation_style, "apa");
    }

    #[test]
    fn reorder_drops_unlisted_sections() {
        let mut template = abc();
        template.reorder_sections(["b", "a"]).unwrap();

        let got: Vec<(&str, i64)> = template
            .sections()
            .iter()
            .map(|s| (s.id.as_str(), s.order))
            .collect();
        assert_eq!(got, vec![("b", 1), ("a", 2)]);
        assert!(template.section("c").is_none());
    }

    #[test]
    fn reorder_ignores_unknown_and_repeated_ids() {
        let mut template = abc();
        template.reorder_sections(["c", "zzz", "a", "c"]).unwrap();

        let got: Vec<(&str, i64)> = template
            .sections()
            .iter()
            .map(|s| (s.id.as_str(), s.order))
            .collect();
        assert_eq!(got, vec![("c", 1), ("a", 3)]);
    }

    #[test]
    fn add_section_defaults_and_sorting() {
        let mut template = abc();
        let id = template.add_section(NewSection::titled("Appendix")).unwrap();
        assert_eq!(id, "section_4");
        let added = template.section("section_4").unwrap();
        assert_eq!(added.order, 4);
        assert!(!added.required);
        assert_eq!(added.content_type, ContentType::Text);

        let id = template
            .add_section(NewSection {
                id: Some("preface".into()),
                order: Some(0),
                ..NewSection::titled("Preface")
            })
            .unwrap();
        assert_eq!(id, "preface");
        assert_eq!(template.sections()[0].id, "preface");
    }

    #[test]
    fn add_section_synthetic_id_skips_taken() {
        let mut template = abc();
        template
            .add_section(NewSection {
                id: Some("section_4".into()),
                ..NewSection::titled("Taken")
            })
            .unwrap();
        template.remove_section("a").unwrap();
        // 3 sections remain, section_4 is taken
        let id = template.add_section(NewSection::titled("Next")).unwrap();
        assert_eq!(id, "section_5");
    }

    #[test]
    fn add_section_rejects_duplicate_id() {
        let mut template = abc();
        let result = template.add_section(NewSection {
            id: Some("b".into()),
            ..NewSection::titled("Dup")
        });
        assert!(matches!(result, Err(ReportError::Structural { .. })));
        assert_eq!(template.sections().len(), 3);
    }

    #[test]
    fn update_and_remove_sections() {
        let mut template = abc();
        assert!(template.update_section(
            "a",
            SectionUpdate {
                order: Some(10),
                content_type: Some(ContentType::List),
                ..SectionUpdate::default()
            }
        ));
        let ids: Vec<&str> = template.sections().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(template.section("a").unwrap().content_type, ContentType::List);

        assert!(!template.update_section("missing", SectionUpdate::default()));
        assert_eq!(
            template.remove_section("b").unwrap().map(|s| s.title),
            Some("B".into())
        );
        assert!(template.remove_section("b").unwrap().is_none());
    }

    #[test]
    fn edits_never_leave_a_template_empty() {
        let mut template = abc();
        let before = template.clone();
        assert!(matches!(
            template.reorder_sections(["zzz"]),
            Err(ReportError::Structural { .. })
        ));
        assert!(matches!(
            template.reorder_sections(Vec::<String>::new()),
            Err(ReportError::Structural { .. })
        ));
        assert_eq!(template, before);

        template.remove_section("a").unwrap();
        template.remove_section("b").unwrap();
        assert!(matches!(
            template.remove_section("c"),
            Err(ReportError::Structural { .. })
        ));
        assert_eq!(template.sections().len(), 1);
        assert!(template.validate().is_ok());
    }

    #[test]
    fn partial_margins_take_defaults() {
        let margins: Margins = serde_json::from_value(json!({"top": 0.5})).unwrap();
        assert_eq!(
            margins,
            Margins {
                top: 0.5,
                bottom: 1.0,
                left: 1.0,
                right: 1.0
            }
        );
    }

    #[test]
    fn ordered_sections_is_stable() {
        let template = Template::from_value(minimal(json!([
            {"id": "x", "title": "X", "order": 5},
            {"id": "y", "title": "Y", "order": 2},
            {"id": "z", "title": "Z", "order": 5}
        ])))
        .unwrap();
        let ids: Vec<&str> = template
            .ordered_sections()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["y", "x", "z"]);
    }

    #[test]
    fn style_and_formatting_partial_updates() {
        let mut template = Template::default_report();
        template.update_style(StyleUpdate {
            tone: Some("friendly".into()),
            ..StyleUpdate::default()
        });
        template.update_formatting(FormattingUpdate {
            font_size: Some(11.0),
            ..FormattingUpdate::default()
        });
        assert_eq!(template.style.tone, "friendly");
        assert_eq!(template.style.formality, "formal");
        assert_eq!(template.formatting.font_size, 11.0);
        assert_eq!(template.formatting.font_family, "Arial");
    }

    #[test]
    fn custom_template_validates_sections() {
        assert!(Template::custom("Empty", "none", vec![]).is_err());

        let template = Template::custom(
            "Board Pack",
            "Quarterly",
            vec![Section {
                id: "kpis".into(),
                title: "KPIs".into(),
                order: 1,
                required: true,
                content_type: ContentType::List,
                max_length: None,
                instructions: String::new(),
            }],
        )
        .unwrap();
        assert_eq!(template.metadata.name, "Board Pack");
        assert_eq!(template.sections().len(), 1);
    }

    #[test]
    fn export_import_round_trip() {
        let mut template = Template::default_report();
        template.add_section(NewSection::titled("Appendix")).unwrap();
        let json = template.export_json().unwrap();
        let imported = Template::import_json(&json).unwrap();
        assert_eq!(imported, template);

        let custom = abc();
        assert_eq!(Template::import_json(&custom.export_json().unwrap()).unwrap(), custom);
    }

    #[test]
    fn invalid_json_is_structural() {
        assert!(matches!(
            Template::from_json("{not json"),
            Err(ReportError::Structural { .. })
        ));
    }
}
