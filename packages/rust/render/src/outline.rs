//! Format-independent document outline.
//!
//! Every renderer consumes the same [`Outline`], so section selection,
//! ordering, and body shaping happen exactly once.

use reportsmith_shared::{ContentType, Formatting, GeneratedContent, SectionBody, Template};

/// Bullet prefix used by all renderers.
pub const BULLET: &str = "\u{2022} ";

/// Label preceding a section's citation list.
pub const SOURCES_LABEL: &str = "Sources:";

/// A document ready to be laid out in any output format.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    /// Document title (the template name).
    pub title: String,
    /// Human-readable generation time.
    pub generated_at: String,
    pub sources: Vec<String>,
    pub formatting: Formatting,
    pub sections: Vec<OutlineSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineSection {
    pub id: String,
    pub heading: String,
    pub body: OutlineBody,
    /// Full citation strings, in order.
    pub citations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineBody {
    /// One text block; may contain line breaks.
    Block(String),
    /// Bulleted items.
    Items(Vec<String>),
}

impl Outline {
    /// Walk the template's sections in ascending `order` and keep those that
    /// have generated content. Sections without content are omitted entirely.
    pub fn build(content: &GeneratedContent, template: &Template) -> Self {
        let sections = template
            .ordered_sections()
            .into_iter()
            .filter_map(|section| {
                let result = content.sections.get(&section.id)?;
                let body = match (section.content_type, &result.content) {
                    (ContentType::List, SectionBody::List(items)) => {
                        OutlineBody::Items(items.clone())
                    }
                    (_, body) => OutlineBody::Block(body.to_plain_text()),
                };
                Some(OutlineSection {
                    id: section.id.clone(),
                    heading: section.title.clone(),
                    body,
                    citations: result
                        .citations
                        .iter()
                        .map(|c| c.full_citation.clone())
                        .collect(),
                })
            })
            .collect();

        Self {
            title: template.metadata.name.clone(),
            generated_at: content
                .metadata
                .generated_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
            sources: content.metadata.sources_used.clone(),
            formatting: template.formatting.clone(),
            sections,
        }
    }

    /// The `Generated:` and `Sources:` lines under the title.
    pub fn preamble(&self) -> [String; 2] {
        [
            format!("Generated: {}", self.generated_at),
            format!("Sources: {}", self.sources.join(", ")),
        ]
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use reportsmith_shared::{
        Citation, ContentType, GeneratedContent, SectionBody, SectionResult, Template,
    };

    pub fn citation(source: &str, location: &str) -> Citation {
        Citation {
            source: source.into(),
            location: location.into(),
            full_citation: format!("{source}: {location}"),
        }
    }

    pub fn text_section(title: &str, text: &str, citations: Vec<Citation>) -> SectionResult {
        SectionResult {
            title: title.into(),
            content: SectionBody::Text(text.into()),
            citations,
            word_count: text.split_whitespace().count(),
            content_type: ContentType::Text,
        }
    }

    pub fn list_section(title: &str, items: &[&str], citations: Vec<Citation>) -> SectionResult {
        SectionResult {
            title: title.into(),
            content: SectionBody::List(items.iter().map(|s| s.to_string()).collect()),
            citations,
            word_count: items.iter().map(|i| i.split_whitespace().count()).sum(),
            content_type: ContentType::List,
        }
    }

    /// The default template with content for `executive_summary` and
    /// `findings` only.
    pub fn partial_report() -> (GeneratedContent, Template) {
        let template = Template::default_report();
        let mut content =
            GeneratedContent::new(template.metadata.name.clone(), vec!["deck.pptx".into()]);
        content.sections.insert(
            "findings".into(),
            list_section(
                "Key Findings",
                &["Churn fell", "NPS rose"],
                vec![citation("deck.pptx", "slide 3")],
            ),
        );
        content.sections.insert(
            "executive_summary".into(),
            text_section("Executive Summary", "Things improved overall.", vec![]),
        );
        (content, template)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use reportsmith_shared::{NewSection, SectionBody};

    #[test]
    fn follows_template_order_and_skips_missing() {
        let (content, template) = partial_report();
        let outline = Outline::build(&content, &template);

        let ids: Vec<&str> = outline.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["executive_summary", "findings"]);
        assert_eq!(outline.sections[1].heading, "Key Findings");
        assert_eq!(
            outline.sections[1].body,
            OutlineBody::Items(vec!["Churn fell".into(), "NPS rose".into()])
        );
        assert_eq!(outline.sections[1].citations, vec!["deck.pptx: slide 3"]);
        assert_eq!(outline.title, "Default Consulting Report");
    }

    #[test]
    fn uses_order_field_not_storage_order() {
        let (content, mut template) = partial_report();
        template.structure.sections.reverse();
        let outline = Outline::build(&content, &template);
        assert_eq!(outline.sections[0].id, "executive_summary");
    }

    #[test]
    fn mismatched_bodies_render_as_blocks() {
        let (mut content, mut template) = partial_report();
        // list body in a text section
        content.sections["executive_summary"].content =
            SectionBody::List(vec!["a".into(), "b".into()]);
        // text body in a list section (e.g. a generation error)
        content.sections["findings"].content = SectionBody::Text("Error generating content: x".into());
        template.add_section(NewSection::titled("Unused")).unwrap();

        let outline = Outline::build(&content, &template);
        assert_eq!(outline.sections[0].body, OutlineBody::Block("a\nb".into()));
        assert_eq!(
            outline.sections[1].body,
            OutlineBody::Block("Error generating content: x".into())
        );
        assert_eq!(outline.sections.len(), 2);
    }

    #[test]
    fn preamble_lists_sources() {
        let (content, template) = partial_report();
        let outline = Outline::build(&content, &template);
        let [generated, sources] = outline.preamble();
        assert!(generated.starts_with("Generated: "));
        assert!(generated.ends_with(" UTC"));
        assert_eq!(sources, "Sources: deck.pptx");
    }
}
