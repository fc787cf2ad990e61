//! One-page PDF rendering of a brief.
//!
//! Layout is computed first as a list of placed text runs per page, then
//! drawn with printpdf's built-in Helvetica faces. Coordinates are PDF
//! points from the bottom-left corner of a US Letter page.

use std::path::Path;

use printpdf::{BuiltinFont, Mm, PdfDocument, Pt};

use crate::brief::{Brief, MODULES};
use crate::error::{Error, Result};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 50.0;
const BODY_SIZE: f32 = 11.0;
const BODY_LEADING: f32 = 14.0;
const EVIDENCE_SIZE: f32 = 9.0;
const EVIDENCE_LEADING: f32 = 11.0;
const HEADING_SIZE: f32 = 14.0;
const HEADING_ADVANCE: f32 = 18.0;
const PARAGRAPH_GAP: f32 = 6.0;
const NEW_PAGE_BELOW: f32 = 160.0;
const WRAP_CHARS: usize = 95;
const MAX_BULLETS: usize = 6;
const MAX_EVIDENCE: usize = 3;

/// Document title printed at the top of the first page.
pub const TITLE: &str = "Strategic Account Intelligence Brief";

/// A run of text at a fixed position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    /// The text.
    pub text: String,
    /// Distance from the left edge, in points.
    pub x: f32,
    /// Baseline distance from the bottom edge, in points.
    pub y: f32,
    /// Font size in points.
    pub size: f32,
    /// Whether to use the bold face.
    pub bold: bool,
}

/// Greedy word wrap at `max_chars` characters per line.
///
/// Words longer than the limit get a line of their own.
#[must_use]
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let extra = word.chars().count() + usize::from(!current.is_empty());
        if !current.is_empty() && current.chars().count() + extra > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// File name for a company's brief, e.g. `Acme_Corp_brief.pdf`.
#[must_use]
pub fn pdf_file_name(company: &str) -> String {
    format!("{}_brief.pdf", company.trim().replace(' ', "_"))
}

struct Layout {
    pages: Vec<Vec<PlacedText>>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn place(&mut self, text: &str, size: f32, bold: bool) {
        if self.y < MARGIN {
            self.new_page();
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedText {
                text: text.to_string(),
                x: MARGIN,
                y: self.y,
                size,
                bold,
            });
        }
    }

    fn paragraph(&mut self, text: &str, size: f32, leading: f32) {
        for line in wrap_text(text, WRAP_CHARS) {
            self.place(&line, size, false);
            self.y -= leading;
        }
        self.y -= PARAGRAPH_GAP;
    }

    fn heading(&mut self, text: &str) {
        self.place(text, HEADING_SIZE, true);
        self.y -= HEADING_ADVANCE;
    }

    fn label(&mut self, text: &str) {
        self.place(text, BODY_SIZE, true);
        self.y -= BODY_LEADING;
    }

    fn break_if_low(&mut self) {
        if self.y < NEW_PAGE_BELOW {
            self.new_page();
        }
    }
}

/// Lay out `brief` into pages of placed text.
#[must_use]
pub fn layout(brief: &Brief) -> Vec<Vec<PlacedText>> {
    let mut page = Layout::new();

    page.heading(TITLE);
    page.paragraph(&format!("Company: {}", brief.company), BODY_SIZE, BODY_LEADING);
    page.paragraph(&format!("Persona: {}", brief.persona), BODY_SIZE, BODY_LEADING);
    page.paragraph(
        &format!("Generated: {}", brief.generated_at),
        BODY_SIZE,
        BODY_LEADING,
    );
    page.paragraph(
        &format!("Search recency: {}", brief.search_recency),
        BODY_SIZE,
        BODY_LEADING,
    );

    for (key, title) in MODULES {
        page.break_if_low();
        page.heading(title);

        let Some(module) = brief.module(key) else {
            continue;
        };
        if let Some(confidence) = module.confidence {
            page.paragraph(&format!("Confidence: {confidence}"), BODY_SIZE, BODY_LEADING);
        }
        for bullet in module.bullets.iter().take(MAX_BULLETS) {
            page.paragraph(&format!("- {bullet}"), BODY_SIZE, BODY_LEADING);
        }
        if !module.evidence.is_empty() {
            page.label("Top evidence:");
            for evidence in module.evidence.iter().take(MAX_EVIDENCE) {
                page.paragraph(
                    &format!("- {} ({})", evidence.title, evidence.url),
                    EVIDENCE_SIZE,
                    EVIDENCE_LEADING,
                );
            }
        }
    }

    page.pages
}

/// Render `brief` to PDF bytes.
///
/// # Errors
///
/// Returns [`Error::Pdf`] if a font cannot be embedded or the document
/// cannot be serialized.
pub fn render(brief: &Brief) -> Result<Vec<u8>> {
    let width = Mm::from(Pt(PAGE_WIDTH));
    let height = Mm::from(Pt(PAGE_HEIGHT));
    let (doc, first_page, first_layer) = PdfDocument::new(TITLE, width, height, "Brief");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| Error::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| Error::Pdf(e.to_string()))?;

    for (index, runs) in layout(brief).into_iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(width, height, "Brief");
            doc.get_page(page).get_layer(layer)
        };
        for run in runs {
            let font = if run.bold { &bold } else { &regular };
            layer.use_text(run.text, run.size, Mm::from(Pt(run.x)), Mm::from(Pt(run.y)), font);
        }
    }

    doc.save_to_bytes().map_err(|e| Error::Pdf(e.to_string()))
}

/// Render `brief` and write it to `path`.
///
/// # Errors
///
/// Returns [`Error::Pdf`] if rendering fails or [`Error::Io`] if the file
/// cannot be written.
pub fn write(brief: &Brief, path: &Path) -> Result<()> {
    let bytes = render(brief)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::{BriefModule, Evidence};

    fn module(bullets: usize, evidence: usize) -> BriefModule {
        BriefModule {
            bullets: (0..bullets).map(|i| format!("Bullet {i}")).collect(),
            confidence: Some(0.7),
            evidence: (0..evidence)
                .map(|i| Evidence {
                    url: format!("https://example.com/{i}"),
                    title: format!("Source {i}"),
                    ..Evidence::default()
                })
                .collect(),
        }
    }

    fn full_brief() -> Brief {
        Brief {
            company: "Acme Corp".to_string(),
            persona: "CIO".to_string(),
            generated_at: "2026-01-07T10:00:00Z".to_string(),
            search_recency: "month".to_string(),
            modules: MODULES
                .iter()
                .map(|(key, _)| ((*key).to_string(), module(7, 5)))
                .collect(),
            api_meta: None,
        }
    }

    fn texts(pages: &[Vec<PlacedText>]) -> Vec<&str> {
        pages.iter().flatten().map(|run| run.text.as_str()).collect()
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("one two three", 7), vec!["one two", "three"]);
        assert_eq!(wrap_text("  ", 10), Vec::<String>::new());
        assert_eq!(wrap_text("a verylongword b", 4), vec!["a", "verylongword", "b"]);
    }

    #[test]
    fn test_wrap_text_respects_limit() {
        let text = "word ".repeat(60);
        for line in wrap_text(&text, WRAP_CHARS) {
            assert!(line.len() <= WRAP_CHARS);
        }
    }

    #[test]
    fn test_pdf_file_name() {
        assert_eq!(pdf_file_name("Acme Corp"), "Acme_Corp_brief.pdf");
        assert_eq!(pdf_file_name("BioMarin"), "BioMarin_brief.pdf");
    }

    #[test]
    fn test_layout_header_and_sections() {
        let pages = layout(&full_brief());
        let all = texts(&pages);

        assert_eq!(all[0], TITLE);
        assert_eq!(all[1], "Company: Acme Corp");
        assert!(all.contains(&"Search recency: month"));
        for (_, title) in MODULES {
            assert!(all.contains(&title), "missing {title}");
        }
    }

    #[test]
    fn test_layout_caps_bullets_and_evidence() {
        let pages = layout(&full_brief());
        let all = texts(&pages);

        let per_module = MODULES.len();
        assert_eq!(all.iter().filter(|t| **t == "- Bullet 5").count(), per_module);
        assert_eq!(all.iter().filter(|t| **t == "- Bullet 6").count(), 0);
        assert_eq!(
            all.iter().filter(|t| t.starts_with("- Source 2")).count(),
            per_module
        );
        assert_eq!(all.iter().filter(|t| t.starts_with("- Source 3")).count(), 0);
        assert!(all.contains(&"Confidence: 0.7"));
    }

    #[test]
    fn test_layout_breaks_pages_and_stays_on_page() {
        let pages = layout(&full_brief());
        assert!(pages.len() > 1);
        for run in pages.iter().flatten() {
            assert!(run.y > 0.0 && run.y <= PAGE_HEIGHT - MARGIN);
        }
    }

    #[test]
    fn test_long_bullets_flow_onto_next_page() {
        let long = "freight ".repeat(120);
        let mut brief = Brief::default();
        brief.modules.insert(
            "account_summary".to_string(),
            BriefModule {
                bullets: vec![long; MAX_BULLETS],
                ..BriefModule::default()
            },
        );

        let pages = layout(&brief);
        assert!(pages.len() > 1);
        for run in pages.iter().flatten() {
            assert!(run.y >= MARGIN, "{} placed at y={}", run.text, run.y);
        }
    }

    #[test]
    fn test_write_creates_file() {
        let path = std::env::temp_dir().join(format!(
            "briefgate-pdf-{}-{}",
            std::process::id(),
            pdf_file_name("Acme Corp")
        ));
        write(&full_brief(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let _ = std::fs::remove_file(&path);

        let missing_dir = std::env::temp_dir().join("briefgate-no-such-dir").join("x.pdf");
        assert!(matches!(write(&full_brief(), &missing_dir), Err(Error::Io(_))));
    }

    #[test]
    fn test_layout_styles() {
        let pages = layout(&full_brief());
        let heading = pages[0].iter().find(|r| r.text == "Account Summary").unwrap();
        assert!(heading.bold);
        assert!((heading.size - HEADING_SIZE).abs() < f32::EPSILON);

        let evidence = pages[0].iter().find(|r| r.text.starts_with("- Source 0")).unwrap();
        assert!(!evidence.bold);
        assert!((evidence.size - EVIDENCE_SIZE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_layout_empty_brief_lists_titles_only() {
        let pages = layout(&Brief::default());
        let all = texts(&pages);
        assert!(all.contains(&"Next-Step Email Draft"));
        assert!(!all.iter().any(|t| t.starts_with("Confidence")));
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render(&full_brief()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
