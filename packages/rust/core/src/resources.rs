//! Lesson resource classifier.
//!
//! Turns a lesson's resource bundle into [`DocumentNode`]s:
//! - single files: allow-listed titles, PDF variant only, tagged by
//!   [`ClassificationRules`]
//! - linked collections: `ExternalUrl` only; Google Slides links become a
//!   PDF export of the presentation, any other link category is logged and
//!   dropped

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error, trace};

use imchef_shared::{
    COPYRIGHT_DEFAULT, ChefError, DocumentFile, DocumentNode, LICENSE_CC_BY, ResourceType, Result,
    Role,
};

use crate::classify::ClassificationRules;
use crate::records::{LessonResources, PracticeProblem};

/// Single-file resource titles that are imported.
pub const ALLOWED_FILE_TITLES: [&str; 3] = [
    "Student Workbook",
    "Teacher Guide",
    "Curated Practice Problem Set",
];

/// The only linked-collection title that is imported.
pub const EXTERNAL_URL_COLLECTION: &str = "ExternalUrl";

/// Link category converted to a PDF export.
pub const GOOGLE_SLIDES_CATEGORY: &str = "google_slides";

/// PDF export URL of a Google Slides presentation.
pub const SLIDES_PDF_EXPORT_URL: &str =
    "https://docs.google.com/presentation/d/{PRESENTATION_ID}/export/pdf";

static SLIDES_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/presentation/d/([a-zA-Z0-9_-]+)/").expect("valid presentation id pattern")
});

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

/// Copyright holder of everything below one curriculum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribution(Option<String>);

impl Attribution {
    pub fn new(name: Option<String>) -> Self {
        Self(name)
    }

    /// The curriculum's attribution, or the default organization when empty.
    pub fn copyright_holder(&self) -> &str {
        match self.0.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => COPYRIGHT_DEFAULT,
        }
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// What happened to a lesson's resources besides the emitted documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceTally {
    /// Single files whose title is not allow-listed.
    pub files_filtered: usize,
    /// Allow-listed single files with no PDF variant.
    pub files_without_pdf: usize,
    /// Linked URLs with an unsupported category.
    pub links_dropped: usize,
}

impl std::ops::AddAssign for ResourceTally {
    fn add_assign(&mut self, other: Self) {
        self.files_filtered += other.files_filtered;
        self.files_without_pdf += other.files_without_pdf;
        self.links_dropped += other.links_dropped;
    }
}

/// Builds documents for one lesson at a time.
#[derive(Debug, Clone)]
pub struct ResourceClassifier {
    rules: ClassificationRules,
    language: String,
}

impl ResourceClassifier {
    pub fn new(rules: ClassificationRules, language: impl Into<String>) -> Self {
        Self {
            rules,
            language: language.into(),
        }
    }

    /// Documents for `resources`, in bundle order: single files first, then links.
    pub fn classify_lesson(
        &self,
        lesson_title: &str,
        resources: &LessonResources,
        attribution: &Attribution,
    ) -> Result<(Vec<DocumentNode>, ResourceTally)> {
        let mut documents = Vec::new();
        let mut tally = ResourceTally::default();

        for resource in &resources.single_files {
            if !ALLOWED_FILE_TITLES.contains(&resource.title.as_str()) {
                trace!(title = %resource.title, "resource title not imported");
                tally.files_filtered += 1;
                continue;
            }

            let label = format!("{lesson_title}: {}", resource.title);
            let formats = resource.file_formats(&label)?;
            let before = documents.len();
            for pdf in formats.iter().filter_map(|f| f.pdf.as_ref()) {
                documents.push(DocumentNode {
                    source_id: pdf.filename.clone(),
                    title: format!("{lesson_title} {}", resource.title),
                    files: vec![self.file(&pdf.file_url)],
                    resource_types: self.rules.classify(&pdf.description),
                    license: LICENSE_CC_BY.to_string(),
                    copyright_holder: attribution.copyright_holder().to_string(),
                    role: Role::Coach,
                });
            }
            if documents.len() == before {
                // No PDF variant: nothing to import even though the title matched.
                debug!(title = %resource.title, lesson = lesson_title, "resource has no pdf format");
                tally.files_without_pdf += 1;
            }
        }

        let mut formats = Vec::new();
        for collection in &resources.collections {
            if collection.title != EXTERNAL_URL_COLLECTION {
                trace!(title = %collection.title, "collection not imported");
                continue;
            }
            let label = format!("{lesson_title}: {}", collection.title);
            formats.extend(collection.url_formats(&label)?);
        }
        let links = formats.iter().filter_map(|f| f.urls.as_ref()).flatten();

        for link in links {
            if link.category != GOOGLE_SLIDES_CATEGORY {
                error!(category = %link.category, href = %link.href, "unsupported external url category");
                tally.links_dropped += 1;
                continue;
            }

            let presentation_id = presentation_id(&link.href)?;
            documents.push(DocumentNode {
                source_id: presentation_id.to_string(),
                title: format!("{lesson_title} Lesson Presentation"),
                files: vec![self.file(&slides_pdf_url(presentation_id))],
                resource_types: vec![ResourceType::Lesson],
                license: LICENSE_CC_BY.to_string(),
                copyright_holder: attribution.copyright_holder().to_string(),
                role: Role::Coach,
            });
        }

        Ok((documents, tally))
    }

    /// One untagged learner document per practice problem.
    pub fn practice_problems(
        &self,
        problems: &[PracticeProblem],
        attribution: &Attribution,
    ) -> Vec<DocumentNode> {
        problems
            .iter()
            .map(|p| DocumentNode {
                source_id: p.slug.clone(),
                title: p.title.clone(),
                files: vec![self.file(&p.file_url)],
                resource_types: Vec::new(),
                license: LICENSE_CC_BY.to_string(),
                copyright_holder: attribution.copyright_holder().to_string(),
                role: Role::Learner,
            })
            .collect()
    }

    fn file(&self, path: &str) -> DocumentFile {
        DocumentFile {
            path: path.to_string(),
            language: self.language.clone(),
        }
    }
}

/// Extract the presentation id from a Google Slides URL.
pub fn presentation_id(href: &str) -> Result<&str> {
    SLIDES_ID_RE
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ChefError::parse(format!("no presentation id in google_slides url '{href}'")))
}

/// PDF export URL for a presentation id.
pub fn slides_pdf_url(presentation_id: &str) -> String {
    SLIDES_PDF_EXPORT_URL.replace("{PRESENTATION_ID}", presentation_id)
}
