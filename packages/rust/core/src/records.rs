//! Records returned by the content API.
//!
//! List endpoints return summaries (at least an `id`); `<collection>/<id>`
//! returns the detail record. Unknown fields are ignored, missing required
//! ones fail decoding and abort the run.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use imchef_shared::{ChefError, Result, TopicNode};

/// Decode an envelope `data` value into a record, naming the endpoint on failure.
pub fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ChefError::parse(format!("{endpoint}: unexpected record shape: {e}")))
}

/// Accept either a JSON string or number and keep its textual form.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Entry of a collection listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Summary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// Entry of a curriculum listing; carries the locale used for filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct CurriculumSummary {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub locale: String,
}

/// Detail record of any hierarchy level. Endpoints are built from the
/// summary id, so the detail's own `id` is not read.
#[derive(Debug, Clone, Deserialize)]
pub struct Detail {
    #[serde(deserialize_with = "string_or_number")]
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Detail {
    /// Topic keyed by slug, keeping the description.
    pub fn into_topic(self) -> TopicNode {
        TopicNode::new(self.slug, self.title, self.description)
    }

    /// Topic keyed by slug, without a description.
    pub fn into_bare_topic(self) -> TopicNode {
        TopicNode::new(self.slug, self.title, None)
    }
}

/// Curriculum detail record.
#[derive(Debug, Clone, Deserialize)]
pub struct CurriculumDetail {
    #[serde(flatten)]
    pub detail: Detail,
    #[serde(default)]
    pub cc_attribution_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Lesson resources
// ---------------------------------------------------------------------------

/// Body of `<lessons>/<id>/resources`.
///
/// Entries are kept loose: only `title` is read up front, and `formats` is
/// decoded once an entry has passed the title filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonResources {
    pub single_files: Vec<SingleFile>,
    pub collections: Vec<Collection>,
}

/// A downloadable resource offered in one or more formats.
#[derive(Debug, Clone, Deserialize)]
pub struct SingleFile {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub formats: Value,
}

impl SingleFile {
    /// Decode the format variants. `label` names the resource in errors.
    pub fn file_formats(&self, label: &str) -> Result<Vec<FileFormat>> {
        decode_formats(label, &self.formats)
    }
}

/// One format variant; only the `pdf` flavour is consumed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileFormat {
    #[serde(default)]
    pub pdf: Option<PdfFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PdfFile {
    #[serde(deserialize_with = "string_or_number")]
    pub filename: String,
    pub description: String,
    pub file_url: String,
}

/// A titled group of linked resources.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub formats: Value,
}

impl Collection {
    pub fn url_formats(&self, label: &str) -> Result<Vec<CollectionFormat>> {
        decode_formats(label, &self.formats)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionFormat {
    #[serde(default)]
    pub urls: Option<Vec<LinkedUrl>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkedUrl {
    pub category: String,
    pub href: String,
}

/// A missing `formats` is an empty list.
fn decode_formats<T: DeserializeOwned>(label: &str, formats: &Value) -> Result<Vec<T>> {
    match formats {
        Value::Null => Ok(Vec::new()),
        other => decode(label, other.clone()),
    }
}

/// Entry of `<sections>/<id>/practice_problems`.
#[derive(Debug, Clone, Deserialize)]
pub struct PracticeProblem {
    #[serde(deserialize_with = "string_or_number")]
    pub slug: String,
    pub title: String,
    pub file_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_and_slugs_accept_numbers() {
        let summary: Summary = decode("/grade_bands", json!({"id": 12})).unwrap();
        assert_eq!(summary.id, "12");

        let detail: Detail = decode(
            "/grade_bands/12",
            json!({"id": "12", "slug": 2024, "title": "K-5", "extra": true}),
        )
        .unwrap();
        assert_eq!(detail.slug, "2024");
        assert!(detail.description.is_none());
    }

    #[test]
    fn detail_without_id_decodes() {
        let detail: Detail = decode(
            "/units/3",
            json!({"slug": "g6-u1", "title": "Area", "description": null}),
        )
        .unwrap();
        assert_eq!(detail.slug, "g6-u1");
        assert_eq!(detail.title, "Area");
    }

    #[test]
    fn missing_field_names_endpoint() {
        let err = decode::<Detail>("/units/3", json!({"id": 3, "title": "Unit"})).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/units/3"));
        assert!(msg.contains("slug"));
    }

    #[test]
    fn curriculum_detail_flattens() {
        let detail: CurriculumDetail = decode(
            "/c/1",
            json!({
                "id": 1,
                "slug": "im-k5",
                "title": "IM K-5 Math",
                "description": "Elementary",
                "cc_attribution_name": null
            }),
        )
        .unwrap();
        assert_eq!(detail.detail.slug, "im-k5");
        assert!(detail.cc_attribution_name.is_none());
    }

    #[test]
    fn resources_ignore_other_formats() {
        let res: LessonResources = decode(
            "/lessons/1/resources",
            json!({
                "single_files": [{
                    "title": "Teacher Guide",
                    "formats": [
                        {"docx": {"filename": "g.docx"}},
                        {"pdf": {"filename": "g.pdf", "description": "Guide", "file_url": "https://cdn/g.pdf"}}
                    ]
                }],
                "collections": [{
                    "title": "ExternalUrl",
                    "formats": [{"urls": [{"category": "google_slides", "href": "https://docs.google.com/presentation/d/X/edit"}]}, {"other": 1}]
                }]
            }),
        )
        .unwrap();
        let formats = res.single_files[0].file_formats("Teacher Guide").unwrap();
        assert!(formats[0].pdf.is_none());
        assert_eq!(formats[1].pdf.as_ref().unwrap().filename, "g.pdf");
        let links = res.collections[0].url_formats("ExternalUrl").unwrap();
        assert!(links[1].urls.is_none());
    }

    #[test]
    fn resource_entries_decode_loosely() {
        let res: LessonResources = decode(
            "/lessons/1/resources",
            json!({
                "single_files": [
                    {"title": "Family Letter"},
                    {"title": "Family Letter", "formats": [{"pdf": {"filename": "fl.pdf", "description": null}}]}
                ],
                "collections": [
                    {"title": "Videos", "formats": [{"urls": [{"category": "vimeo"}]}]},
                    {"formats": "unexpected"}
                ]
            }),
        )
        .unwrap();
        assert_eq!(res.single_files.len(), 2);
        assert!(res.single_files[0].file_formats("Family Letter").unwrap().is_empty());
        assert!(res.single_files[1].file_formats("Family Letter").is_err());
        assert!(res.collections[0].url_formats("Videos").is_err());
        assert_eq!(res.collections[1].title, "");
    }
}
