//! In-memory [`ApiSource`] for walker and pipeline tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Value, json};

use imchef_client::ApiSource;
use imchef_shared::{ChefError, Result};

/// Serves canned `data` values by endpoint and records every request.
#[derive(Default)]
pub struct FixtureSource {
    responses: HashMap<String, Value>,
    calls: Mutex<Vec<String>>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, endpoint: &str, data: Value) -> Self {
        self.responses.insert(endpoint.to_string(), data);
        self
    }

    /// Endpoints requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, endpoint: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == endpoint)
    }
}

impl ApiSource for FixtureSource {
    async fn fetch_data(&self, endpoint: &str) -> Result<Value> {
        self.calls.lock().unwrap().push(endpoint.to_string());
        self.responses
            .get(endpoint)
            .cloned()
            .ok_or_else(|| ChefError::Network(format!("{endpoint}: HTTP 404 Not Found")))
    }
}

/// One path through every level: grade band 1, curriculum 10 (`en`, with
/// attribution), course 100, unit 1000, section 10000, lesson 100000 holding
/// a single Student Workbook PDF.
pub fn single_path() -> FixtureSource {
    let gb = "/grade_bands/1";
    let cur = format!("{gb}/curriculums/10");
    let course = format!("{cur}/courses/100");
    let unit = format!("{course}/units/1000");
    let section = format!("{unit}/sections/10000");
    let lesson = format!("{section}/lessons/100000");

    FixtureSource::new()
        .with("/grade_bands", json!([{"id": 1}]))
        .with(
            gb,
            json!({"id": 1, "slug": "k-5", "title": "Grades K-5", "description": "Elementary"}),
        )
        .with(
            &format!("{gb}/curriculums"),
            json!([{"id": 10, "locale": "en"}]),
        )
        .with(
            &cur,
            json!({
                "id": 10,
                "slug": "im-k5-math",
                "title": "IM K-5 Math",
                "description": "Elementary curriculum",
                "cc_attribution_name": "Open Up Resources"
            }),
        )
        .with(&format!("{cur}/courses"), json!([{"id": 100}]))
        .with(
            &course,
            json!({"id": 100, "slug": "grade-1", "title": "Grade 1", "description": "ignored"}),
        )
        .with(&format!("{course}/units"), json!([{"id": 1000}]))
        .with(&unit, json!({"id": 1000, "slug": "unit-1", "title": "Unit 1"}))
        .with(&format!("{unit}/sections"), json!([{"id": 10000}]))
        .with(
            &section,
            json!({"id": 10000, "slug": "section-a", "title": "Section A"}),
        )
        .with(&format!("{section}/lessons"), json!([{"id": 100000}]))
        .with(
            &lesson,
            json!({"id": 100000, "slug": "lesson-1", "title": "Lesson 1"}),
        )
        .with(
            &format!("{lesson}/resources"),
            json!({
                "single_files": [{
                    "title": "Student Workbook",
                    "formats": [{"pdf": {
                        "filename": "g1-u1-l1-workbook.pdf",
                        "description": "Student workbook",
                        "file_url": "https://cdn.example.org/g1-u1-l1-workbook.pdf"
                    }}]
                }],
                "collections": []
            }),
        )
}
