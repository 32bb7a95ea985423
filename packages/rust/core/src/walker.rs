//! Hierarchy walker.
//!
//! Depth-first, strictly sequential traversal of
//! grade band → curriculum → course → unit → section → lesson. Each level
//! lists `<collection>`, fetches `<collection>/<id>` for the detail record,
//! builds the child topic completely and then attaches it to its parent.
//! Lessons hand off to the [`ResourceClassifier`].
//!
//! Any fetch or decode failure aborts the walk. The only silent skip is a
//! curriculum whose locale differs from the target.

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, trace};

use imchef_client::ApiSource;
use imchef_shared::{ChannelNode, Result, TopicNode};

use crate::capability::{Capabilities, Capability, CapabilityStatus};
use crate::classify::ClassificationRules;
use crate::pipeline::ProgressReporter;
use crate::records::{self, CurriculumDetail, CurriculumSummary, Detail, LessonResources, Summary};
use crate::resources::{Attribution, ResourceClassifier, ResourceTally};

/// Root collection of the content API.
pub const GRADE_BANDS: &str = "/grade_bands";

/// Section titles containing this marker get practice problems.
pub const PRACTICE_PROBLEM_MARKER: &str = "K5";

/// Knobs for one walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Curriculums with any other locale are skipped.
    pub locale: String,
    /// Language of every document file.
    pub language: String,
    pub capabilities: Capabilities,
    pub rules: ClassificationRules,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            locale: "en".into(),
            language: "en".into(),
            capabilities: Capabilities::default(),
            rules: ClassificationRules::default(),
        }
    }
}

/// Counters collected during a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub grade_bands: usize,
    pub curriculums: usize,
    pub curriculums_skipped: usize,
    pub courses: usize,
    pub units: usize,
    pub sections: usize,
    pub lessons: usize,
    pub documents: usize,
    pub practice_problems: usize,
    pub assessments_seen: usize,
    pub resources: ResourceTally,
}

/// Walks the API below [`GRADE_BANDS`] into a [`ChannelNode`].
pub struct Walker<'a, S> {
    source: &'a S,
    options: &'a WalkOptions,
    classifier: ResourceClassifier,
    progress: &'a dyn ProgressReporter,
    report: WalkReport,
}

impl<'a, S: ApiSource> Walker<'a, S> {
    pub fn new(source: &'a S, options: &'a WalkOptions, progress: &'a dyn ProgressReporter) -> Self {
        Self {
            source,
            options,
            classifier: ResourceClassifier::new(options.rules.clone(), options.language.clone()),
            progress,
            report: WalkReport::default(),
        }
    }

    /// Populate `channel` with every grade band and everything below it.
    #[instrument(skip_all, fields(channel = %channel.info.source_id))]
    pub async fn walk(mut self, channel: &mut ChannelNode) -> Result<WalkReport> {
        for capability in Capability::ALL {
            match (capability.status(), self.options.capabilities.is_enabled(capability)) {
                (CapabilityStatus::Stub { reason }, true) => {
                    info!(%capability, reason, "capability enabled as stub, no nodes will be built");
                }
                (_, enabled) => debug!(%capability, enabled, "capability"),
            }
        }

        let summaries: Vec<Summary> = self.fetch(GRADE_BANDS).await?;
        for summary in summaries {
            let endpoint = format!("{GRADE_BANDS}/{}", summary.id);
            let detail: Detail = self.fetch(&endpoint).await?;
            self.progress.phase(&format!("Grade band: {}", detail.title));

            let mut topic = detail.into_topic();
            self.walk_curriculums(&endpoint, &mut topic).await?;
            channel.add_child(topic)?;
            self.report.grade_bands += 1;
        }

        info!(
            grade_bands = self.report.grade_bands,
            curriculums = self.report.curriculums,
            lessons = self.report.lessons,
            documents = self.report.documents,
            "walk complete"
        );
        Ok(self.report)
    }

    async fn walk_curriculums(&mut self, grade_band: &str, parent: &mut TopicNode) -> Result<()> {
        let collection = format!("{grade_band}/curriculums");
        let summaries: Vec<CurriculumSummary> = self.fetch(&collection).await?;

        for summary in summaries {
            if summary.locale != self.options.locale {
                trace!(id = %summary.id, locale = %summary.locale, "skipping curriculum in other locale");
                self.report.curriculums_skipped += 1;
                continue;
            }

            let endpoint = format!("{collection}/{}", summary.id);
            let detail: CurriculumDetail = self.fetch(&endpoint).await?;
            self.progress.phase(&format!("Curriculum: {}", detail.detail.title));

            let attribution = Attribution::new(detail.cc_attribution_name);
            let mut topic = detail.detail.into_topic();
            self.walk_courses(&endpoint, &mut topic, &attribution).await?;
            parent.add_child(topic)?;
            self.report.curriculums += 1;
        }
        Ok(())
    }

    async fn walk_courses(
        &mut self,
        curriculum: &str,
        parent: &mut TopicNode,
        attribution: &Attribution,
    ) -> Result<()> {
        let collection = format!("{curriculum}/courses");
        let summaries: Vec<Summary> = self.fetch(&collection).await?;

        for summary in summaries {
            let endpoint = format!("{collection}/{}", summary.id);
            let detail: Detail = self.fetch(&endpoint).await?;

            let mut topic = detail.into_bare_topic();
            self.walk_units(&endpoint, &mut topic, attribution).await?;
            parent.add_child(topic)?;
            self.report.courses += 1;
        }
        Ok(())
    }

    async fn walk_units(
        &mut self,
        course: &str,
        parent: &mut TopicNode,
        attribution: &Attribution,
    ) -> Result<()> {
        let collection = format!("{course}/units");
        let summaries: Vec<Summary> = self.fetch(&collection).await?;

        for summary in summaries {
            let endpoint = format!("{collection}/{}", summary.id);
            let detail: Detail = self.fetch(&endpoint).await?;

            let mut topic = detail.into_bare_topic();
            if self.options.capabilities.is_enabled(Capability::Assessments) {
                self.visit_assessments(&endpoint).await?;
            }
            self.walk_sections(&endpoint, &mut topic, attribution).await?;
            parent.add_child(topic)?;
            self.report.units += 1;
        }
        Ok(())
    }

    /// Fetch a unit's assessments. Nothing is built from them.
    async fn visit_assessments(&mut self, unit: &str) -> Result<()> {
        let collection = format!("{unit}/assessments");
        let summaries: Vec<Summary> = self.fetch(&collection).await?;

        for summary in summaries {
            let endpoint = format!("{collection}/{}", summary.id);
            let _detail: serde_json::Value = self.source.fetch_data(&endpoint).await?;
            self.report.assessments_seen += 1;
        }
        Ok(())
    }

    async fn walk_sections(
        &mut self,
        unit: &str,
        parent: &mut TopicNode,
        attribution: &Attribution,
    ) -> Result<()> {
        let collection = format!("{unit}/sections");
        let summaries: Vec<Summary> = self.fetch(&collection).await?;

        for summary in summaries {
            let endpoint = format!("{collection}/{}", summary.id);
            let detail: Detail = self.fetch(&endpoint).await?;

            let practice = self.options.capabilities.is_enabled(Capability::PracticeProblems)
                && detail.title.contains(PRACTICE_PROBLEM_MARKER);

            let mut topic = detail.into_bare_topic();
            self.walk_lessons(&endpoint, &mut topic, attribution).await?;
            if practice {
                self.add_practice_problems(&endpoint, &mut topic, attribution)
                    .await?;
            }
            parent.add_child(topic)?;
            self.report.sections += 1;
        }
        Ok(())
    }

    async fn add_practice_problems(
        &mut self,
        section: &str,
        parent: &mut TopicNode,
        attribution: &Attribution,
    ) -> Result<()> {
        let endpoint = format!("{section}/practice_problems");
        let problems: Vec<records::PracticeProblem> = self.fetch(&endpoint).await?;

        for document in self.classifier.practice_problems(&problems, attribution) {
            parent.add_child(document)?;
            self.report.practice_problems += 1;
        }
        Ok(())
    }

    async fn walk_lessons(
        &mut self,
        section: &str,
        parent: &mut TopicNode,
        attribution: &Attribution,
    ) -> Result<()> {
        let collection = format!("{section}/lessons");
        let summaries: Vec<Summary> = self.fetch(&collection).await?;

        for summary in summaries {
            let endpoint = format!("{collection}/{}", summary.id);
            let detail: Detail = self.fetch(&endpoint).await?;
            let resources: LessonResources = self.fetch(&format!("{endpoint}/resources")).await?;

            let (documents, tally) =
                self.classifier
                    .classify_lesson(&detail.title, &resources, attribution)?;

            let title = detail.title.clone();
            let mut topic = detail.into_bare_topic();
            let count = documents.len();
            for document in documents {
                topic.add_child(document)?;
            }
            parent.add_child(topic)?;

            self.report.lessons += 1;
            self.report.documents += count;
            self.report.resources += tally;
            self.progress.lesson_done(&title, count, self.report.lessons);
        }
        Ok(())
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let data = self.source.fetch_data(endpoint).await?;
        records::decode(endpoint, data)
    }
}
