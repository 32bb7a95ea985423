//! Description-based tagging rules.
//!
//! A [`ClassificationRules`] is an ordered list of `(keyword, tags)` pairs.
//! The description is lowercased once and the first rule whose keyword is a
//! substring wins; no match yields an empty tag list.

use imchef_shared::ResourceType;

/// One tagging rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Lowercase substring searched for in the description.
    pub keyword: &'static str,
    pub tags: &'static [ResourceType],
}

impl Rule {
    pub const fn new(keyword: &'static str, tags: &'static [ResourceType]) -> Self {
        Self { keyword, tags }
    }

    /// `description` must already be lowercase.
    fn matches(&self, description: &str) -> bool {
        description.contains(self.keyword)
    }
}

/// Ordered, first-match-wins rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRules {
    rules: Vec<Rule>,
}

impl Default for ClassificationRules {
    fn default() -> Self {
        Self::new(vec![
            Rule::new("guide", &[ResourceType::Guide, ResourceType::LessonPlan]),
            Rule::new("problem", &[ResourceType::Exercise]),
            Rule::new("workbook", &[ResourceType::Activity]),
        ])
    }
}

impl ClassificationRules {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Tags for a free-text description.
    pub fn classify(&self, description: &str) -> Vec<ResourceType> {
        let lowered = description.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.tags.to_vec())
            .unwrap_or_default()
    }
}
