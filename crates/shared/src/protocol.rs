use serde::{Deserialize, Serialize};

use crate::domain::{Category, EvaluationRecord};

/// Per-category tallies. `missing` counts ground-truth flags; the other four
/// count haiku flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub exact: usize,
    pub partial: usize,
    pub extra: usize,
    pub hallucination: usize,
    pub missing: usize,
}

impl CategoryCounts {
    pub fn category(&self, category: Category) -> usize {
        match category {
            Category::Exact => self.exact,
            Category::Partial => self.partial,
            Category::Extra => self.extra,
            Category::Hallucination => self.hallucination,
        }
    }

    pub fn category_mut(&mut self, category: Category) -> &mut usize {
        match category {
            Category::Exact => &mut self.exact,
            Category::Partial => &mut self.partial,
            Category::Extra => &mut self.extra,
            Category::Hallucination => &mut self.hallucination,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub component_counts: CategoryCounts,
    pub question_counts: CategoryCounts,
    pub questions_analyzed: usize,
}

/// Snapshot of one record plus its position, for view assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPage {
    pub index: usize,
    pub total: usize,
    pub record: EvaluationRecord,
}
