use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AnnotationError;

/// How a model-output component relates to the ground truth. Categories are
/// independent flags, not exclusive states: a component can be both a partial
/// match and a hallucination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Exact,
    Partial,
    Extra,
    Hallucination,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Exact,
        Category::Partial,
        Category::Extra,
        Category::Hallucination,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Exact => "exact",
            Category::Partial => "partial",
            Category::Extra => "extra",
            Category::Hallucination => "hallucination",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Category::Exact),
            "partial" => Ok(Category::Partial),
            "extra" => Ok(Category::Extra),
            "hallucination" => Ok(Category::Hallucination),
            other => Err(AnnotationError::InvalidCategory(other.to_string())),
        }
    }
}

/// One boolean sequence per category, each the same length as the record's
/// haiku component sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFlags {
    pub exact: Vec<bool>,
    pub partial: Vec<bool>,
    pub extra: Vec<bool>,
    pub hallucination: Vec<bool>,
}

impl CategoryFlags {
    pub fn all_false(len: usize) -> Self {
        Self {
            exact: vec![false; len],
            partial: vec![false; len],
            extra: vec![false; len],
            hallucination: vec![false; len],
        }
    }

    pub fn flags(&self, category: Category) -> &[bool] {
        match category {
            Category::Exact => &self.exact,
            Category::Partial => &self.partial,
            Category::Extra => &self.extra,
            Category::Hallucination => &self.hallucination,
        }
    }

    fn flags_mut(&mut self, category: Category) -> &mut Vec<bool> {
        match category {
            Category::Exact => &mut self.exact,
            Category::Partial => &mut self.partial,
            Category::Extra => &mut self.extra,
            Category::Hallucination => &mut self.hallucination,
        }
    }

    pub fn len_matches(&self, len: usize) -> bool {
        Category::ALL
            .into_iter()
            .all(|category| self.flags(category).len() == len)
    }
}

/// One evaluation question with its gold answer and two component sets.
///
/// Annotation structures are `None` only for records that predate annotation
/// support on disk; `normalize` fills them once at load time, after which
/// indices into the flag sequences are positional and stable for the record's
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub question_text: String,
    pub gold_standard_answer: String,
    pub ground_truth_components: Vec<String>,
    pub haiku_components: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground_truth_annotations: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub haiku_annotations: Option<CategoryFlags>,
}

impl EvaluationRecord {
    /// Fills absent annotation structures with all-false sequences sized to
    /// the component sequences. Migration happens here and nowhere else.
    pub fn normalize(&mut self) {
        if self.ground_truth_annotations.is_none() {
            self.ground_truth_annotations = Some(vec![false; self.ground_truth_components.len()]);
        }
        if self.haiku_annotations.is_none() {
            self.haiku_annotations = Some(CategoryFlags::all_false(self.haiku_components.len()));
        }
    }

    pub fn ground_truth_flag(&self, index: usize) -> Result<bool, AnnotationError> {
        self.ground_truth_annotations
            .as_deref()
            .and_then(|flags| flags.get(index).copied())
            .ok_or(AnnotationError::ComponentNotFound {
                index,
                len: self.ground_truth_components.len(),
            })
    }

    /// Flips the "missing" flag for ground-truth component `index` and returns
    /// the new value. A second toggle restores the original value.
    pub fn toggle_ground_truth(&mut self, index: usize) -> Result<bool, AnnotationError> {
        let len = self.ground_truth_components.len();
        let slot = self
            .ground_truth_annotations
            .as_mut()
            .and_then(|flags| flags.get_mut(index))
            .ok_or(AnnotationError::ComponentNotFound { index, len })?;
        *slot = !*slot;
        Ok(*slot)
    }

    pub fn haiku_flag(&self, category: Category, index: usize) -> Result<bool, AnnotationError> {
        self.haiku_annotations
            .as_ref()
            .and_then(|flags| flags.flags(category).get(index).copied())
            .ok_or(AnnotationError::ComponentNotFound {
                index,
                len: self.haiku_components.len(),
            })
    }

    /// Flips the flag for haiku component `index` in `category` and returns
    /// the new value. Other categories are untouched.
    pub fn toggle_haiku(
        &mut self,
        category: Category,
        index: usize,
    ) -> Result<bool, AnnotationError> {
        let len = self.haiku_components.len();
        let slot = self
            .haiku_annotations
            .as_mut()
            .and_then(|flags| flags.flags_mut(category).get_mut(index))
            .ok_or(AnnotationError::ComponentNotFound { index, len })?;
        *slot = !*slot;
        Ok(*slot)
    }
}
