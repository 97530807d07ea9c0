use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use shared::{
    domain::{Category, EvaluationRecord},
    error::{AnnotationError, ApiError, ErrorCode},
    protocol::{AnalysisSummary, CategoryCounts, RecordPage},
};
use storage::EvalStore;

/// Owns the in-memory record collection and the store it persists to. Handed
/// to request handlers by reference; the collection lives for the process
/// lifetime and records are never created or deleted, only toggled.
#[derive(Clone)]
pub struct ApiContext {
    pub store: EvalStore,
    records: Arc<Mutex<Vec<EvaluationRecord>>>,
}

impl ApiContext {
    pub fn new(store: EvalStore, records: Vec<EvaluationRecord>) -> Self {
        Self {
            store,
            records: Arc::new(Mutex::new(records)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<EvaluationRecord>>, ApiError> {
        self.records
            .lock()
            .map_err(|_| ApiError::new(ErrorCode::Internal, "record state lock poisoned"))
    }
}

pub fn record_page(ctx: &ApiContext, index: usize) -> Result<RecordPage, ApiError> {
    let records = ctx.lock()?;
    let record = records
        .get(index)
        .cloned()
        .ok_or(AnnotationError::RecordNotFound {
            index,
            len: records.len(),
        })?;
    Ok(RecordPage {
        index,
        total: records.len(),
        record,
    })
}

/// Flips the "missing" flag for one ground-truth component and persists the
/// whole collection. The lock is held across flip and save, so each
/// toggle-and-save is atomic with respect to other toggles. A failed save
/// rolls the flip back, leaving in-memory state matching what is on disk.
pub fn toggle_ground_truth(
    ctx: &ApiContext,
    record_index: usize,
    component_index: usize,
) -> Result<(), ApiError> {
    let mut records = ctx.lock()?;
    let len = records.len();
    let record = records
        .get_mut(record_index)
        .ok_or(AnnotationError::RecordNotFound {
            index: record_index,
            len,
        })?;
    record.toggle_ground_truth(component_index)?;

    if let Err(error) = ctx.store.save(&records) {
        if let Some(record) = records.get_mut(record_index) {
            let _ = record.toggle_ground_truth(component_index);
        }
        warn!(%error, record_index, component_index, "failed to persist ground-truth toggle");
        return Err(ApiError::new(ErrorCode::Internal, error.to_string()));
    }
    Ok(())
}

/// Same contract as `toggle_ground_truth`, for one haiku component in one
/// category. Other categories are untouched.
pub fn toggle_haiku(
    ctx: &ApiContext,
    record_index: usize,
    component_index: usize,
    category: Category,
) -> Result<(), ApiError> {
    let mut records = ctx.lock()?;
    let len = records.len();
    let record = records
        .get_mut(record_index)
        .ok_or(AnnotationError::RecordNotFound {
            index: record_index,
            len,
        })?;
    record.toggle_haiku(category, component_index)?;

    if let Err(error) = ctx.store.save(&records) {
        if let Some(record) = records.get_mut(record_index) {
            let _ = record.toggle_haiku(category, component_index);
        }
        warn!(%error, record_index, component_index, %category, "failed to persist haiku toggle");
        return Err(ApiError::new(ErrorCode::Internal, error.to_string()));
    }
    Ok(())
}

pub fn analyze(ctx: &ApiContext) -> Result<AnalysisSummary, ApiError> {
    Ok(analyze_records(&ctx.lock()?))
}

/// Aggregate counts over the collection. Pure and deterministic: component
/// counts sum `true` flags per category; question counts tally records with at
/// least one `true` flag per category. Records still missing either annotation
/// structure are skipped rather than failing the whole report.
pub fn analyze_records(records: &[EvaluationRecord]) -> AnalysisSummary {
    let mut component_counts = CategoryCounts::default();
    let mut question_counts = CategoryCounts::default();
    let mut questions_analyzed = 0;

    for record in records {
        let (Some(ground_truth), Some(haiku)) = (
            record.ground_truth_annotations.as_deref(),
            record.haiku_annotations.as_ref(),
        ) else {
            continue;
        };
        questions_analyzed += 1;

        for category in Category::ALL {
            let flags = haiku.flags(category);
            *component_counts.category_mut(category) +=
                flags.iter().filter(|flag| **flag).count();
            if flags.contains(&true) {
                *question_counts.category_mut(category) += 1;
            }
        }

        component_counts.missing += ground_truth.iter().filter(|flag| **flag).count();
        if ground_truth.contains(&true) {
            question_counts.missing += 1;
        }
    }

    AnalysisSummary {
        component_counts,
        question_counts,
        questions_analyzed,
    }
}
