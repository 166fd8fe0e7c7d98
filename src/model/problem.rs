use crate::api::model::{ProblemId, ProblemRecord};
use crate::config;
use serde::{Deserialize, Serialize};

/// Problem as the backend stores it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReducedProblem {
    pub id: ProblemId,
    pub name: String,
    pub link: String,
    pub difficulty: i64,
    pub is_premium: bool,
    pub problem_text: String,
}

impl From<&ProblemRecord> for ReducedProblem {
    fn from(record: &ProblemRecord) -> Self {
        ReducedProblem {
            id: record.stat.question_id,
            name: record.stat.title.clone(),
            link: record.stat.title_slug.clone(),
            difficulty: record.difficulty.level,
            is_premium: record.paid_only,
            problem_text: config::PLACEHOLDER_PROBLEM_TEXT.to_string(),
        }
    }
}

/// Body of a bulk insert request.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkPayload {
    pub problems: Vec<ReducedProblem>,
}
