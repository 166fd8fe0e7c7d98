use crate::api::model::{self, ExistingIds, ProblemRecord};
use crate::logging::{log, LogLevel};
use crate::model::problem::{BulkPayload, ReducedProblem};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub problems: Vec<ReducedProblem>,
    pub skipped_missing_id: usize,
    pub skipped_existing: usize,
    pub skipped_duplicate: usize,
    pub skipped_malformed: usize,
}

impl Reconciliation {
    pub fn skipped(&self) -> usize {
        self.skipped_missing_id + self.skipped_existing + self.skipped_duplicate + self.skipped_malformed
    }

    pub fn into_payload(self) -> BulkPayload {
        BulkPayload {
            problems: self.problems,
        }
    }
}

/// Reduces every record whose id is neither stored already nor seen earlier in
/// `records`. The first occurrence of a duplicated id wins. Output keeps input order.
pub fn reconcile(records: &[Value], existing: &ExistingIds, source_label: &str) -> Reconciliation {
    let mut result = Reconciliation::default();
    let mut seen: HashSet<i64> = HashSet::with_capacity(records.len());

    for (idx, raw) in records.iter().enumerate() {
        let Some(id) = model::raw_question_id(raw) else {
            log(
                LogLevel::Warning,
                &format!("[{}] Record #{} has no question id, skipping.", source_label, idx),
            );
            result.skipped_missing_id += 1;
            continue;
        };

        if existing.contains(&id) {
            result.skipped_existing += 1;
            continue;
        }

        if !seen.insert(id) {
            log(
                LogLevel::Warning,
                &format!(
                    "[{}] Problem {} appears more than once in this listing, keeping the first.",
                    source_label, id
                ),
            );
            result.skipped_duplicate += 1;
            continue;
        }

        match serde_json::from_value::<ProblemRecord>(raw.clone()) {
            Ok(record) => result.problems.push(ReducedProblem::from(&record)),
            Err(e) => {
                log(
                    LogLevel::Warning,
                    &format!("[{}] Failed to convert problem {}: {}", source_label, id, e),
                );
                result.skipped_malformed += 1;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: i64, title: &str, slug: &str, level: i64, paid: bool) -> Value {
        json!({
            "stat": {
                "question_id": id,
                "question__title": title,
                "question__title_slug": slug,
                "total_acs": 100,
            },
            "difficulty": {"level": level},
            "paid_only": paid,
            "status": null,
        })
    }

    #[test]
    fn maps_source_fields_into_reduced_schema() {
        let records = vec![record(1, "Two Sum", "two-sum", 1, false)];
        let out = reconcile(&records, &HashSet::new(), "test");

        assert_eq!(
            out.problems,
            vec![ReducedProblem {
                id: 1,
                name: "Two Sum".into(),
                link: "two-sum".into(),
                difficulty: 1,
                is_premium: false,
                problem_text: "No text yet.".into(),
            }]
        );
    }

    #[test]
    fn existing_ids_are_filtered_exactly() {
        let records = vec![
            record(1, "A", "a", 1, false),
            record(2, "B", "b", 2, true),
            record(3, "C", "c", 3, false),
        ];
        let existing = HashSet::from([2, 99]);
        let out = reconcile(&records, &existing, "test");

        let ids: Vec<i64> = out.problems.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(out.skipped_existing, 1);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let records = vec![
            record(5, "First", "first", 1, false),
            record(6, "Other", "other", 2, false),
            record(5, "Second", "second", 3, true),
        ];
        let out = reconcile(&records, &HashSet::new(), "test");

        assert_eq!(out.problems.len(), 2);
        assert_eq!(out.problems[0].name, "First");
        assert_eq!(out.skipped_duplicate, 1);
    }

    #[test]
    fn records_without_id_or_with_bad_shape_are_skipped() {
        let records = vec![
            json!({"stat": {"question__title": "No id"}}),
            json!({"stat": {"question_id": 8, "question__title": "Half"}}),
            record(9, "Ok", "ok", 2, false),
        ];
        let out = reconcile(&records, &HashSet::new(), "test");

        assert_eq!(out.problems.len(), 1);
        assert_eq!(out.problems[0].id, 9);
        assert_eq!(out.skipped_missing_id, 1);
        assert_eq!(out.skipped_malformed, 1);
        assert_eq!(out.skipped(), 2);
    }

    #[test]
    fn empty_inventory_keeps_every_identified_record() {
        let records: Vec<Value> = (1..=20)
            .map(|i| record(i, "t", "s", (i % 3) + 1, i % 2 == 0))
            .collect();
        let out = reconcile(&records, &HashSet::new(), "test");

        assert_eq!(out.problems.len(), 20);
        for (raw, reduced) in records.iter().zip(&out.problems) {
            assert_eq!(raw["stat"]["question_id"], json!(reduced.id));
            assert_eq!(raw["difficulty"]["level"], json!(reduced.difficulty));
            assert_eq!(raw["paid_only"], json!(reduced.is_premium));
        }
    }
}
