//! Review/approval workflow.
//!
//! Review batches live in the local store under the `reviews` key as a JSON
//! array of [`ReviewTask`]. Only pending batches can be approved or rejected.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{PullTask, ReviewItem, ReviewStatus, ReviewTask};
use crate::io::store::{LocalStore, StoreError};

/// Local store key holding the review list.
pub const REVIEWS_KEY: &str = "reviews";

/// Reviewer recorded when the caller does not name one.
pub const DEFAULT_REVIEWER: &str = "Current User";

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("review '{0}' not found")]
    NotFound(String),

    #[error("review '{id}' has already been {status:?}")]
    AlreadyReviewed { id: String, status: ReviewStatus },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reviewer input shared by approve and reject.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    pub comment: Option<String>,
    pub reviewer: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

/// Build a pending review batch for the output of `task`.
pub fn new_review<R: Rng + ?Sized>(
    rng: &mut R,
    task: &PullTask,
    data: Vec<ReviewItem>,
    created_at: DateTime<Utc>,
) -> ReviewTask {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let suffix: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();

    ReviewTask {
        id: format!("review-{}-{suffix}", created_at.timestamp_millis()),
        task_id: task.id.clone(),
        task_name: task.name.clone(),
        kind: task.kind,
        status: ReviewStatus::Pending,
        created_at,
        data,
        review_comment: None,
        reviewed_by: None,
        reviewed_at: None,
    }
}

pub struct ReviewBook {
    store: Arc<LocalStore>,
}

impl ReviewBook {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<ReviewTask>, ReviewError> {
        Ok(self.store.load(REVIEWS_KEY)?.unwrap_or_default())
    }

    pub fn get(&self, id: &str) -> Result<ReviewTask, ReviewError> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| ReviewError::NotFound(id.to_string()))
    }

    pub fn counts(&self) -> Result<ReviewCounts, ReviewError> {
        let mut counts = ReviewCounts::default();
        for review in self.list()? {
            match review.status {
                ReviewStatus::Pending => counts.pending += 1,
                ReviewStatus::Approved => counts.approved += 1,
                ReviewStatus::Rejected => counts.rejected += 1,
            }
        }
        Ok(counts)
    }

    /// Append `review` unless one for the same task and creation time exists.
    ///
    /// Returns `false` for a duplicate.
    pub fn submit(&self, review: ReviewTask) -> Result<bool, ReviewError> {
        let id = review.id.clone();
        let added = self.store.update(REVIEWS_KEY, |reviews: &mut Vec<ReviewTask>| {
            let duplicate = reviews
                .iter()
                .any(|r| r.task_id == review.task_id && r.created_at == review.created_at);
            if !duplicate {
                reviews.push(review);
            }
            !duplicate
        })?;
        if added {
            info!(review = %id, "submitted review");
        }
        Ok(added)
    }

    /// Approve a pending review.
    ///
    /// For every item whose symbol appears in `edits`, the edited number
    /// replaces `value` and is recorded as `corrected_value`.
    pub fn approve(
        &self,
        id: &str,
        edits: &HashMap<String, f64>,
        decision: Decision,
    ) -> Result<ReviewTask, ReviewError> {
        let reviewed = self.decide(id, |review| {
            for item in &mut review.data {
                if let Some(&edited) = edits.get(&item.symbol) {
                    item.value = edited;
                    item.corrected_value = Some(edited);
                }
            }
            review.status = ReviewStatus::Approved;
            stamp(review, decision);
        })?;
        info!(review = %id, corrections = edits.len(), "approved review");
        Ok(reviewed)
    }

    /// Reject a pending review; its data is left as submitted.
    pub fn reject(&self, id: &str, decision: Decision) -> Result<ReviewTask, ReviewError> {
        let reviewed = self.decide(id, |review| {
            review.status = ReviewStatus::Rejected;
            stamp(review, decision);
        })?;
        info!(review = %id, "rejected review");
        Ok(reviewed)
    }

    fn decide(&self, id: &str, apply: impl FnOnce(&mut ReviewTask)) -> Result<ReviewTask, ReviewError> {
        self.store
            .update(REVIEWS_KEY, |reviews: &mut Vec<ReviewTask>| -> Result<ReviewTask, ReviewError> {
                let review = reviews
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| ReviewError::NotFound(id.to_string()))?;
                if review.status != ReviewStatus::Pending {
                    return Err(ReviewError::AlreadyReviewed {
                        id: id.to_string(),
                        status: review.status,
                    });
                }
                apply(review);
                Ok(review.clone())
            })?
    }
}

fn stamp(review: &mut ReviewTask, decision: Decision) {
    review.review_comment = decision.comment;
    review.reviewed_by = Some(decision.reviewer.unwrap_or_else(|| DEFAULT_REVIEWER.to_string()));
    review.reviewed_at = Some(Utc::now());
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::data::generate_review_item;
    use crate::domain::{DataType, TaskConfig, TaskStatus};

    fn book() -> (tempfile::TempDir, ReviewBook) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalStore::open(dir.path().join("store.json")));
        (dir, ReviewBook::new(store))
    }

    fn task() -> PullTask {
        PullTask {
            id: "etf-task".to_string(),
            name: "ETF Data".to_string(),
            kind: DataType::Etf,
            status: TaskStatus::Completed,
            last_run: None,
            next_run: None,
            progress: None,
            config: TaskConfig {
                interval: 60,
                symbols: None,
                alert_contacts: Vec::new(),
            },
        }
    }

    fn pending(rng: &mut StdRng, at_secs: i64) -> ReviewTask {
        let items = vec![
            generate_review_item(rng, DataType::Stock, Some("AAPL")),
            generate_review_item(rng, DataType::Stock, Some("MSFT")),
        ];
        new_review(rng, &task(), items, Utc.timestamp_opt(at_secs, 0).unwrap())
    }

    #[test]
    fn new_review_is_pending_with_task_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let review = pending(&mut rng, 1_700_000_000);
        assert_eq!(review.status, ReviewStatus::Pending);
        assert_eq!(review.task_id, "etf-task");
        assert!(review.id.starts_with("review-1700000000000-"));
        assert_eq!(review.id.len(), "review-1700000000000-".len() + 6);
    }

    #[test]
    fn submit_skips_duplicates_of_same_task_and_time() {
        let (_dir, book) = book();
        let mut rng = StdRng::seed_from_u64(2);
        let first = pending(&mut rng, 100);
        let mut same_moment = pending(&mut rng, 100);
        same_moment.id = "other".to_string();

        assert!(book.submit(first).unwrap());
        assert!(!book.submit(same_moment).unwrap());
        assert!(book.submit(pending(&mut rng, 200)).unwrap());
        assert_eq!(book.list().unwrap().len(), 2);
    }

    #[test]
    fn approval_persists_corrected_values() {
        let (_dir, book) = book();
        let mut rng = StdRng::seed_from_u64(3);
        let review = pending(&mut rng, 100);
        let id = review.id.clone();
        let msft_before = review.data[1].value;
        book.submit(review).unwrap();

        let edits = HashMap::from([("AAPL".to_string(), 4321.5)]);
        book.approve(
            &id,
            &edits,
            Decision {
                comment: Some("checked against vendor".to_string()),
                reviewer: None,
            },
        )
        .unwrap();

        let stored = book.get(&id).unwrap();
        assert_eq!(stored.status, ReviewStatus::Approved);
        assert_eq!(stored.data[0].value, 4321.5);
        assert_eq!(stored.data[0].corrected_value, Some(4321.5));
        assert_eq!(stored.data[1].value, msft_before);
        assert_eq!(stored.data[1].corrected_value, None);
        assert_eq!(stored.reviewed_by.as_deref(), Some(DEFAULT_REVIEWER));
        assert_eq!(stored.review_comment.as_deref(), Some("checked against vendor"));
        assert!(stored.reviewed_at.is_some());
    }

    #[test]
    fn reject_keeps_data_and_blocks_further_decisions() {
        let (_dir, book) = book();
        let mut rng = StdRng::seed_from_u64(4);
        let review = pending(&mut rng, 100);
        let id = review.id.clone();
        let data = review.data.clone();
        book.submit(review).unwrap();

        let rejected = book
            .reject(
                &id,
                Decision {
                    comment: None,
                    reviewer: Some("ops".to_string()),
                },
            )
            .unwrap();
        assert_eq!(rejected.status, ReviewStatus::Rejected);
        assert_eq!(rejected.data, data);
        assert_eq!(rejected.reviewed_by.as_deref(), Some("ops"));

        let err = book.approve(&id, &HashMap::new(), Decision::default()).unwrap_err();
        assert!(matches!(err, ReviewError::AlreadyReviewed { status: ReviewStatus::Rejected, .. }));
        assert_eq!(book.get(&id).unwrap().status, ReviewStatus::Rejected);
    }

    #[test]
    fn unknown_review_is_not_found() {
        let (_dir, book) = book();
        assert!(matches!(book.get("nope"), Err(ReviewError::NotFound(_))));
        assert!(matches!(
            book.reject("nope", Decision::default()),
            Err(ReviewError::NotFound(_))
        ));
    }

    #[test]
    fn counts_by_status() {
        let (_dir, book) = book();
        let mut rng = StdRng::seed_from_u64(5);
        let a = pending(&mut rng, 1);
        let b = pending(&mut rng, 2);
        let a_id = a.id.clone();
        book.submit(a).unwrap();
        book.submit(b).unwrap();
        book.approve(&a_id, &HashMap::new(), Decision::default()).unwrap();
        assert_eq!(
            book.counts().unwrap(),
            ReviewCounts {
                pending: 1,
                approved: 1,
                rejected: 0
            }
        );
    }
}
