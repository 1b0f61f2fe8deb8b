//! The timed walk behind a started pull task.

use std::sync::Arc;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, info};

use super::{TaskBoard, symbol_at, total_steps};
use crate::data::generate_review_item;
use crate::domain::{PullTask, TaskProgress, TaskStatus};
use crate::review::new_review;

/// Drive run `run` of one pull to completion.
///
/// Every write back to the board goes through `run`, so a pull that was
/// stopped or restarted after its last await leaves no trace.
pub(super) async fn run(board: Arc<TaskBoard>, task: PullTask, run: u64) {
    let total = total_steps(&task);
    let mut rng = StdRng::from_entropy();
    let mut items = Vec::with_capacity(total);

    let step = board.step();
    let mut ticker = interval_at(Instant::now() + step, step);

    for i in 0..total {
        ticker.tick().await;
        let symbol = symbol_at(&task, i);
        items.push(generate_review_item(&mut rng, task.kind, symbol.as_deref()));

        let progress = TaskProgress {
            current: i + 1,
            total,
            current_symbol: symbol_at(&task, i + 1),
        };
        match board.modify_run(&task.id, run, |t| t.progress = Some(progress)) {
            Some(Ok(_)) => {}
            Some(Err(_)) => {
                // Task vanished from the board; nothing to report to.
                board.finish_run(&task.id, run, || ());
                return;
            }
            None => {
                debug!(task = %task.id, run, "pull superseded");
                return;
            }
        }
    }

    let review = new_review(&mut rng, &task, items, Utc::now());
    let review_id = review.id.clone();
    let finished = board.finish_run(&task.id, run, || {
        let status = match board.reviews().submit(review) {
            Ok(_) => {
                info!(task = %task.id, review = %review_id, steps = total, "pull task completed");
                TaskStatus::Completed
            }
            Err(e) => {
                error!(task = %task.id, "failed to store review: {e}");
                TaskStatus::Error
            }
        };
        let _ = board.modify(&task.id, |t| {
            t.status = status;
            t.progress = None;
        });
    });
    if finished.is_none() {
        debug!(task = %task.id, run, "pull stopped before completing; review discarded");
    }
}
