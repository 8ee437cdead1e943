//! Bounded-concurrency bulk dispatch.
//!
//! Bulk commands fan out per-item work with a small fixed ceiling and
//! aggregate results in input order; one item's failure never aborts its
//! siblings.

use std::future::Future;

use futures_util::stream::{self, StreamExt};
use serde_json::{json, Value};

use n8nctl_api::ApiError;

/// Concurrent in-flight items for bulk commands.
pub const BULK_CONCURRENCY: usize = 6;

/// Per-item outcome, preserved in input order.
#[derive(Debug)]
pub struct ItemOutcome {
    pub id: String,
    pub result: Result<Value, ApiError>,
}

impl ItemOutcome {
    pub fn to_json(&self) -> Value {
        match &self.result {
            Ok(data) => json!({ "id": self.id, "success": true, "data": data }),
            Err(err) => json!({
                "id": self.id,
                "success": false,
                "error": { "code": err.code(), "message": err.to_string() }
            }),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match &self.result {
            Ok(_) => 0,
            Err(err) => err.class().exit_code(),
        }
    }
}

/// Run `operation` for every id with bounded concurrency; results come back
/// in input order.
pub async fn for_each_id<F, Fut>(ids: &[String], operation: F) -> Vec<ItemOutcome>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Value, ApiError>>,
{
    let mut outcomes: Vec<(usize, ItemOutcome)> = stream::iter(ids.iter().cloned().enumerate())
        .map(|(index, id)| {
            let future = operation(id.clone());
            async move {
                let result = future.await;
                (index, ItemOutcome { id, result })
            }
        })
        .buffer_unordered(BULK_CONCURRENCY)
        .collect()
        .await;

    outcomes.sort_by_key(|(index, _)| *index);
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn results_preserve_input_order() {
        let ids: Vec<String> = (0..8).map(|i| format!("w{i}")).collect();
        let outcomes = for_each_id(&ids, |id| async move {
            // Later items finish first; order must still hold.
            let delay = 8 - id.trim_start_matches('w').parse::<u64>().unwrap();
            tokio::time::sleep(Duration::from_millis(delay * 5)).await;
            Ok(serde_json::json!({ "id": id }))
        })
        .await;

        let returned: Vec<&str> = outcomes.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(returned, ids.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_siblings() {
        let ids: Vec<String> = vec!["a".into(), "b".into(), "c".into()];
        let outcomes = for_each_id(&ids, |id| async move {
            if id == "b" {
                Err(ApiError::NotFound {
                    resource: "workflow".into(),
                    id,
                })
            } else {
                Ok(serde_json::json!({"ok": true}))
            }
        })
        .await;

        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());
        assert_eq!(outcomes[1].exit_code(), 65);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_the_ceiling() {
        let in_flight = std::sync::Arc::new(AtomicUsize::new(0));
        let peak = std::sync::Arc::new(AtomicUsize::new(0));
        let ids: Vec<String> = (0..32).map(|i| format!("w{i}")).collect();

        let outcomes = for_each_id(&ids, |_id| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(serde_json::json!({}))
            }
        })
        .await;

        assert_eq!(outcomes.len(), 32);
        assert!(peak.load(Ordering::SeqCst) <= BULK_CONCURRENCY);
    }
}
