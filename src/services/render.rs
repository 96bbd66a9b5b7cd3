//! Client side of the document-rendering queue.
//!
//! Rendering itself happens in an external worker; this module only enqueues
//! jobs, reads their progress and collects the produced archive.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use redis::{cmd, RedisError};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::core::redis::RedisHandle;

#[derive(Debug, Error)]
pub(crate) enum RenderError {
    #[error("render queue unavailable")]
    Unavailable,
    #[error("unknown render handle")]
    UnknownHandle,
    #[error("render backend error: {0}")]
    Backend(#[from] RedisError),
    #[error("render did not finish in time")]
    Timeout,
    #[error("render failed")]
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RenderStatus {
    Pending,
    Done,
    Failed,
}

impl RenderStatus {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct TaskProgress {
    pub(crate) status: RenderStatus,
    pub(crate) progress: Option<u8>,
}

#[async_trait]
pub(crate) trait RenderQueue: Send + Sync {
    /// Enqueues a job and returns its handle.
    async fn submit(&self, name: &str, payload: &serde_json::Value) -> Result<String, RenderError>;

    async fn poll(&self, handle: &str) -> Result<TaskProgress, RenderError>;

    /// Takes the finished result. A handle yields its result at most once.
    async fn fetch_result(&self, handle: &str) -> Result<Vec<u8>, RenderError>;
}

pub(crate) struct RedisRenderQueue {
    redis: RedisHandle,
    queue_name: String,
}

impl RedisRenderQueue {
    pub(crate) fn new(redis: RedisHandle, queue_name: String) -> Self {
        Self { redis, queue_name }
    }

    fn status_key(&self, handle: &str) -> String {
        format!("{}:status:{handle}", self.queue_name)
    }

    fn result_key(&self, handle: &str) -> String {
        format!("{}:result:{handle}", self.queue_name)
    }
}

#[derive(Serialize)]
struct RenderJob<'a> {
    handle: &'a str,
    name: &'a str,
    payload: &'a serde_json::Value,
}

#[async_trait]
impl RenderQueue for RedisRenderQueue {
    async fn submit(&self, name: &str, payload: &serde_json::Value) -> Result<String, RenderError> {
        let mut conn = self.redis.connection().await.ok_or(RenderError::Unavailable)?;

        let handle = Uuid::new_v4().to_string();
        let job = serde_json::to_string(&RenderJob { handle: &handle, name, payload })
            .map_err(|_| RenderError::Failed)?;

        redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(self.status_key(&handle))
            .arg("status")
            .arg("pending")
            .ignore()
            .cmd("LPUSH")
            .arg(&self.queue_name)
            .arg(job)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;

        tracing::debug!(handle = %handle, queue = %self.queue_name, "Render job enqueued");
        Ok(handle)
    }

    async fn poll(&self, handle: &str) -> Result<TaskProgress, RenderError> {
        let mut conn = self.redis.connection().await.ok_or(RenderError::Unavailable)?;

        let fields: HashMap<String, String> =
            cmd("HGETALL").arg(self.status_key(handle)).query_async(&mut conn).await?;
        progress_from_fields(&fields)
    }

    async fn fetch_result(&self, handle: &str) -> Result<Vec<u8>, RenderError> {
        let mut conn = self.redis.connection().await.ok_or(RenderError::Unavailable)?;

        let result_key = self.result_key(handle);
        let (bytes, _): (Option<Vec<u8>>, i64) = redis::pipe()
            .atomic()
            .cmd("GET")
            .arg(&result_key)
            .cmd("DEL")
            .arg(&result_key)
            .arg(self.status_key(handle))
            .query_async(&mut conn)
            .await?;

        bytes.ok_or(RenderError::UnknownHandle)
    }
}

fn progress_from_fields(fields: &HashMap<String, String>) -> Result<TaskProgress, RenderError> {
    let status = fields
        .get("status")
        .and_then(|value| RenderStatus::parse(value))
        .ok_or(RenderError::UnknownHandle)?;
    let progress = fields
        .get("progress")
        .and_then(|value| value.parse::<u8>().ok())
        .map(|value| value.min(100));
    Ok(TaskProgress { status, progress })
}

/// Polls `handle` until it finishes, sleeping `initial` and doubling the delay
/// after every pending poll. Gives up once the accumulated wait exceeds `max_wait`.
pub(crate) async fn wait_for_completion(
    queue: &dyn RenderQueue,
    handle: &str,
    initial: Duration,
    max_wait: Duration,
) -> Result<Vec<u8>, RenderError> {
    let mut delay = initial;
    let mut waited = Duration::ZERO;

    loop {
        match queue.poll(handle).await?.status {
            RenderStatus::Done => return queue.fetch_result(handle).await,
            RenderStatus::Failed => return Err(RenderError::Failed),
            RenderStatus::Pending => {}
        }

        if waited >= max_wait {
            return Err(RenderError::Timeout);
        }
        tokio::time::sleep(delay).await;
        waited += delay;
        delay = delay.saturating_mul(2);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory queue whose jobs finish after a fixed number of polls.
    #[derive(Default)]
    pub(crate) struct FakeRenderQueue {
        pub(crate) polls_until_done: Option<u32>,
        pub(crate) fail: bool,
        jobs: Mutex<HashMap<String, (u32, Option<Vec<u8>>)>>,
    }

    impl FakeRenderQueue {
        pub(crate) fn finishing_after(polls: u32) -> Self {
            Self { polls_until_done: Some(polls), ..Self::default() }
        }

        pub(crate) fn failing() -> Self {
            Self { polls_until_done: Some(0), fail: true, ..Self::default() }
        }

        pub(crate) fn never_finishing() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl RenderQueue for FakeRenderQueue {
        async fn submit(
            &self,
            name: &str,
            _payload: &serde_json::Value,
        ) -> Result<String, RenderError> {
            let handle = Uuid::new_v4().to_string();
            let mut jobs = self.jobs.lock().map_err(|_| RenderError::Unavailable)?;
            jobs.insert(handle.clone(), (0, Some(name.as_bytes().to_vec())));
            Ok(handle)
        }

        async fn poll(&self, handle: &str) -> Result<TaskProgress, RenderError> {
            let mut jobs = self.jobs.lock().map_err(|_| RenderError::Unavailable)?;
            let (polls, _) = jobs.get_mut(handle).ok_or(RenderError::UnknownHandle)?;
            *polls += 1;

            let status = match self.polls_until_done {
                Some(limit) if *polls > limit && self.fail => RenderStatus::Failed,
                Some(limit) if *polls > limit => RenderStatus::Done,
                _ => RenderStatus::Pending,
            };
            Ok(TaskProgress { status, progress: None })
        }

        async fn fetch_result(&self, handle: &str) -> Result<Vec<u8>, RenderError> {
            let mut jobs = self.jobs.lock().map_err(|_| RenderError::Unavailable)?;
            let (_, result) = jobs.get_mut(handle).ok_or(RenderError::UnknownHandle)?;
            result.take().ok_or(RenderError::UnknownHandle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeRenderQueue;
    use super::*;

    const TINY: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn waits_until_done_then_consumes_result() {
        let queue = FakeRenderQueue::finishing_after(3);
        let handle = queue.submit("exam.zip", &serde_json::json!({})).await.unwrap();

        let bytes =
            wait_for_completion(&queue, &handle, TINY, Duration::from_secs(5)).await.unwrap();
        assert_eq!(bytes, b"exam.zip");

        assert!(matches!(
            queue.fetch_result(&handle).await,
            Err(RenderError::UnknownHandle)
        ));
    }

    #[tokio::test]
    async fn times_out_when_never_finished() {
        let queue = FakeRenderQueue::never_finishing();
        let handle = queue.submit("exam.zip", &serde_json::json!({})).await.unwrap();

        let err = wait_for_completion(&queue, &handle, TINY, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout));
    }

    #[tokio::test]
    async fn failed_job_is_reported() {
        let queue = FakeRenderQueue::failing();
        let handle = queue.submit("exam.pdf", &serde_json::json!({})).await.unwrap();

        let err = wait_for_completion(&queue, &handle, TINY, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Failed));
    }

    #[test]
    fn progress_parsed_from_status_hash() {
        let fields = HashMap::from([
            ("status".to_string(), "pending".to_string()),
            ("progress".to_string(), "42".to_string()),
        ]);
        let progress = progress_from_fields(&fields).unwrap();
        assert_eq!(progress, TaskProgress { status: RenderStatus::Pending, progress: Some(42) });

        assert!(matches!(
            progress_from_fields(&HashMap::new()),
            Err(RenderError::UnknownHandle)
        ));
    }

    #[tokio::test]
    async fn disconnected_redis_queue_is_unavailable() {
        let queue = RedisRenderQueue::new(
            RedisHandle::new("redis://127.0.0.1:1/0".to_string()),
            "exambank:render".to_string(),
        );
        assert!(matches!(
            queue.submit("exam.zip", &serde_json::json!({})).await,
            Err(RenderError::Unavailable)
        ));
        assert!(matches!(queue.poll("missing").await, Err(RenderError::Unavailable)));
    }
}
