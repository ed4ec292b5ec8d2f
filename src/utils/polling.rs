//! 重试与轮询策略
//!
//! 把"最多试几次、隔多久、等多久"表达成数据而不是埋在控制流里。
//! 页面上的瞬时状态（元素尚未出现、引用已失效）在这里被吸收，
//! 只有预算耗尽才向上反映为明确的失败结局。

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// 重试策略：固定间隔，最多 `max_attempts` 次
///
/// 用于吸收元素失效这类瞬时故障，绝不会无限重试
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// 执行操作直到成功或次数耗尽，返回最后一次的错误
    ///
    /// 闭包收到当前是第几次尝试（从 1 开始），至少执行一次
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= attempts {
                        return Err(e);
                    }
                    attempt += 1;
                    sleep(self.backoff).await;
                }
            }
        }
    }
}

/// 轮询策略：固定间隔探测，直到出结果或超过限定时间
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// 反复探测直到返回 Some 或超时
    ///
    /// 第一次探测立即执行；超时返回 None，由调用方映射为
    /// 对应的超时错误。探测自身的瞬时失败应在探测闭包内吸收
    pub async fn run<T, F, Fut>(&self, mut probe: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(value) = probe().await {
                return Some(value);
            }
            if Instant::now() >= deadline {
                return None;
            }
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::assert_ok;

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_configured_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let calls = AtomicUsize::new(0);

        let result: Result<(), &str> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("元素已失效") }
            })
            .await;

        // 恰好 3 次，不多不少
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_stops_on_success() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let calls = AtomicUsize::new(0);

        let result: Result<usize, &str> = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt >= 2 {
                        Ok(attempt)
                    } else {
                        Err("元素已失效")
                    }
                }
            })
            .await;

        assert_ok!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_runs_at_least_once() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        let calls = AtomicUsize::new(0);

        let _: Result<(), &str> = policy
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("失败") }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_with_none() {
        let policy = PollPolicy::new(Duration::from_secs(10), Duration::from_secs(5));
        let calls = AtomicUsize::new(0);

        let result: Option<()> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { None }
            })
            .await;

        assert!(result.is_none());
        // t=0、t=5、t=10 各探测一次
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_first_hit() {
        let policy = PollPolicy::new(Duration::from_secs(600), Duration::from_secs(5));
        let calls = AtomicUsize::new(0);

        let result = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == 2 {
                        Some("100")
                    } else {
                        None
                    }
                }
            })
            .await;

        assert_eq!(result, Some("100"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
