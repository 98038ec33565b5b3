//! 请求准入控制
//! 基于 governor 的 GCRA 令牌桶，突发容量固定为1，保证任意1秒滑动窗口内准入不超过 N 次

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorRateLimiter};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::error::{RswebscanError, RwsResult};

/// 全局请求限速器（所有组件共享同一个执行器时共享同一个限速器）
pub struct RateLimiter {
    inner: DefaultDirectRateLimiter,
    requests_per_second: u32,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> RwsResult<Self> {
        let rate = NonZeroU32::new(requests_per_second)
            .ok_or_else(|| RswebscanError::Config("限速必须大于0".to_string()))?;

        let period = Duration::from_secs(1) / rate.get();
        let quota = Quota::with_period(period)
            .ok_or_else(|| RswebscanError::Config(format!("限速过高：{}/秒", requests_per_second)))?
            .allow_burst(NonZeroU32::MIN);

        Ok(Self {
            inner: GovernorRateLimiter::direct(quota),
            requests_per_second,
        })
    }

    /// 等待准入（与重试退避时钟无关）
    pub async fn acquire(&self) {
        self.inner.until_ready().await;
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }
}
