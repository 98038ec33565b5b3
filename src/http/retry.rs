//! 重试策略
//! 仅在两次失败的尝试之间查询退避时长，首次尝试前从不等待

use rand::Rng;
use std::time::Duration;

// 指数退避的上限，防止大因子/大次数时溢出
const MAX_BACKOFF_SECS: f64 = 3600.0;

/// 重试策略
#[derive(Debug, Clone, PartialEq)]
pub enum RetryPolicy {
    /// 指数退避：第 n 次重试前等待 `factor^n` 秒（n 从 0 开始）
    Exponential { attempts: u32, factor: f64 },
    /// 随机退避：在 `[min, max]` 内均匀取值
    RandomUniform { attempts: u32, min: Duration, max: Duration },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Exponential {
            attempts: 3,
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn exponential(attempts: u32, factor: f64) -> Self {
        RetryPolicy::Exponential { attempts, factor }
    }

    pub fn random_uniform(attempts: u32, min: Duration, max: Duration) -> Self {
        RetryPolicy::RandomUniform { attempts, min, max }
    }

    /// 不重试
    pub fn never() -> Self {
        RetryPolicy::Exponential {
            attempts: 0,
            factor: 2.0,
        }
    }

    /// 重试次数（不含第一次），总尝试次数为 `attempts + 1`
    pub fn attempts(&self) -> u32 {
        match self {
            RetryPolicy::Exponential { attempts, .. } => *attempts,
            RetryPolicy::RandomUniform { attempts, .. } => *attempts,
        }
    }

    /// 第 `attempt` 次失败后（从 0 开始计数）的等待时长
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::Exponential { factor, .. } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = factor.powi(exponent);
                if secs.is_finite() && secs > 0.0 {
                    Duration::from_secs_f64(secs.min(MAX_BACKOFF_SECS))
                } else if secs.is_infinite() {
                    Duration::from_secs_f64(MAX_BACKOFF_SECS)
                } else {
                    Duration::ZERO
                }
            }
            RetryPolicy::RandomUniform { min, max, .. } => {
                if max <= min {
                    *min
                } else {
                    rand::thread_rng().gen_range(*min..=*max)
                }
            }
        }
    }
}
