//! HTTP执行层：重试、限速、响应快照
pub mod retry;
pub mod rate_limit;
pub mod response;
pub mod executor;

pub use self::retry::RetryPolicy;
pub use self::rate_limit::RateLimiter;
pub use self::response::{HttpResponse, SetCookie};
pub use self::executor::{RequestExecutor, RequestOptions};

pub use reqwest::Method;
