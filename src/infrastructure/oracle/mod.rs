//! Synthesis oracle infrastructure: HTTP client, retry, rate limiting,
//! and prompt assembly.

pub mod openrouter;
pub mod prompts;
pub mod rate_limiter;
pub mod retry;

pub use openrouter::OpenRouterOracle;
pub use prompts::{build_prompt, strip_code_fences};
pub use rate_limiter::TokenBucketRateLimiter;
pub use retry::RetryPolicy;
