use std::time::Duration;

use inventory_core::config::RetryConfig;
use rand::Rng;

/// 第 `retried` 次重试前的等待时间：指数退避 + 按比例随机抖动
pub fn retry_delay(config: &RetryConfig, retried: u32) -> Duration {
    let base = config.backoff(retried);
    if config.jitter_factor <= 0.0 || base.is_zero() {
        return base;
    }
    let jitter = rand::rng().random_range(-config.jitter_factor..=config.jitter_factor);
    base.mul_f64((1.0 + jitter).max(0.0))
}
