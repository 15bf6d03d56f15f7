use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use cron::Schedule;

use inventory_core::{models::MAX_DURATION_SECONDS, InventoryError, InventoryResult};

const EVERY_PREFIX: &str = "@every ";

/// 周期任务的调度表达式
///
/// 支持 `@every 1h30m` 形式的固定间隔、`@hourly`/`@daily` 等描述符，
/// 以及 5 段（自动补秒字段 `0`）、6 段和 7 段 cron 表达式。
#[derive(Debug, Clone)]
pub enum JobSchedule {
    Cron(Box<Schedule>),
    Every(Duration),
}

impl JobSchedule {
    pub fn parse(spec: &str) -> InventoryResult<Self> {
        let spec = spec.trim();
        let invalid = |message: String| InventoryError::InvalidSchedule {
            expr: spec.to_string(),
            message,
        };

        if let Some(interval) = spec.strip_prefix(EVERY_PREFIX) {
            let interval = parse_interval(interval.trim()).map_err(invalid)?;
            return Ok(JobSchedule::Every(interval));
        }

        let expr = if !spec.starts_with('@') && spec.split_whitespace().count() == 5 {
            format!("0 {spec}")
        } else {
            spec.to_string()
        };
        let schedule = Schedule::from_str(&expr).map_err(|e| invalid(e.to_string()))?;
        Ok(JobSchedule::Cron(Box::new(schedule)))
    }

    /// `from` 之后的下一次触发时间
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            JobSchedule::Cron(schedule) => schedule.after(&from).next(),
            JobSchedule::Every(interval) => Some(from + *interval),
        }
    }

    pub fn upcoming(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        let mut times = Vec::with_capacity(count);
        let mut cursor = from;
        while times.len() < count {
            match self.next_after(cursor) {
                Some(next) => {
                    times.push(next);
                    cursor = next;
                }
                None => break,
            }
        }
        times
    }
}

/// 验证调度表达式
pub fn validate_schedule(spec: &str) -> InventoryResult<()> {
    JobSchedule::parse(spec).map(|_| ())
}

/// 解析 `1h30m`、`45s`、`90m` 这类时长
fn parse_interval(text: &str) -> Result<Duration, String> {
    if text.is_empty() {
        return Err("缺少时间间隔".to_string());
    }

    let mut total = Duration::zero();
    let mut digits = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let value: i64 = digits
            .parse()
            .map_err(|_| format!("时间间隔格式错误: {text}"))?;
        digits.clear();
        let part = match ch {
            'h' => Duration::try_hours(value),
            'm' => Duration::try_minutes(value),
            's' => Duration::try_seconds(value),
            other => return Err(format!("不支持的时间单位: {other}")),
        };
        total = part
            .and_then(|part| total.checked_add(&part))
            .filter(|total| total.num_seconds() <= MAX_DURATION_SECONDS as i64)
            .ok_or_else(|| format!("时间间隔不能超过 {MAX_DURATION_SECONDS} 秒: {text}"))?;
    }
    if !digits.is_empty() {
        return Err(format!("时间间隔缺少单位: {text}"));
    }
    if total <= Duration::zero() {
        return Err("时间间隔必须大于0".to_string());
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_combinations() {
        assert_eq!(parse_interval("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_interval("1h30m").unwrap(), Duration::minutes(90));
        assert_eq!(parse_interval("2m15s").unwrap(), Duration::seconds(135));
        assert!(parse_interval("").is_err());
        assert!(parse_interval("10").is_err());
        assert!(parse_interval("5d").is_err());
        assert!(parse_interval("0s").is_err());
    }

    #[test]
    fn test_parse_interval_rejects_oversized_values() {
        assert!(parse_interval("9223372036854775807h").is_err());
        assert!(parse_interval("99999999999999999999s").is_err());
        assert!(parse_interval("87601h").is_err());
        assert_eq!(parse_interval("87600h").unwrap(), Duration::hours(87_600));
    }
}
