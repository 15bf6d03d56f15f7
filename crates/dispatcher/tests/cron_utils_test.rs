use chrono::{Duration, TimeZone, Timelike, Utc};
use inventory_core::InventoryError;
use inventory_dispatcher::cron_utils::{validate_schedule, JobSchedule};

#[test]
fn test_every_schedule_advances_by_interval() {
    let schedule = JobSchedule::parse("@every 1h").unwrap();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    assert_eq!(schedule.next_after(start), Some(start + Duration::hours(1)));
    assert_eq!(
        schedule.upcoming(start, 3),
        vec![
            start + Duration::hours(1),
            start + Duration::hours(2),
            start + Duration::hours(3)
        ]
    );
}

#[test]
fn test_five_field_cron_gets_seconds_prepended() {
    let schedule = JobSchedule::parse("*/15 * * * *").unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 7, 30).unwrap();
    let next = schedule.next_after(now).unwrap();
    assert_eq!((next.hour(), next.minute(), next.second()), (12, 15, 0));
}

#[test]
fn test_six_field_cron_and_descriptors() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap();

    let schedule = JobSchedule::parse("0 0 * * * *").unwrap();
    assert_eq!(schedule.next_after(now).unwrap().hour(), 13);

    let hourly = JobSchedule::parse("@hourly").unwrap();
    assert_eq!(hourly.next_after(now).unwrap().hour(), 13);

    let daily = JobSchedule::parse("@daily").unwrap();
    let next = daily.next_after(now).unwrap();
    assert_eq!((next.hour(), next.minute()), (0, 0));
}

#[test]
fn test_invalid_schedules_rejected() {
    for spec in ["", "invalid", "@every", "@every 3x", "0 0 0 32 * *"] {
        let err = validate_schedule(spec).unwrap_err();
        assert!(matches!(err, InventoryError::InvalidSchedule { .. }), "{spec}");
        assert!(err.is_fatal());
    }
}
