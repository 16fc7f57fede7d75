mod common;

use std::time::Duration;

use schoolboard::models::Attendee;
use schoolboard::services::RefreshScheduler;

#[tokio::test]
async fn test_scheduler_picks_up_missed_changes() {
    let api = common::FakeSchoolApi::new();
    api.seed_attendance(Attendee::Teacher(1), 1, "2024-01-01", 5, Some(9), "present");

    let (service, _) = common::attendance_service(api.clone());
    service.select(Attendee::Teacher(1)).await.unwrap();
    assert_eq!(service.snapshot().await.summary.total, 1);

    // A change the push channel never delivered
    api.seed_attendance(Attendee::Teacher(1), 2, "2024-01-02", 5, None, "absent");

    let scheduler = RefreshScheduler::new(service.clone(), 1);
    let handle = tokio::spawn(scheduler.start());
    tokio::time::sleep(Duration::from_millis(1500)).await;
    handle.abort();

    let snapshot = service.snapshot().await;
    assert_eq!(snapshot.summary.total, 2);
    assert_eq!(snapshot.summary.absent, 1);
}

#[tokio::test]
async fn test_scheduler_without_selection_is_idle() {
    let api = common::FakeSchoolApi::new();
    let (service, _) = common::attendance_service(api);

    let scheduler = RefreshScheduler::new(service.clone(), 1);
    let handle = tokio::spawn(scheduler.start());
    tokio::time::sleep(Duration::from_millis(1200)).await;
    handle.abort();

    let snapshot = service.snapshot().await;
    assert!(snapshot.selected.is_none());
    assert!(snapshot.records.is_empty());
}
