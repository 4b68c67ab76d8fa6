use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use schedule_cell::models::{ClaimOutcome, ScheduleError, SetAvailabilityRequest};
use schedule_cell::services::schedule::ScheduleService;
use schedule_cell::store::{InMemoryScheduleStore, ScheduleStore};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn working_day(slots: &[&str]) -> SetAvailabilityRequest {
    SetAvailabilityRequest {
        slots: slots.iter().map(|s| s.to_string()).collect(),
        is_working_day: true,
        max_appointments: None,
    }
}

#[tokio::test]
async fn set_availability_creates_schedule_lazily() {
    let store = InMemoryScheduleStore::shared();
    let service = ScheduleService::new(store.clone());
    let doctor = Uuid::new_v4();
    let day = date(2030, 9, 1);

    let schedule = service
        .set_availability(doctor, day, working_day(&["10:00", "09:00"]))
        .await
        .unwrap();

    assert!(schedule.is_working_day);
    assert_eq!(schedule.max_appointments, 2);
    // Slots come back ordered by label.
    let labels: Vec<_> = schedule.slots.iter().map(|s| s.time.as_str()).collect();
    assert_eq!(labels, vec!["09:00", "10:00"]);

    let stored = store.find(doctor, day).await.unwrap().unwrap();
    assert_eq!(stored.slots.len(), 2);
}

#[tokio::test]
async fn set_availability_rejects_bad_labels() {
    let service = ScheduleService::new(InMemoryScheduleStore::shared());
    let doctor = Uuid::new_v4();
    let day = date(2030, 9, 1);

    let err = service
        .set_availability(doctor, day, working_day(&["9 o'clock"]))
        .await
        .unwrap_err();
    assert_matches!(err, ScheduleError::Validation(_));

    let err = service
        .set_availability(doctor, day, working_day(&["09:00", "09:00"]))
        .await
        .unwrap_err();
    assert_matches!(err, ScheduleError::Validation(_));

    let err = service
        .set_availability(doctor, day, working_day(&[]))
        .await
        .unwrap_err();
    assert_matches!(err, ScheduleError::Validation(_));
}

#[tokio::test]
async fn available_slots_empty_for_unknown_schedule_and_day_off() {
    let store = InMemoryScheduleStore::shared();
    let service = ScheduleService::new(store.clone());
    let doctor = Uuid::new_v4();
    let day = date(2030, 9, 1);

    assert!(service.available_slots(doctor, day).await.unwrap().is_empty());

    service
        .set_availability(
            doctor,
            day,
            SetAvailabilityRequest {
                slots: vec!["09:00".to_string()],
                is_working_day: false,
                max_appointments: None,
            },
        )
        .await
        .unwrap();

    assert!(service.available_slots(doctor, day).await.unwrap().is_empty());
}

#[tokio::test]
async fn claim_is_conditional_and_reports_exact_failure() {
    let store = InMemoryScheduleStore::shared();
    let service = ScheduleService::new(store.clone());
    let doctor = Uuid::new_v4();
    let day = date(2030, 9, 1);

    assert_eq!(
        store.claim_slot(doctor, day, "09:00").await.unwrap(),
        ClaimOutcome::ScheduleMissing
    );

    service
        .set_availability(doctor, day, working_day(&["09:00", "10:00"]))
        .await
        .unwrap();

    assert_eq!(
        store.claim_slot(doctor, day, "11:00").await.unwrap(),
        ClaimOutcome::UnknownSlot
    );
    assert_eq!(
        store.claim_slot(doctor, day, "09:00").await.unwrap(),
        ClaimOutcome::Claimed
    );
    // Second claim loses: the availability check and flip are one write.
    assert_eq!(
        store.claim_slot(doctor, day, "09:00").await.unwrap(),
        ClaimOutcome::SlotTaken
    );

    let schedule = store.find(doctor, day).await.unwrap().unwrap();
    assert!(!schedule.slot("09:00").unwrap().is_available);
    assert!(schedule.slot("10:00").unwrap().is_available);
}

#[tokio::test]
async fn claim_rejected_on_day_off() {
    let store = InMemoryScheduleStore::shared();
    let service = ScheduleService::new(store.clone());
    let doctor = Uuid::new_v4();
    let day = date(2030, 9, 2);

    service
        .set_availability(
            doctor,
            day,
            SetAvailabilityRequest {
                slots: vec!["09:00".to_string()],
                is_working_day: false,
                max_appointments: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(
        store.claim_slot(doctor, day, "09:00").await.unwrap(),
        ClaimOutcome::NotWorkingDay
    );
}

#[tokio::test]
async fn bind_records_back_reference_and_release_clears_it() {
    let store = InMemoryScheduleStore::shared();
    let service = ScheduleService::new(store.clone());
    let doctor = Uuid::new_v4();
    let day = date(2030, 9, 1);
    let appointment = Uuid::new_v4();

    service
        .set_availability(doctor, day, working_day(&["09:00"]))
        .await
        .unwrap();

    store.claim_slot(doctor, day, "09:00").await.unwrap();
    store.bind_slot(doctor, day, "09:00", appointment).await.unwrap();

    let schedule = store.find(doctor, day).await.unwrap().unwrap();
    let slot = schedule.slot("09:00").unwrap();
    assert!(!slot.is_available);
    assert_eq!(slot.appointment_id, Some(appointment));
    assert_eq!(schedule.booked_count(), 1);

    store.release_slot(doctor, day, "09:00").await.unwrap();
    let schedule = store.find(doctor, day).await.unwrap().unwrap();
    let slot = schedule.slot("09:00").unwrap();
    assert!(slot.is_available);
    assert_eq!(slot.appointment_id, None);
}

#[tokio::test]
async fn release_is_idempotent() {
    let store = InMemoryScheduleStore::shared();
    let service = ScheduleService::new(store.clone());
    let doctor = Uuid::new_v4();
    let day = date(2030, 9, 1);

    service
        .set_availability(doctor, day, working_day(&["09:00"]))
        .await
        .unwrap();

    store.claim_slot(doctor, day, "09:00").await.unwrap();
    store.release_slot(doctor, day, "09:00").await.unwrap();
    // Releasing an open slot, an unknown label, or an unknown schedule: no-op.
    store.release_slot(doctor, day, "09:00").await.unwrap();
    store.release_slot(doctor, day, "23:00").await.unwrap();
    store
        .release_slot(Uuid::new_v4(), day, "09:00")
        .await
        .unwrap();

    assert_eq!(
        store.claim_slot(doctor, day, "09:00").await.unwrap(),
        ClaimOutcome::Claimed
    );
}

#[tokio::test]
async fn bind_rejects_unclaimed_slot() {
    let store = InMemoryScheduleStore::shared();
    let service = ScheduleService::new(store.clone());
    let doctor = Uuid::new_v4();
    let day = date(2030, 9, 1);

    service
        .set_availability(doctor, day, working_day(&["09:00"]))
        .await
        .unwrap();

    let err = store
        .bind_slot(doctor, day, "09:00", Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ScheduleError::Storage(_));
}

#[tokio::test]
async fn updating_availability_keeps_booked_slots() {
    let store = InMemoryScheduleStore::shared();
    let service = ScheduleService::new(store.clone());
    let doctor = Uuid::new_v4();
    let day = date(2030, 9, 1);
    let appointment = Uuid::new_v4();

    service
        .set_availability(doctor, day, working_day(&["09:00", "10:00"]))
        .await
        .unwrap();
    store.claim_slot(doctor, day, "09:00").await.unwrap();
    store.bind_slot(doctor, day, "09:00", appointment).await.unwrap();

    // Extending the day keeps the claimed slot state.
    let schedule = service
        .set_availability(doctor, day, working_day(&["09:00", "10:00", "11:00"]))
        .await
        .unwrap();
    let slot = schedule.slot("09:00").unwrap();
    assert!(!slot.is_available);
    assert_eq!(slot.appointment_id, Some(appointment));

    // Dropping a booked slot is rejected.
    let err = service
        .set_availability(doctor, day, working_day(&["10:00", "11:00"]))
        .await
        .unwrap_err();
    assert_matches!(err, ScheduleError::Validation(_));
}
