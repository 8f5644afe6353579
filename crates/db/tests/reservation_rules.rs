//! Integration tests for the reservation rule engine: capacity accounting,
//! the per-student cap, duplicate rejection, the cancellation window, and
//! attendance bookkeeping.

use std::sync::atomic::{AtomicU32, Ordering};

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, NaiveTime};
use sqlx::PgPool;

use gymclass_core::booking::ReservationStatus;
use gymclass_core::error::CoreError;
use gymclass_core::roles::{ROLE_INSTRUCTOR, ROLE_STUDENT};
use gymclass_core::rules::MAX_ACTIVE_RESERVATIONS;
use gymclass_core::schedule;
use gymclass_core::types::{DbId, Timestamp};
use gymclass_db::error::RepoError;
use gymclass_db::models::gym_class::CreateGymClass;
use gymclass_db::models::reservation::{CreateReservation, ReservationFilter};
use gymclass_db::models::user::CreateUser;
use gymclass_db::repositories::{ClassRepo, ReservationRepo, RoleRepo, UserRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, role: &str, email: &str) -> DbId {
    let role = RoleRepo::find_by_name(pool, role)
        .await
        .unwrap()
        .expect("role is seeded");
    let user = UserRepo::create(
        pool,
        &CreateUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$test-hash".to_string(),
            role_id: role.id,
        },
    )
    .await
    .unwrap();
    user.id
}

/// Monotonic suffix so every seeded instructor gets a unique email, even
/// when one test seeds several classes.
static CLASS_SEQ: AtomicU32 = AtomicU32::new(0);

async fn seed_class(pool: &PgPool, capacity: i32) -> DbId {
    let seq = CLASS_SEQ.fetch_add(1, Ordering::Relaxed);
    let instructor = seed_user(pool, ROLE_INSTRUCTOR, &format!("instructor{seq}@test.com")).await;
    let class = ClassRepo::create(
        pool,
        &CreateGymClass {
            modality: "Yoga".to_string(),
            instructor_id: instructor,
            weekday: 1,
            start_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            duration_minutes: 60,
            capacity,
            description: None,
        },
    )
    .await
    .unwrap();
    class.id
}

/// A fixed Monday-evening occurrence, far enough out that the cancel
/// window never interferes unless a test wants it to.
fn occurrence() -> Timestamp {
    schedule::combine_date_and_time(
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    )
}

fn booking(class_id: DbId, student_id: DbId) -> CreateReservation {
    CreateReservation {
        class_id,
        student_id,
        occurrence_at: occurrence(),
    }
}

async fn occupied_seats(pool: &PgPool, class_id: DbId) -> i32 {
    ClassRepo::find_by_id(pool, class_id)
        .await
        .unwrap()
        .expect("class exists")
        .occupied_seats
}

async fn confirmed_count(pool: &PgPool, class_id: DbId) -> i64 {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM reservations WHERE class_id = $1 AND status = 'confirmed'",
    )
    .bind(class_id)
    .fetch_one(pool)
    .await
    .unwrap();
    count
}

/// The capacity invariant at a quiescent point: the denormalized counter
/// equals the live count of confirmed reservations.
async fn assert_counter_consistent(pool: &PgPool, class_id: DbId) {
    assert_eq!(
        i64::from(occupied_seats(pool, class_id).await),
        confirmed_count(pool, class_id).await,
    );
}

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_fills_to_capacity_and_frees_on_cancel(pool: PgPool) {
    // End-to-end: capacity 10, book 10 students, the 11th fails, one
    // cancellation frees a seat, the 11th retried succeeds.
    let class = seed_class(&pool, 10).await;

    let mut reservations = Vec::new();
    for n in 0..10 {
        let student = seed_user(&pool, ROLE_STUDENT, &format!("s{n}@test.com")).await;
        let reservation = ReservationRepo::book(&pool, &booking(class, student))
            .await
            .unwrap();
        assert_eq!(reservation.status, "confirmed");
        reservations.push(reservation);
    }
    assert_eq!(occupied_seats(&pool, class).await, 10);
    assert_counter_consistent(&pool, class).await;

    let eleventh = seed_user(&pool, ROLE_STUDENT, "s10@test.com").await;
    let err = ReservationRepo::book(&pool, &booking(class, eleventh))
        .await
        .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::ClassFull));
    assert_eq!(occupied_seats(&pool, class).await, 10);

    // Cancel well outside the lead-time window.
    let now = occurrence() - Duration::days(1);
    ReservationRepo::cancel(&pool, reservations[0].id, None, now)
        .await
        .unwrap();
    assert_eq!(occupied_seats(&pool, class).await, 9);

    let retried = ReservationRepo::book(&pool, &booking(class, eleventh))
        .await
        .unwrap();
    assert_eq!(retried.status, "confirmed");
    assert_eq!(occupied_seats(&pool, class).await, 10);
    assert_counter_consistent(&pool, class).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn student_cap_blocks_the_fourth_booking(pool: PgPool) {
    let student = seed_user(&pool, ROLE_STUDENT, "s@test.com").await;
    let mut reservations = Vec::new();
    let mut classes = Vec::new();
    for capacity in [10, 11, 12, 13] {
        classes.push(seed_class(&pool, capacity).await);
    }

    for class in &classes[..3] {
        reservations.push(
            ReservationRepo::book(&pool, &booking(*class, student))
                .await
                .unwrap(),
        );
    }

    // At the cap: a fourth booking fails regardless of which class, and
    // writes nothing.
    let err = ReservationRepo::book(&pool, &booking(classes[3], student))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        RepoError::Core(CoreError::ReservationLimitReached { max }) if max == MAX_ACTIVE_RESERVATIONS
    );
    assert_eq!(occupied_seats(&pool, classes[3]).await, 0);

    // Cancelling any one of the three makes room for one more.
    let now = occurrence() - Duration::days(1);
    ReservationRepo::cancel(&pool, reservations[1].id, None, now)
        .await
        .unwrap();
    ReservationRepo::book(&pool, &booking(classes[3], student))
        .await
        .unwrap();

    let active = ReservationRepo::list_active_for_student(&pool, student)
        .await
        .unwrap();
    assert_eq!(active.len(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_booking_is_rejected_until_cancelled(pool: PgPool) {
    let class = seed_class(&pool, 10).await;
    let student = seed_user(&pool, ROLE_STUDENT, "s@test.com").await;

    let first = ReservationRepo::book(&pool, &booking(class, student))
        .await
        .unwrap();

    let err = ReservationRepo::book(&pool, &booking(class, student))
        .await
        .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::DuplicateReservation));
    assert_eq!(occupied_seats(&pool, class).await, 1);

    // After cancelling, rebooking the same occurrence succeeds.
    let now = occurrence() - Duration::days(1);
    ReservationRepo::cancel(&pool, first.id, None, now)
        .await
        .unwrap();
    ReservationRepo::book(&pool, &booking(class, student))
        .await
        .unwrap();
    assert_eq!(occupied_seats(&pool, class).await, 1);
    assert_counter_consistent(&pool, class).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn booking_rejects_missing_and_inactive_classes(pool: PgPool) {
    let student = seed_user(&pool, ROLE_STUDENT, "s@test.com").await;

    let err = ReservationRepo::book(&pool, &booking(9999, student))
        .await
        .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::NotFound { entity: "Class", .. }));

    let class = seed_class(&pool, 10).await;
    ClassRepo::set_active(&pool, class, false).await.unwrap();
    let err = ReservationRepo::book(&pool, &booking(class, student))
        .await
        .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::Conflict(_)));
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancellation_window_boundary(pool: PgPool) {
    let class = seed_class(&pool, 10).await;
    let student = seed_user(&pool, ROLE_STUDENT, "s@test.com").await;
    let reservation = ReservationRepo::book(&pool, &booking(class, student))
        .await
        .unwrap();

    // One second inside the window: rejected, nothing changes.
    let too_late = occurrence() - Duration::hours(2) + Duration::seconds(1);
    let err = ReservationRepo::cancel(&pool, reservation.id, None, too_late)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        RepoError::Core(CoreError::CancellationWindowClosed { hours: 2 })
    );
    assert_eq!(occupied_seats(&pool, class).await, 1);

    // Exactly two hours ahead: allowed (closed inequality).
    let on_boundary = occurrence() - Duration::hours(2);
    let cancelled = ReservationRepo::cancel(&pool, reservation.id, None, on_boundary)
        .await
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("cancelled by student")
    );
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(occupied_seats(&pool, class).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelling_twice_does_not_double_decrement(pool: PgPool) {
    let class = seed_class(&pool, 10).await;
    let s1 = seed_user(&pool, ROLE_STUDENT, "s1@test.com").await;
    let s2 = seed_user(&pool, ROLE_STUDENT, "s2@test.com").await;
    let target = ReservationRepo::book(&pool, &booking(class, s1)).await.unwrap();
    ReservationRepo::book(&pool, &booking(class, s2)).await.unwrap();
    assert_eq!(occupied_seats(&pool, class).await, 2);

    let now = occurrence() - Duration::days(1);
    ReservationRepo::cancel(&pool, target.id, Some("travelling"), now)
        .await
        .unwrap();
    assert_eq!(occupied_seats(&pool, class).await, 1);

    // Second cancel is a no-op: same row back, counter untouched.
    let repeat = ReservationRepo::cancel(&pool, target.id, None, now)
        .await
        .unwrap();
    assert_eq!(repeat.status, "cancelled");
    assert_eq!(repeat.cancellation_reason.as_deref(), Some("travelling"));
    assert_eq!(occupied_seats(&pool, class).await, 1);
    assert_counter_consistent(&pool, class).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unrestricted_cancel_ignores_the_window(pool: PgPool) {
    let class = seed_class(&pool, 10).await;
    let student = seed_user(&pool, ROLE_STUDENT, "s@test.com").await;
    let reservation = ReservationRepo::book(&pool, &booking(class, student))
        .await
        .unwrap();

    let cancelled = ReservationRepo::cancel_unrestricted(&pool, reservation.id, Some("class removed"))
        .await
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(occupied_seats(&pool, class).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_missing_reservation_is_not_found(pool: PgPool) {
    let err = ReservationRepo::cancel_unrestricted(&pool, 9999, None)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        RepoError::Core(CoreError::NotFound { entity: "Reservation", .. })
    );
}

// ---------------------------------------------------------------------------
// Attendance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn attendance_marks_confirmed_reservations_only(pool: PgPool) {
    let class = seed_class(&pool, 10).await;
    let student = seed_user(&pool, ROLE_STUDENT, "s@test.com").await;
    let reservation = ReservationRepo::book(&pool, &booking(class, student))
        .await
        .unwrap();

    let marked = ReservationRepo::mark_attendance(&pool, reservation.id, ReservationStatus::Attended)
        .await
        .unwrap();
    assert_eq!(marked.status, "attended");
    // Attendance does not touch the seat counter.
    assert_eq!(occupied_seats(&pool, class).await, 1);

    // Terminal: marking again is rejected.
    let err = ReservationRepo::mark_attendance(&pool, reservation.id, ReservationStatus::Absent)
        .await
        .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::Conflict(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn attendance_rejects_cancelled_reservations(pool: PgPool) {
    let class = seed_class(&pool, 10).await;
    let student = seed_user(&pool, ROLE_STUDENT, "s@test.com").await;
    let reservation = ReservationRepo::book(&pool, &booking(class, student))
        .await
        .unwrap();
    ReservationRepo::cancel_unrestricted(&pool, reservation.id, None)
        .await
        .unwrap();

    let err = ReservationRepo::mark_attendance(&pool, reservation.id, ReservationStatus::Attended)
        .await
        .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::Conflict(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn attendance_accepts_only_attendance_statuses(pool: PgPool) {
    let class = seed_class(&pool, 10).await;
    let student = seed_user(&pool, ROLE_STUDENT, "s@test.com").await;
    let reservation = ReservationRepo::book(&pool, &booking(class, student))
        .await
        .unwrap();

    let err = ReservationRepo::mark_attendance(&pool, reservation.id, ReservationStatus::Cancelled)
        .await
        .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Reads and statistics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn history_and_counts_track_the_lifecycle(pool: PgPool) {
    let student = seed_user(&pool, ROLE_STUDENT, "s@test.com").await;
    let now = occurrence() - Duration::days(1);

    // Four settled reservations: 3 attended, 1 absent; plus one cancelled.
    let mut settled = Vec::new();
    for n in 0..5 {
        let class = seed_class(&pool, 10).await;
        let reservation = ReservationRepo::book(
            &pool,
            &CreateReservation {
                class_id: class,
                student_id: student,
                occurrence_at: occurrence() + Duration::days(n),
            },
        )
        .await
        .unwrap();
        settled.push(reservation);
        // Stay under the active cap while seeding.
        if n < 3 {
            ReservationRepo::mark_attendance(&pool, settled[n as usize].id, ReservationStatus::Attended)
                .await
                .unwrap();
        } else if n == 3 {
            ReservationRepo::mark_attendance(&pool, settled[3].id, ReservationStatus::Absent)
                .await
                .unwrap();
        } else {
            ReservationRepo::cancel(&pool, settled[4].id, None, now).await.unwrap();
        }
    }

    let counts = ReservationRepo::count_by_status(&pool, student).await.unwrap();
    assert_eq!(counts.total, 5);
    assert_eq!(counts.confirmed, 0);
    assert_eq!(counts.attended, 3);
    assert_eq!(counts.absent, 1);
    assert_eq!(counts.cancelled, 1);

    // 3 attended / (3 + 1) = 75%, cancellations excluded.
    let rate = ReservationRepo::attendance_rate_for_student(&pool, student)
        .await
        .unwrap();
    assert_eq!(rate, 75);

    // History is newest-first and capped.
    let history = ReservationRepo::list_history_for_student(&pool, student, 10)
        .await
        .unwrap();
    assert_eq!(history.len(), 5);
    assert!(history
        .windows(2)
        .all(|w| w[0].occurrence_at >= w[1].occurrence_at));

    let capped = ReservationRepo::list_history_for_student(&pool, student, 2)
        .await
        .unwrap();
    assert_eq!(capped.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn roster_lists_everyone_who_did_not_cancel(pool: PgPool) {
    let class = seed_class(&pool, 10).await;
    let s1 = seed_user(&pool, ROLE_STUDENT, "s1@test.com").await;
    let s2 = seed_user(&pool, ROLE_STUDENT, "s2@test.com").await;
    let s3 = seed_user(&pool, ROLE_STUDENT, "s3@test.com").await;

    let r1 = ReservationRepo::book(&pool, &booking(class, s1)).await.unwrap();
    let r2 = ReservationRepo::book(&pool, &booking(class, s2)).await.unwrap();
    ReservationRepo::book(&pool, &booking(class, s3)).await.unwrap();

    ReservationRepo::mark_attendance(&pool, r1.id, ReservationStatus::Attended)
        .await
        .unwrap();
    ReservationRepo::cancel_unrestricted(&pool, r2.id, None).await.unwrap();

    let roster = ReservationRepo::list_roster(&pool, class, occurrence())
        .await
        .unwrap();
    let students: Vec<_> = roster.iter().map(|r| r.student_id).collect();
    assert_eq!(students, vec![s1, s3]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_by_student_class_and_status(pool: PgPool) {
    let class_a = seed_class(&pool, 10).await;
    let class_b = seed_class(&pool, 11).await;
    let s1 = seed_user(&pool, ROLE_STUDENT, "s1@test.com").await;
    let s2 = seed_user(&pool, ROLE_STUDENT, "s2@test.com").await;

    let r1 = ReservationRepo::book(&pool, &booking(class_a, s1)).await.unwrap();
    ReservationRepo::book(&pool, &booking(class_b, s1)).await.unwrap();
    ReservationRepo::book(&pool, &booking(class_a, s2)).await.unwrap();
    ReservationRepo::cancel_unrestricted(&pool, r1.id, None).await.unwrap();

    let for_s1 = ReservationRepo::list(
        &pool,
        &ReservationFilter {
            student_id: Some(s1),
            ..ReservationFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(for_s1.len(), 2);

    let cancelled_in_a = ReservationRepo::list(
        &pool,
        &ReservationFilter {
            class_id: Some(class_a),
            status: Some(ReservationStatus::Cancelled),
            ..ReservationFilter::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(cancelled_in_a.len(), 1);
    assert_eq!(cancelled_in_a[0].id, r1.id);
}
