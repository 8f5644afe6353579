//! Handlers for the `/classes` resource: CRUD for instructors/admins, the
//! weekly calendar view for students, and the per-occurrence roster.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use gymclass_core::error::CoreError;
use gymclass_core::schedule::{self, Weekday};
use gymclass_core::types::{DbId, Timestamp};
use gymclass_core::validation::forms;
use gymclass_db::models::gym_class::{ClassFilter, CreateGymClass, GymClass, UpdateGymClass};
use gymclass_db::models::reservation::Reservation;
use gymclass_db::repositories::{ClassRepo, ReservationRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireInstructor;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /classes`. `start_time` is the raw `HH:mm` string
/// so the composite validator sees exactly what the form submitted.
#[derive(Debug, Deserialize)]
pub struct CreateClassRequest {
    pub modality: String,
    /// Defaults to the caller. Only admins may assign another instructor.
    pub instructor_id: Option<DbId>,
    /// Day of the week, Sunday = 0 .. Saturday = 6.
    pub weekday: i16,
    pub start_time: String,
    pub duration_minutes: i32,
    pub capacity: i32,
    pub description: Option<String>,
}

/// Request body for `PUT /classes/{id}`. Only provided fields change.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateClassRequest {
    pub modality: Option<String>,
    pub weekday: Option<i16>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<i32>,
    pub capacity: Option<i32>,
    pub description: Option<String>,
}

/// Request body for `PATCH /classes/{id}/active`.
#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Query parameters for `GET /classes`.
#[derive(Debug, Deserialize)]
pub struct ClassListParams {
    pub modality: Option<String>,
    pub instructor_id: Option<DbId>,
    pub weekday: Option<i16>,
    pub is_active: Option<bool>,
}

/// Query parameters for `GET /classes/{id}/roster`.
#[derive(Debug, Deserialize)]
pub struct RosterParams {
    pub occurrence_at: Timestamp,
}

/// One calendar entry: the class plus its computed next occurrence.
#[derive(Debug, Serialize)]
pub struct ScheduleEntry {
    #[serde(flatten)]
    pub class: GymClass,
    pub weekday_name: &'static str,
    pub seats_left: i32,
    pub next_occurrence_at: Timestamp,
    /// "Today" / "Tomorrow" / `dd/MM/yyyy`.
    pub next_occurrence_label: String,
    pub duration_label: String,
}

// ---------------------------------------------------------------------------
// Read handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/classes
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ClassListParams>,
) -> AppResult<Json<DataResponse<Vec<GymClass>>>> {
    let filter = ClassFilter {
        modality: params.modality,
        instructor_id: params.instructor_id,
        weekday: params.weekday,
        is_active: params.is_active,
    };
    let classes = ClassRepo::list(&state.pool, &filter).await?;
    Ok(Json(DataResponse { data: classes }))
}

/// GET /api/v1/classes/schedule
///
/// The weekly calendar: active classes Monday-first, each with its next
/// concrete occurrence resolved against the current time.
pub async fn schedule(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<ScheduleEntry>>>> {
    let now = Utc::now();
    let today = now.date_naive();

    let classes = ClassRepo::list_active(&state.pool).await?;
    let mut entries = Vec::with_capacity(classes.len());
    for class in classes {
        let weekday = class_weekday(&class)?;
        let next = schedule::next_occurrence(weekday, class.start_time, now);
        entries.push(ScheduleEntry {
            weekday_name: weekday.name(),
            seats_left: class.seats_left(),
            next_occurrence_at: next,
            next_occurrence_label: schedule::format_relative_date(next.date_naive(), today),
            duration_label: schedule::format_duration(class.duration_minutes),
            class,
        });
    }

    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/classes/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<GymClass>> {
    let class = load_class(&state, id).await?;
    Ok(Json(class))
}

/// GET /api/v1/classes/{id}/roster?occurrence_at=
///
/// Everyone booked on one concrete occurrence (confirmed, attended, or
/// absent). Instructors see their own classes; admins see any.
pub async fn roster(
    State(state): State<AppState>,
    RequireInstructor(user): RequireInstructor,
    Path(id): Path<DbId>,
    Query(params): Query<RosterParams>,
) -> AppResult<Json<DataResponse<Vec<Reservation>>>> {
    let class = load_class(&state, id).await?;
    ensure_can_manage(&user, &class)?;

    let reservations =
        ReservationRepo::list_roster(&state.pool, id, params.occurrence_at).await?;
    Ok(Json(DataResponse { data: reservations }))
}

// ---------------------------------------------------------------------------
// Mutating handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/classes
pub async fn create(
    State(state): State<AppState>,
    RequireInstructor(user): RequireInstructor,
    Json(input): Json<CreateClassRequest>,
) -> AppResult<(StatusCode, Json<GymClass>)> {
    let report = forms::validate_class_form(
        &input.modality,
        &input.start_time,
        input.duration_minutes,
        input.capacity,
    );
    if !report.valid {
        return Err(AppError::Core(CoreError::Validation(report.message())));
    }

    if Weekday::from_index(input.weekday).is_none() {
        return Err(AppError::Core(CoreError::Validation(
            "Weekday must be between 0 (Sunday) and 6 (Saturday)".into(),
        )));
    }

    let start_time = schedule::parse_time(&input.start_time).ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "Start time must be in HH:mm format".into(),
        ))
    })?;

    // Instructors always own the classes they create; only admins may
    // schedule on behalf of someone else.
    let instructor_id = match input.instructor_id {
        Some(other) if user.is_admin() => other,
        Some(other) if other != user.user_id => {
            return Err(AppError::Core(CoreError::Forbidden(
                "Only admins can assign classes to another instructor".into(),
            )));
        }
        _ => user.user_id,
    };

    let class = ClassRepo::create(
        &state.pool,
        &CreateGymClass {
            modality: input.modality.trim().to_string(),
            instructor_id,
            weekday: input.weekday,
            start_time,
            duration_minutes: input.duration_minutes,
            capacity: input.capacity,
            description: input.description,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(class)))
}

/// PUT /api/v1/classes/{id}
///
/// Partial update. The merged result is validated with the same composite
/// rules as creation, so an edit cannot push a class out of bounds.
pub async fn update(
    State(state): State<AppState>,
    RequireInstructor(user): RequireInstructor,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateClassRequest>,
) -> AppResult<Json<GymClass>> {
    let current = load_class(&state, id).await?;
    ensure_can_manage(&user, &current)?;

    let modality = input.modality.unwrap_or_else(|| current.modality.clone());
    let start_time_str = input
        .start_time
        .unwrap_or_else(|| current.start_time.format("%H:%M").to_string());
    let duration_minutes = input.duration_minutes.unwrap_or(current.duration_minutes);
    let capacity = input.capacity.unwrap_or(current.capacity);

    let report =
        forms::validate_class_form(&modality, &start_time_str, duration_minutes, capacity);
    if !report.valid {
        return Err(AppError::Core(CoreError::Validation(report.message())));
    }

    if let Some(weekday) = input.weekday {
        if Weekday::from_index(weekday).is_none() {
            return Err(AppError::Core(CoreError::Validation(
                "Weekday must be between 0 (Sunday) and 6 (Saturday)".into(),
            )));
        }
    }

    // Shrinking capacity below the seats already taken would break the
    // occupied_seats invariant (and the table CHECK would reject it).
    if capacity < current.occupied_seats {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Capacity cannot drop below the {} seats already booked",
            current.occupied_seats
        ))));
    }

    let start_time = schedule::parse_time(&start_time_str).ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "Start time must be in HH:mm format".into(),
        ))
    })?;

    let updated = ClassRepo::update(
        &state.pool,
        id,
        &UpdateGymClass {
            modality: Some(modality),
            instructor_id: None,
            weekday: input.weekday,
            start_time: Some(start_time),
            duration_minutes: Some(duration_minutes),
            capacity: Some(capacity),
            description: input.description,
        },
    )
    .await?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "Class",
        id,
    }))?;

    Ok(Json(updated))
}

/// PATCH /api/v1/classes/{id}/active
pub async fn set_active(
    State(state): State<AppState>,
    RequireInstructor(user): RequireInstructor,
    Path(id): Path<DbId>,
    Json(input): Json<SetActiveRequest>,
) -> AppResult<Json<GymClass>> {
    let current = load_class(&state, id).await?;
    ensure_can_manage(&user, &current)?;

    let updated = ClassRepo::set_active(&state.pool, id, input.is_active)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Class",
            id,
        }))?;
    Ok(Json(updated))
}

/// DELETE /api/v1/classes/{id}
pub async fn delete(
    State(state): State<AppState>,
    RequireInstructor(user): RequireInstructor,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let current = load_class(&state, id).await?;
    ensure_can_manage(&user, &current)?;

    let deleted = ClassRepo::delete(&state.pool, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Class",
            id,
        }))
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

async fn load_class(state: &AppState, id: DbId) -> AppResult<GymClass> {
    ClassRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Class",
            id,
        }))
}

/// Instructors manage their own classes; admins manage any.
fn ensure_can_manage(user: &AuthUser, class: &GymClass) -> Result<(), AppError> {
    if user.is_admin() || class.instructor_id == user.user_id {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "You can only manage your own classes".into(),
        )))
    }
}

/// Decode the stored weekday index, surfacing schema drift as an internal
/// error.
pub(crate) fn class_weekday(class: &GymClass) -> Result<Weekday, AppError> {
    Weekday::from_index(class.weekday).ok_or_else(|| {
        AppError::Core(CoreError::Internal(format!(
            "class {} has invalid weekday {}",
            class.id, class.weekday
        )))
    })
}
