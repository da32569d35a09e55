//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the plan REST API endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Handlers resolve the caller's identity from request extensions (set by
//! `require_auth`), default the working date to today at this outermost
//! boundary, and delegate to the core pipeline. Port errors are mapped onto
//! specific status codes here; internal detail never leaks to the client.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;
use wellness_core::domain::{DietAnswers, DraftProgram, TodayDietView, WorkoutAnswers};
use wellness_core::pipeline;
use wellness_core::ports::PortError;
use wellness_core::projection;

use crate::web::state::AppState;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_workout_handler,
        commit_workout_handler,
        refresh_diet_handler,
        get_diet_handler,
        get_program_handler,
        get_quota_handler,
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
    ),
    components(
        schemas(
            GenerateWorkoutRequest,
            GenerateWorkoutResponse,
            CommitWorkoutRequest,
            CommitWorkoutResponse,
            RefreshDietRequest,
            RefreshDietResponse,
            QuotaResponse,
            ErrorBody,
            crate::web::auth::SignupRequest,
            crate::web::auth::LoginRequest,
            crate::web::auth::AuthResponse,
        )
    ),
    tags(
        (name = "Plan Generation API", description = "AI plan generation, quota tracking, and plan projections.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct GenerateWorkoutRequest {
    #[schema(value_type = Object)]
    pub answers: WorkoutAnswers,
    /// Override for the working date; defaults to today (UTC).
    pub day_key: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateWorkoutResponse {
    #[schema(value_type = Object)]
    pub draft: DraftProgram,
    pub warnings: Vec<String>,
    pub remaining_regens: i32,
    pub max_regens: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct CommitWorkoutRequest {
    #[schema(value_type = Object)]
    pub draft: DraftProgram,
    pub day_key: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct CommitWorkoutResponse {
    pub ok: bool,
    pub program_id: Uuid,
    pub workouts_created: usize,
    pub exercises_created: usize,
    pub remaining_regens: i32,
    pub max_regens: i32,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct RefreshDietRequest {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub answers: DietAnswers,
}

#[derive(Serialize, ToSchema)]
pub struct RefreshDietResponse {
    pub ok: bool,
    pub diet_plan_id: Uuid,
    /// The committed plan, slot-keyed, as a GET with `scope=today` would
    /// return it.
    #[schema(value_type = Object)]
    pub plan: TodayDietView,
    pub meals_created: usize,
    pub ingredients_created: usize,
    pub warnings: Vec<String>,
    pub remaining_regens: i32,
    pub max_regens: i32,
}

#[derive(Serialize, ToSchema)]
pub struct QuotaResponse {
    pub used: i32,
    pub remaining_regens: i32,
    pub max_regens: i32,
}

/// The uniform error payload. Quota fields are present only on 429s.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_regens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_regens: Option<i32>,
}

#[derive(Deserialize)]
pub struct ScopeQuery {
    pub scope: Option<String>,
    pub day_key: Option<NaiveDate>,
}

type HandlerError = (StatusCode, Json<ErrorBody>);

fn plain_error(status: StatusCode, message: &str) -> HandlerError {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
            remaining_regens: None,
            max_regens: None,
        }),
    )
}

/// Maps a port error onto the response contract. Validation and quota
/// failures become specific statuses; persistence failures are logged with
/// context and surfaced opaquely.
fn port_error_response(context: &str, e: PortError) -> HandlerError {
    match e {
        PortError::QuotaExceeded { used, max } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody {
                error: "Daily regeneration limit reached".to_string(),
                remaining_regens: Some((max - used).max(0)),
                max_regens: Some(max),
            }),
        ),
        PortError::GenerationFailed(reason) => {
            error!("{context}: generation failed: {reason}");
            plain_error(
                StatusCode::BAD_GATEWAY,
                "Plan generation is temporarily unavailable, please try again",
            )
        }
        PortError::SchemaInvalid(violations) => {
            // Kept verbose on purpose: these logs drive prompt tuning.
            error!("{context}: draft failed validation: {}", violations.join("; "));
            plain_error(
                StatusCode::BAD_GATEWAY,
                "The generated plan was malformed, please try again",
            )
        }
        PortError::PartialWrite(detail) => {
            error!("{context}: commit did not complete: {detail}");
            plain_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Couldn't save your plan, please try again",
            )
        }
        PortError::NotFound(what) => plain_error(StatusCode::NOT_FOUND, &what),
        PortError::Unauthorized => plain_error(StatusCode::UNAUTHORIZED, "Unauthorized"),
        PortError::Unexpected(detail) => {
            error!("{context}: {detail}");
            plain_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred",
            )
        }
    }
}

fn require_self(auth_user: Uuid, path_user: Uuid) -> Result<(), HandlerError> {
    if auth_user == path_user {
        Ok(())
    } else {
        Err(plain_error(
            StatusCode::FORBIDDEN,
            "You may only operate on your own plans",
        ))
    }
}

fn resolve_day(day_key: Option<NaiveDate>) -> NaiveDate {
    day_key.unwrap_or_else(|| Utc::now().date_naive())
}

//=========================================================================================
// Plan Generation Handlers
//=========================================================================================

/// Generate a training-plan draft without committing it.
///
/// The daily quota is pre-checked (429 when exhausted) but not charged;
/// the charge happens on commit.
#[utoipa::path(
    post,
    path = "/ai/workout/generate",
    request_body = GenerateWorkoutRequest,
    responses(
        (status = 200, description = "Draft generated", body = GenerateWorkoutResponse),
        (status = 429, description = "Daily regeneration quota exhausted", body = ErrorBody),
        (status = 502, description = "Generation failed", body = ErrorBody)
    )
)]
pub async fn generate_workout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<GenerateWorkoutRequest>,
) -> Result<Json<GenerateWorkoutResponse>, HandlerError> {
    let day = resolve_day(req.day_key);
    let outcome = pipeline::draft_program(
        state.store.as_ref(),
        state.generator.as_ref(),
        user_id,
        &req.answers,
        day,
    )
    .await
    .map_err(|e| port_error_response("workout generate", e))?;

    if !outcome.warnings.is_empty() {
        warn!(
            "user {user_id} generated with degraded personalization: {}",
            outcome.warnings.join("; ")
        );
    }

    Ok(Json(GenerateWorkoutResponse {
        draft: outcome.draft,
        warnings: outcome.warnings,
        remaining_regens: outcome.quota.remaining(),
        max_regens: outcome.quota.max,
    }))
}

/// Validate and commit a previously generated training draft.
///
/// Charges one regeneration slot; the commit is atomic and the prior active
/// program survives any failure.
#[utoipa::path(
    post,
    path = "/program/workout/commit",
    request_body = CommitWorkoutRequest,
    responses(
        (status = 201, description = "Program committed", body = CommitWorkoutResponse),
        (status = 429, description = "Daily regeneration quota exhausted", body = ErrorBody),
        (status = 502, description = "Draft failed validation", body = ErrorBody),
        (status = 500, description = "Commit failed", body = ErrorBody)
    )
)]
pub async fn commit_workout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CommitWorkoutRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let day = resolve_day(req.day_key);
    let outcome = pipeline::commit_program_draft(state.store.as_ref(), user_id, req.draft, day)
        .await
        .map_err(|e| port_error_response("workout commit", e))?;

    Ok((
        StatusCode::CREATED,
        Json(CommitWorkoutResponse {
            ok: true,
            program_id: outcome.commit.program_id,
            workouts_created: outcome.commit.workouts_created,
            exercises_created: outcome.commit.exercises_created,
            remaining_regens: outcome.quota.remaining(),
            max_regens: outcome.quota.max,
        }),
    ))
}

/// Run the full diet pipeline: generate, validate, upsert-commit, and return
/// the committed plan.
#[utoipa::path(
    post,
    path = "/users/{id}/diet/refresh",
    request_body = RefreshDietRequest,
    params(
        ("id" = Uuid, Path, description = "Target user id (must match the caller)"),
        ("day_key" = Option<NaiveDate>, Query, description = "Working date; defaults to today (UTC)")
    ),
    responses(
        (status = 201, description = "Diet plan refreshed", body = RefreshDietResponse),
        (status = 403, description = "Caller is not the target user", body = ErrorBody),
        (status = 429, description = "Daily regeneration quota exhausted", body = ErrorBody)
    )
)]
pub async fn refresh_diet_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<Uuid>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ScopeQuery>,
    Json(req): Json<RefreshDietRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    require_self(auth_user, user_id)?;
    let day = resolve_day(query.day_key);

    let outcome = pipeline::regenerate_diet(
        state.store.as_ref(),
        state.generator.as_ref(),
        user_id,
        &req.answers,
        day,
    )
    .await
    .map_err(|e| port_error_response("diet refresh", e))?;

    Ok((
        StatusCode::CREATED,
        Json(RefreshDietResponse {
            ok: true,
            diet_plan_id: outcome.commit.diet_plan_id,
            plan: outcome.plan,
            meals_created: outcome.commit.meals_created,
            ingredients_created: outcome.commit.ingredients_created,
            warnings: outcome.warnings,
            remaining_regens: outcome.quota.remaining(),
            max_regens: outcome.quota.max,
        }),
    ))
}

//=========================================================================================
// Projection Handlers
//=========================================================================================

/// Read the committed diet plan as a "today" (slot-keyed meals) or "week"
/// (shopping list) projection.
#[utoipa::path(
    get,
    path = "/users/{id}/diet",
    params(
        ("id" = Uuid, Path, description = "Target user id (must match the caller)"),
        ("scope" = Option<String>, Query, description = "today | week (default today)")
    ),
    responses(
        (status = 200, description = "Diet projection"),
        (status = 404, description = "No diet plan committed yet", body = ErrorBody)
    )
)]
pub async fn get_diet_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<Uuid>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    require_self(auth_user, user_id)?;

    let (plan, meals) = state
        .store
        .get_diet_plan(user_id)
        .await
        .map_err(|e| port_error_response("diet read", e))?;

    match query.scope.as_deref().unwrap_or("today") {
        "week" => Ok(Json(projection::project_shopping_list(&meals)).into_response()),
        "today" => Ok(Json(projection::project_diet_today(&plan, &meals)).into_response()),
        other => Err(plain_error(
            StatusCode::BAD_REQUEST,
            &format!("Unknown scope '{other}', expected 'today' or 'week'"),
        )),
    }
}

/// Read the active training program as a "today" or "week" projection.
#[utoipa::path(
    get,
    path = "/users/{id}/program",
    params(
        ("id" = Uuid, Path, description = "Target user id (must match the caller)"),
        ("scope" = Option<String>, Query, description = "today | week (default today)"),
        ("day_key" = Option<NaiveDate>, Query, description = "Working date; defaults to today (UTC)")
    ),
    responses(
        (status = 200, description = "Program projection"),
        (status = 404, description = "No active program", body = ErrorBody)
    )
)]
pub async fn get_program_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<Uuid>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ScopeQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    require_self(auth_user, user_id)?;
    let day = resolve_day(query.day_key);

    let (program, assignment) = state
        .store
        .get_active_program(user_id)
        .await
        .map_err(|e| port_error_response("program read", e))?;
    let workouts = state
        .store
        .get_program_workouts(program.id)
        .await
        .map_err(|e| port_error_response("program read", e))?;

    match query.scope.as_deref().unwrap_or("today") {
        "week" => Ok(
            Json(projection::project_week(&program, &assignment, &workouts, day)).into_response(),
        ),
        "today" => {
            let view = projection::project_today(&program, &assignment, &workouts, day)
                .map_err(|e| port_error_response("program read", e))?;
            Ok(Json(view).into_response())
        }
        other => Err(plain_error(
            StatusCode::BAD_REQUEST,
            &format!("Unknown scope '{other}', expected 'today' or 'week'"),
        )),
    }
}

/// Read the caller's regeneration quota for a date.
#[utoipa::path(
    get,
    path = "/users/{id}/quota",
    params(
        ("id" = Uuid, Path, description = "Target user id (must match the caller)"),
        ("day_key" = Option<NaiveDate>, Query, description = "Date; defaults to today (UTC)")
    ),
    responses(
        (status = 200, description = "Quota status", body = QuotaResponse)
    )
)]
pub async fn get_quota_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<Uuid>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<QuotaResponse>, HandlerError> {
    require_self(auth_user, user_id)?;
    let day = resolve_day(query.day_key);

    let quota = state
        .store
        .quota_status(user_id, day)
        .await
        .map_err(|e| port_error_response("quota read", e))?;

    Ok(Json(QuotaResponse {
        used: quota.used,
        remaining_regens: quota.remaining(),
        max_regens: quota.max,
    }))
}
