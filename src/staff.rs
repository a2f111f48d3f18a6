use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::auth::{hash_password, permits, verify_password, SessionClaims};
use crate::error::ApiError;
use crate::model::{
    AuthUser, CurrentUser, ErrorBody, LoginBody, MessageBody, NewStaff, NewStaffForm, Role,
    StaffFilter, StaffSummary,
};
use crate::store::HotelStore;
use crate::validate::ValidatedForm;
use crate::STAFF_TAG;

/// expose the session endpoints to parent module
pub fn session_router() -> OpenApiRouter<crate::State> {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(logout))
        .routes(routes!(current_user))
}

/// expose the staff account endpoints to parent module
pub fn staff_router() -> OpenApiRouter<crate::State> {
    OpenApiRouter::new()
        .routes(routes!(register))
        .routes(routes!(list_staff))
        .routes(routes!(list_managers))
        .routes(routes!(list_receptionists))
}

/// Log in and receive a session cookie
#[utoipa::path(
    post,
    path = "/login",
    request_body = AuthUser,
    responses(
        (status = OK, body = LoginBody),
        (status = BAD_REQUEST, body = ErrorBody),
        (status = UNAUTHORIZED, body = ErrorBody)
    ),
    tag = STAFF_TAG
)]
async fn login(
    State(crate::State { store, keys, .. }): State<crate::State>,
    jar: CookieJar,
    ValidatedForm(user): ValidatedForm<AuthUser>,
) -> Result<(CookieJar, Json<LoginBody>), ApiError> {
    let staff = store
        .staff_by_username(&user.username)
        .await?
        .filter(|staff| verify_password(&user.password, &staff.password_hash));
    let Some(staff) = staff else {
        warn!(username = %user.username, "failed login");
        return Err(ApiError::InvalidCredentials);
    };

    let jar = keys.start_session(jar, &staff)?;
    info!(staff_id = staff.id, role = %staff.role, "logged in");
    Ok((
        jar,
        Json(LoginBody {
            message: "Login successful.".to_string(),
            role: staff.role,
        }),
    ))
}

/// Drop the session cookie
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = OK, body = MessageBody)),
    tag = STAFF_TAG
)]
async fn logout(
    State(crate::State { keys, .. }): State<crate::State>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageBody>) {
    (
        keys.end_session(jar),
        Json(MessageBody::new("Logged out successfully.")),
    )
}

/// Who is logged in
#[utoipa::path(
    get,
    path = "/user",
    responses((status = OK, body = CurrentUser), (status = UNAUTHORIZED, body = ErrorBody)),
    tag = STAFF_TAG,
    security(("session_cookie" = []))
)]
async fn current_user(claims: Option<SessionClaims>) -> Result<Json<CurrentUser>, ApiError> {
    let claims = claims.ok_or(ApiError::NotAuthenticated("Not logged in"))?;
    Ok(Json(CurrentUser {
        id: claims.sub,
        username: claims.username,
        role: claims.role,
    }))
}

/// Create a Manager or Receptionist account
///
/// Open to anonymous callers. A logged-in caller needs the `staff/create`
/// permission; a Manager registering a Receptionist becomes their manager.
#[utoipa::path(
    post,
    path = "/register",
    request_body = NewStaffForm,
    responses(
        (status = CREATED, body = MessageBody),
        (status = BAD_REQUEST, body = ErrorBody),
        (status = FORBIDDEN, body = ErrorBody)
    ),
    tag = STAFF_TAG
)]
async fn register(
    State(crate::State {
        store, enforcer, ..
    }): State<crate::State>,
    creator: Option<SessionClaims>,
    ValidatedForm(form): ValidatedForm<NewStaffForm>,
) -> Result<(StatusCode, Json<MessageBody>), ApiError> {
    let role = form
        .role
        .parse::<Role>()
        .ok()
        .filter(|role| matches!(role, Role::Manager | Role::Receptionist))
        .ok_or_else(|| {
            ApiError::Validation(
                "Invalid role selected. Allowed: Manager, Receptionist.".to_string(),
            )
        })?;

    if let Some(creator) = &creator {
        if !permits(&enforcer, creator.role, "staff", "create") {
            return Err(ApiError::Forbidden(format!(
                "{}s are not allowed to create staff accounts.",
                creator.role
            )));
        }
    }

    if store.staff_exists(&form.username, &form.email).await? {
        return Err(ApiError::Validation(
            "Username or email already exists.".to_string(),
        ));
    }

    let manager_id =
        assign_manager(store.as_ref(), role, creator.as_ref(), form.manager_id).await?;
    let password_hash = hash_password(&form.password)?;
    let staff_id = store
        .insert_staff(NewStaff {
            username: form.username,
            password_hash,
            role,
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
            manager_id,
        })
        .await?;

    info!(staff_id, role = %role, ?manager_id, "staff account created");
    Ok((
        StatusCode::CREATED,
        Json(MessageBody::new("Account created successfully.")),
    ))
}

/// Picks the manager a new account reports to. Only Receptionists have one.
async fn assign_manager(
    store: &dyn HotelStore,
    role: Role,
    creator: Option<&SessionClaims>,
    requested: Option<i32>,
) -> Result<Option<i32>, ApiError> {
    if role != Role::Receptionist {
        return Ok(None);
    }
    if let Some(manager) = creator.filter(|c| c.role == Role::Manager) {
        return Ok(Some(manager.sub));
    }
    let id = requested.ok_or_else(|| {
        ApiError::Validation("Manager selection is required for Receptionists.".to_string())
    })?;
    match store.staff_by_id(id).await? {
        Some(manager) if manager.role == Role::Manager => Ok(Some(manager.id)),
        _ => Err(ApiError::Validation("Invalid Manager ID.".to_string())),
    }
}

/// List every staff member
#[utoipa::path(
    get,
    path = "/staff",
    responses(
        (status = OK, body = Vec<StaffSummary>),
        (status = UNAUTHORIZED, body = ErrorBody),
        (status = FORBIDDEN, body = ErrorBody)
    ),
    tag = STAFF_TAG,
    security(("session_cookie" = []))
)]
async fn list_staff(
    claims: SessionClaims,
    State(crate::State {
        store, enforcer, ..
    }): State<crate::State>,
) -> Result<Json<Vec<StaffSummary>>, ApiError> {
    claims.authorize(&enforcer, "staff", "read")?;
    let staff = store.list_staff(StaffFilter::All).await?;
    Ok(Json(staff.into_iter().map(StaffSummary::from).collect()))
}

/// List managers (for the registration form)
#[utoipa::path(
    get,
    path = "/managers",
    responses((status = OK, body = Vec<StaffSummary>)),
    tag = STAFF_TAG
)]
async fn list_managers(
    State(crate::State { store, .. }): State<crate::State>,
) -> Result<Json<Vec<StaffSummary>>, ApiError> {
    let managers = store.list_staff(StaffFilter::Role(Role::Manager)).await?;
    Ok(Json(managers.into_iter().map(StaffSummary::from).collect()))
}

/// List receptionists; Managers only see their own team
#[utoipa::path(
    get,
    path = "/receptionists",
    responses(
        (status = OK, body = Vec<StaffSummary>),
        (status = UNAUTHORIZED, body = ErrorBody),
        (status = FORBIDDEN, body = ErrorBody)
    ),
    tag = STAFF_TAG,
    security(("session_cookie" = []))
)]
async fn list_receptionists(
    claims: SessionClaims,
    State(crate::State {
        store, enforcer, ..
    }): State<crate::State>,
) -> Result<Json<Vec<StaffSummary>>, ApiError> {
    claims.authorize(&enforcer, "receptionists", "read")?;
    let filter = match claims.role {
        Role::Admin => StaffFilter::Role(Role::Receptionist),
        _ => StaffFilter::ReceptionistsOf(claims.sub),
    };
    let receptionists = store.list_staff(filter).await?;
    Ok(Json(
        receptionists.into_iter().map(StaffSummary::from).collect(),
    ))
}
