//! Login, token refresh and password change

use axum::{extract::State, Extension};
use backoffice_auth::{
    check_password_policy, hash_password, verify_password, JwtClaims, JwtValidator,
};
use backoffice_db::entities::{resource, role, role_resource, user};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::extract::ValidJson;
use crate::handlers::format_local;
use crate::middleware::AuthUser;
use crate::models::{
    Ack, ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, TokenResponse,
    UserInfo,
};
use crate::response::{ok, ApiError, ApiResult, ErrorResponse};
use crate::AppState;

const BAD_CREDENTIALS: &str = "invalid username or password";

/// Sign a session token for `user`, returning it with its lifetime in seconds.
pub(crate) fn issue_token(state: &AppState, user: &user::Model) -> Result<(String, i64), ApiError> {
    let claims = JwtClaims::new(
        user.id,
        user.username.clone(),
        state.jwt_issuer.clone(),
        state.token_ttl,
    );
    let token = JwtValidator::encode(state.jwt_secret.as_bytes(), &claims)
        .map_err(|e| ApiError::Internal(format!("failed to sign token: {}", e)))?;

    Ok((token, state.token_ttl.num_seconds()))
}

/// Role codes and permission codes granted to `user`.
async fn roles_and_permissions(
    db: &DatabaseConnection,
    user: &user::Model,
) -> Result<(Vec<String>, Vec<String>), ApiError> {
    let roles = user
        .find_related(role::Entity)
        .order_by_asc(role::Column::Id)
        .all(db)
        .await?;

    let role_ids: Vec<i32> = roles
        .iter()
        .filter(|role| role.status == 1)
        .map(|role| role.id)
        .collect();

    let mut permissions = Vec::new();
    if !role_ids.is_empty() {
        let resource_ids: Vec<i32> = role_resource::Entity::find()
            .filter(role_resource::Column::RoleId.is_in(role_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|link| link.resource_id)
            .collect();

        if !resource_ids.is_empty() {
            permissions = resource::Entity::find()
                .filter(resource::Column::Id.is_in(resource_ids))
                .filter(resource::Column::Status.eq(1))
                .order_by_asc(resource::Column::PermissionCode)
                .all(db)
                .await?
                .into_iter()
                .map(|resource| resource.permission_code)
                .collect();
        }
    }

    let role_codes = roles.into_iter().map(|role| role.role_code).collect();
    Ok((role_codes, permissions))
}

async fn user_info(state: &AppState, user: &user::Model) -> Result<UserInfo, ApiError> {
    let (roles, permissions) = roles_and_permissions(&state.db, user).await?;

    Ok(UserInfo {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        nickname: user.nickname.clone(),
        roles,
        permissions,
        created_at: format_local(user.created_at, &state.timezone),
        updated_at: format_local(user.updated_at, &state.timezone),
    })
}

async fn find_user(db: &DatabaseConnection, id: i32) -> Result<user::Model, ApiError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))
}

/// Log in with username and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let user = user::Entity::find()
        .filter(user::Column::Username.eq(req.username.as_str()))
        .one(&state.db)
        .await?;

    let Some(user) = user else {
        debug!("Login for unknown user {}", req.username);
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    };

    if !verify_password(&req.password, &user.password_hash)? {
        debug!("Wrong password for {}", user.username);
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    if user.status != 1 {
        return Err(ApiError::unauthorized("account is disabled"));
    }

    let (token, expires_in) = issue_token(&state, &user)?;
    let user_info = user_info(&state, &user).await?;

    info!("User {} logged in", user.username);

    ok(LoginResponse {
        token,
        user_info,
        expires_in,
    })
}

/// Log out (tokens are stateless; the client discards its copy)
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = Ack)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(Extension(user): Extension<AuthUser>) -> ApiResult<Ack> {
    debug!("User {} logged out", user.username);
    ok(Ack::new())
}

/// Get the signed-in user
#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<UserInfo> {
    let user = find_user(&state.db, auth.user_id).await?;
    ok(user_info(&state, &user).await?)
}

/// Exchange a valid token for a fresh one
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token issued", body = TokenResponse),
        (status = 401, description = "Token invalid or expired", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RefreshRequest>,
) -> ApiResult<TokenResponse> {
    let claims = state
        .validator
        .validate(req.token.trim())
        .map_err(|_| ApiError::unauthorized("invalid or expired token"))?;

    let user = user::Entity::find_by_id(claims.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::unauthorized("user not found"))?;

    let (token, expires_in) = issue_token(&state, &user)?;
    ok(TokenResponse { token, expires_in })
}

/// Change the signed-in user's password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = Ack),
        (status = 400, description = "Old password wrong or new password too short", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> ApiResult<Ack> {
    check_password_policy(&req.new_password)?;

    let user = find_user(&state.db, auth.user_id).await?;
    if !verify_password(&req.old_password, &user.password_hash)? {
        return Err(ApiError::bad_request("old password is incorrect"));
    }

    let password_hash = hash_password(&req.new_password)?;
    let username = user.username.clone();

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.updated_at = Set(Utc::now());
    active.update(&state.db).await?;

    info!("User {} changed password", username);
    ok(Ack::new())
}
