pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use backoffice_access_log::{LogSender, LogStore};
use backoffice_auth::{JwtValidator, DEFAULT_TOKEN_HOURS};
use chrono::{FixedOffset, Offset, Utc};
use sea_orm::DatabaseConnection;
use std::{future::Future, net::SocketAddr, sync::Arc};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub logs: Arc<dyn LogStore>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl: chrono::Duration,
    pub validator: Arc<JwtValidator>,
    /// Zone for user-facing timestamps and time filters
    pub timezone: FixedOffset,
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Backoffice API",
        version = "0.1.0",
        description = "Admin back-office: accounts, permissions, reference data and HTTP access logs"
    ),
    paths(
        handlers::system::health_check,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::current_user,
        handlers::auth::refresh_token,
        handlers::auth::change_password,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,
        handlers::users::assign_roles,
        handlers::users::get_user_roles,
        handlers::roles::list_roles,
        handlers::roles::get_role,
        handlers::roles::create_role,
        handlers::roles::update_role,
        handlers::roles::delete_role,
        handlers::roles::batch_delete_roles,
        handlers::roles::get_role_permissions,
        handlers::roles::set_role_permissions,
        handlers::resources::list_resources,
        handlers::resources::resource_tree,
        handlers::resources::get_resource,
        handlers::resources::create_resource,
        handlers::resources::update_resource,
        handlers::resources::delete_resource,
        handlers::menus::menu_tree,
        handlers::menus::create_menu,
        handlers::menus::update_menu,
        handlers::menus::delete_menu,
        handlers::configs::list_configs,
        handlers::configs::get_config,
        handlers::configs::create_config,
        handlers::configs::update_config,
        handlers::configs::delete_config,
        handlers::school_admissions::list_school_admissions,
        handlers::school_admissions::get_school_admission,
        handlers::school_admissions::create_school_admission,
        handlers::school_admissions::update_school_admission,
        handlers::school_admissions::delete_school_admission,
        handlers::admission_plans::list_plans,
        handlers::admission_plans::get_plan,
        handlers::admission_plans::create_plan,
        handlers::admission_plans::update_plan,
        handlers::admission_plans::delete_plan,
        handlers::logs::list_logs,
        handlers::logs::get_log,
        handlers::logs::delete_log,
        handlers::logs::batch_delete_logs,
        handlers::logs::clean_logs,
        handlers::logs::export_logs,
    ),
    components(
        schemas(
            response::ErrorResponse,
            models::HealthResponse,
            models::Ack,
            models::IdsRequest,
            models::DeletedCount,
            models::LoginRequest,
            models::LoginResponse,
            models::UserInfo,
            models::RefreshRequest,
            models::TokenResponse,
            models::ChangePasswordRequest,
            models::User,
            models::CreateUserRequest,
            models::UpdateUserRequest,
            models::UserList,
            models::AssignRolesRequest,
            models::Role,
            models::CreateRoleRequest,
            models::UpdateRoleRequest,
            models::RoleList,
            models::RolePermissionsRequest,
            models::Resource,
            models::CreateResourceRequest,
            models::UpdateResourceRequest,
            models::ResourceList,
            models::Menu,
            models::MenuRequest,
            models::SysConfig,
            models::ConfigRequest,
            models::ConfigList,
            models::SchoolAdmission,
            models::SchoolAdmissionRequest,
            models::SchoolAdmissionList,
            models::AdmissionPlan,
            models::AdmissionPlanRequest,
            models::AdmissionPlanList,
            models::LogEntry,
            models::LogList,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "system", description = "System health endpoints"),
        (name = "auth", description = "Login, logout and token endpoints"),
        (name = "users", description = "User management endpoints"),
        (name = "roles", description = "Role management endpoints"),
        (name = "resources", description = "Permission resource endpoints"),
        (name = "menus", description = "Navigation menu endpoints"),
        (name = "configs", description = "System configuration endpoints"),
        (name = "school-admission", description = "School admission score endpoints"),
        (name = "plans", description = "Admission plan endpoints"),
        (name = "logs", description = "HTTP access log endpoints")
    )
)]
pub struct ApiDoc;

/// Paths reachable without a bearer token
pub fn default_skip_auth_paths() -> Vec<String> {
    ["/api/auth/login", "/api/health", "/swagger-ui", "/api/openapi.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// Allowed CORS origins (if None, localhost origins are allowed)
    pub cors_origins: Option<Vec<String>>,
    /// HMAC secret for signing session tokens
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl: chrono::Duration,
    /// Requests whose path contains one of these skip authentication
    pub skip_auth_paths: Vec<String>,
    pub timezone: FixedOffset,
    /// Per-body capture limit for access logs
    pub max_body_bytes: usize,
    /// Requests whose path contains one of these are not logged
    pub capture_skip_paths: Vec<String>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_cors: true,
            cors_origins: None,
            jwt_secret: String::new(),
            jwt_issuer: "backoffice".to_string(),
            token_ttl: chrono::Duration::hours(DEFAULT_TOKEN_HOURS),
            skip_auth_paths: default_skip_auth_paths(),
            timezone: Utc.fix(),
            max_body_bytes: 0,
            capture_skip_paths: Vec::new(),
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
    sender: LogSender,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiServerConfig,
        db: DatabaseConnection,
        logs: Arc<dyn LogStore>,
        sender: LogSender,
    ) -> Self {
        let state = Arc::new(AppState {
            db,
            logs,
            jwt_secret: config.jwt_secret.clone(),
            jwt_issuer: config.jwt_issuer.clone(),
            token_ttl: config.token_ttl,
            validator: Arc::new(
                JwtValidator::new(config.jwt_secret.as_bytes())
                    .with_issuer(config.jwt_issuer.clone()),
            ),
            timezone: config.timezone,
        });

        Self {
            config,
            state,
            sender,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        use handlers::{
            admission_plans, auth, configs, logs, menus, resources, roles, school_admissions,
            system, users,
        };

        let api_router = Router::new()
            .route("/api/health", get(system::health_check))
            // Auth
            .route("/api/auth/login", post(auth::login))
            .route("/api/auth/logout", post(auth::logout))
            .route("/api/auth/user", get(auth::current_user))
            .route("/api/auth/refresh", post(auth::refresh_token))
            .route("/api/auth/change-password", post(auth::change_password))
            // Users
            .route("/api/users", get(users::list_users).post(users::create_user))
            .route(
                "/api/users/{id}",
                get(users::get_user)
                    .put(users::update_user)
                    .delete(users::delete_user),
            )
            .route(
                "/api/users/{id}/roles",
                get(users::get_user_roles).post(users::assign_roles),
            )
            // Roles
            .route("/api/roles", get(roles::list_roles).post(roles::create_role))
            .route("/api/roles/batch", delete(roles::batch_delete_roles))
            .route(
                "/api/roles/{id}",
                get(roles::get_role)
                    .put(roles::update_role)
                    .delete(roles::delete_role),
            )
            .route(
                "/api/roles/{id}/permissions",
                get(roles::get_role_permissions).put(roles::set_role_permissions),
            )
            // Resources
            .route(
                "/api/resources",
                get(resources::list_resources).post(resources::create_resource),
            )
            .route("/api/resources/tree", get(resources::resource_tree))
            .route(
                "/api/resources/{id}",
                get(resources::get_resource)
                    .put(resources::update_resource)
                    .delete(resources::delete_resource),
            )
            // Menus
            .route("/api/menu/tree", get(menus::menu_tree))
            .route("/api/menu", post(menus::create_menu))
            .route(
                "/api/menu/{id}",
                put(menus::update_menu).delete(menus::delete_menu),
            )
            // System configuration
            .route("/api/system/config/list", get(configs::list_configs))
            .route(
                "/api/system/config",
                post(configs::create_config).put(configs::update_config),
            )
            .route(
                "/api/system/config/{id}",
                get(configs::get_config).delete(configs::delete_config),
            )
            // Reference data
            .route(
                "/api/school-admission",
                get(school_admissions::list_school_admissions)
                    .post(school_admissions::create_school_admission),
            )
            .route(
                "/api/school-admission/{id}",
                get(school_admissions::get_school_admission)
                    .put(school_admissions::update_school_admission)
                    .delete(school_admissions::delete_school_admission),
            )
            .route(
                "/api/plans",
                get(admission_plans::list_plans).post(admission_plans::create_plan),
            )
            .route(
                "/api/plans/{id}",
                get(admission_plans::get_plan)
                    .put(admission_plans::update_plan)
                    .delete(admission_plans::delete_plan),
            )
            // Access logs
            .route("/api/system/log/list", get(logs::list_logs))
            .route("/api/system/log", delete(logs::batch_delete_logs))
            .route("/api/system/log/clean", delete(logs::clean_logs))
            .route("/api/system/log/export", post(logs::export_logs))
            .route(
                "/api/system/log/{id}",
                get(logs::get_log).delete(logs::delete_log),
            )
            .with_state(self.state.clone());

        let auth_state = Arc::new(middleware::AuthState::new(
            self.state.validator.clone(),
            self.config.skip_auth_paths.clone(),
        ));
        let capture_state = Arc::new(middleware::CaptureState::new(
            self.sender.clone(),
            self.config.max_body_bytes,
            self.config.capture_skip_paths.clone(),
        ));

        // Innermost first: auth, panic guard, capture, tracing, CORS
        let mut router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", ApiDoc::openapi()))
            .merge(api_router)
            .layer(axum_middleware::from_fn_with_state(
                auth_state,
                middleware::require_auth,
            ))
            .layer(CatchPanicLayer::custom(middleware::panic_response))
            .layer(axum_middleware::from_fn_with_state(
                capture_state,
                middleware::capture_requests,
            ))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        if !self.config.enable_cors {
            return None;
        }

        let origin = match &self.config.cors_origins {
            Some(origins) if origins.iter().any(|origin| origin == "*") => {
                AllowOrigin::mirror_request()
            }
            Some(origins) if !origins.is_empty() => {
                let allowed: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|origin| match HeaderValue::from_str(origin) {
                        Ok(value) => Some(value),
                        Err(_) => {
                            warn!("Ignoring invalid CORS origin: {}", origin);
                            None
                        }
                    })
                    .collect();
                AllowOrigin::list(allowed)
            }
            _ => AllowOrigin::predicate(|origin: &HeaderValue, _| {
                let origin = origin.to_str().unwrap_or("");
                origin.starts_with("http://localhost:")
                    || origin.starts_with("http://127.0.0.1:")
                    || origin.starts_with("https://localhost:")
                    || origin.starts_with("https://127.0.0.1:")
            }),
        };

        Some(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .expose_headers([header::CONTENT_DISPOSITION])
                .allow_credentials(true)
                .allow_origin(origin),
        )
    }

    /// Start the API server and stop accepting connections once `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        info!("API server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/system/log/list"));
        assert!(doc.paths.paths.contains_key("/api/users/{id}/roles"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("LogEntry"));
    }

    #[test]
    fn test_default_skip_paths_cover_public_routes() {
        let skips = default_skip_auth_paths();
        assert!(skips.iter().any(|p| p == "/api/auth/login"));
        assert!(skips.iter().any(|p| p == "/api/health"));
    }
}
