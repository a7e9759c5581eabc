use std::path::Path;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{any, get},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{protected, public};
use crate::middleware::resolve_tenant_middleware;
use crate::state::AppState;

/// Full console router
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public, no tenant needed
        .route("/health", get(public::health_get))
        // Everything else is tenant-scoped
        .merge(console_routes(state.clone()));

    if let Some(dir) = &state.config.console.static_dir {
        router = router.nest_service("/assets", ServeDir::new(Path::new(dir).join("assets")));
    }

    if state.config.security.enable_cors {
        router = router.layer(cors_layer(&state.config.security.cors_origins));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

fn console_routes(state: AppState) -> Router<AppState> {
    use public::auth;

    Router::new()
        // Sign-in flow
        .route("/auth/login", get(auth::login_get))
        .route("/auth/signup", get(auth::signup_get))
        .route("/auth/callback", get(auth::callback_get))
        .route("/auth/logout", get(auth::logout_get))
        .route("/auth/error", get(auth::error_get))
        .route("/unauthorized", get(public::unauthorized_get))
        // JSON for the console shell
        .route("/session/context", get(protected::context_get))
        .route("/api/*path", any(protected::forward_any))
        // Console pages
        .fallback(protected::console_page)
        .layer(middleware::from_fn_with_state(state, resolve_tenant_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}
