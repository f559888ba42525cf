use crate::cli::Args;
use crate::error::RelayError;
use crate::relay::Relay;
use super::RouteVariant;
use std::error::Error;
use std::net::SocketAddr;
use axum::{
    body::Bytes,
    extract::{ rejection::BytesRejection, Request, State },
    http::{ header, HeaderValue, Method, StatusCode },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
    routing::{ any, post },
    Router,
};
use tower::ServiceExt;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error, warn };

pub const CHAT_ROUTE: &str = "/api/chat";

pub fn build_router(relay: Relay, variant: RouteVariant, enable_cors: bool) -> Router {
    let router = match variant {
        RouteVariant::Pages => Router::new().route(CHAT_ROUTE, any(pages_chat_handler)),
        RouteVariant::App => Router::new().route(CHAT_ROUTE, post(app_chat_handler)),
    };

    if !enable_cors {
        return router.with_state(relay);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // CorsLayer answers every OPTIONS itself; only real preflights go to it.
    let plain = router.clone().with_state(relay.clone());
    router
        .layer(cors)
        .with_state(relay)
        .layer(middleware::from_fn_with_state(plain, route_plain_options))
}

fn is_cors_preflight(req: &Request) -> bool {
    req.method() == Method::OPTIONS &&
        req.headers().contains_key(header::ORIGIN) &&
        req.headers().contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

async fn route_plain_options(State(plain): State<Router>, req: Request, next: Next) -> Response {
    if req.method() != Method::OPTIONS || is_cors_preflight(&req) {
        return next.run(req).await;
    }
    match plain.oneshot(req).await {
        Ok(resp) => resp,
        Err(never) => match never {},
    }
}

pub async fn start_http_server(
    relay: Relay,
    variant: RouteVariant,
    args: Args,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = args.server_addr.parse::<SocketAddr>()
        .map_err(|e| format!("Invalid server address '{}': {}", args.server_addr, e))?;

    let app = build_router(relay, variant, args.enable_cors);

    if args.enable_tls {
        let (cert_path, key_path) = match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert), Some(key)) => (cert, key),
            _ => {
                error!("--enable-tls requires both --tls-cert-path and --tls-key-path.");
                return Err("TLS enabled without cert/key".into());
            }
        };
        info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            cert_path,
            key_path
        ).await?;

        info!("HTTPS server listening on: https://{}{}", addr, CHAT_ROUTE);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await
            .map_err(|e| format!("Failed to bind HTTP server to {}: {}", addr, e))?;

        info!("HTTP server listening on: http://{}{}", listener.local_addr()?, CHAT_ROUTE);
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Variant that owns method checking: anything but POST gets a 405.
async fn pages_chat_handler(
    State(relay): State<Relay>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if method != Method::POST {
        warn!("Rejected {} {}", method, CHAT_ROUTE);
        return method_not_allowed(&method);
    }
    relay_body(&relay, body).await
}

/// Variant that leaves method checking to the router.
async fn app_chat_handler(
    State(relay): State<Relay>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    relay_body(&relay, body).await
}

async fn relay_body(relay: &Relay, body: Result<Bytes, BytesRejection>) -> Response {
    match body {
        Ok(bytes) => relay.respond(&bytes).await,
        Err(rejection) => {
            let err = RelayError::Parse(rejection.body_text());
            error!("Error handling POST request: {}", err);
            err.into_response()
        }
    }
}

fn method_not_allowed(method: &Method) -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [
            (header::ALLOW, HeaderValue::from_static("POST")),
            (header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
        ],
        format!("Method {} Not Allowed", method),
    ).into_response()
}
