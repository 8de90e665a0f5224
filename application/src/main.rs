//! Photo gallery server binary.

use std::{
    io,
    sync::{Arc, OnceLock},
    time,
};

use application::{api, config, graphql, Admins, Args, Config};
use axum::{
    body::Body,
    extract::MatchedPath,
    routing::{on, MethodFilter},
    Extension, Router,
};
use axum_client_ip::InsecureClientIp;
use service::{
    infra::{postgres, Postgres},
    Service,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::MakeWriter,
    layer::{Layer, SubscriberExt as _},
    registry::LookupSpan,
    util::SubscriberInitExt as _,
    Registry,
};

/// Levels written to `stderr` rather than `stdout`.
const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

/// Maximum level to be logged, set once the [`Config`] is loaded.
static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(vec![
            log_layer::<Registry, _>(io::stdout, false).boxed(),
            log_layer::<Registry, _>(io::stderr, true).boxed(),
        ])
        .init();

    _ = start().await;
}

/// Creates a log [`Layer`] writing into the provided `writer` either the
/// [`STDERR_LEVELS`] events or all the others.
fn log_layer<S, W>(writer: W, stderr: bool) -> impl Layer<S> + Send + Sync
where
    S: log::Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_thread_names(true)
        .with_writer(writer)
        .with_filter(filter_fn(move |meta| {
            let max = LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO);
            meta.is_span()
                || (STDERR_LEVELS.contains(meta.level()) == stderr
                    && max >= *meta.level())
        }))
}

async fn start() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        postgres,
        service,
        admin,
        server,
        log,
    } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let admins = Admins::from(admin);
    if admins.is_empty() {
        log::warn!("no administrators configured, `Image`s are read-only");
    }

    let app = router(
        Service::new(service.into(), migrated(postgres).await?),
        admins,
        cors(&server.cors)?,
    );

    let listener = TcpListener::bind((server.host.as_str(), server.port))
        .await
        .map_err(|e| {
            log::error!(
                "failed to listen on `{}:{}`: {e}",
                server.host,
                server.port,
            );
        })?;
    log::info!("serving photo gallery on `{}:{}`", server.host, server.port);

    axum::serve(listener, app)
        .await
        .map_err(|e| log::error!("webserver failed: {e}"))
}

/// Connects to [`Postgres`] and brings its schema up to date.
async fn migrated(conf: config::Postgres) -> Result<Postgres, ()> {
    let mut db = Postgres::new(&conf.into()).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
    })?;

    let report = migrations::runner()
        .run_async(&mut db)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;
    for m in report.applied_migrations() {
        log::info!("applied `{m}` migration");
    }

    Ok(db)
}

/// Creates a [`CorsLayer`] allowing GraphQL requests from the configured
/// origins.
fn cors(conf: &config::Cors) -> Result<CorsLayer, ()> {
    let origins = if conf.origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        conf.origins
            .iter()
            .map(|origin| {
                origin.parse::<http::HeaderValue>().map_err(|e| {
                    log::error!("`{origin}` is not a valid CORS origin: {e}");
                })
            })
            .collect::<Result<Vec<_>, _>>()?
            .into()
    };

    Ok(CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::OPTIONS,
            http::Method::POST,
        ])
        .allow_headers([
            http::header::AUTHORIZATION,
            http::header::CONTENT_TYPE,
        ])
        .allow_origin(origins))
}

/// Creates the [`Router`] serving the GraphQL API.
fn router(
    service: application::Service,
    admins: Admins,
    cors: CorsLayer,
) -> Router {
    Router::new()
        .route(
            "/graphql",
            on(MethodFilter::GET.or(MethodFilter::POST), graphql),
        )
        .layer(Extension(Arc::new(api::schema())))
        .layer(Extension(service))
        .layer(Extension(Arc::new(admins)))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(record_response),
        )
}

/// Creates a [`tracing::Span`] for the provided HTTP request.
fn request_span(r: &http::Request<Body>) -> tracing::Span {
    let headers = r.headers();
    tracing::info_span!(
        "HTTP request",
        http.client_ip = InsecureClientIp::from(headers, r.extensions())
            .map(|ip| ip.0.to_string())
            .ok(),
        http.flavor = ?r.version(),
        http.method = r.method().as_str(),
        http.route = r
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str),
        http.target = r
            .uri()
            .path_and_query()
            .map(http::uri::PathAndQuery::as_str),
        http.user_agent = headers
            .get(http::header::USER_AGENT)
            .and_then(|h| h.to_str().ok()),
        http.status_code = tracing::field::Empty,
    )
}

/// Records the status and the duration of the provided HTTP response.
fn record_response(
    r: &http::Response<Body>,
    dur: time::Duration,
    span: &tracing::Span,
) {
    let status = r.status();
    _ = span.record("http.status_code", status.as_u16());

    let duration = format!("{}ms", dur.as_millis());
    if status.is_client_error() || status.is_server_error() {
        tracing::error!(duration = %duration);
    } else {
        tracing::info!(duration = %duration);
    }
}

#[cfg(test)]
mod spec {
    use application::config;

    use super::cors;

    #[test]
    fn allows_wildcard_and_exact_origins() {
        for origins in [
            vec!["*"],
            vec!["https://photos.example.com", "http://localhost:3000"],
        ] {
            let conf = config::Cors {
                origins: origins.iter().map(ToString::to_string).collect(),
            };

            assert!(cors(&conf).is_ok(), "{origins:?}");
        }
    }

    #[test]
    fn rejects_malformed_origin() {
        let conf = config::Cors {
            origins: vec!["https://photos\n.example.com".into()],
        };

        assert!(cors(&conf).is_err());
    }
}
