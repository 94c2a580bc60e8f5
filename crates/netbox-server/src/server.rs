//! HTTP listener.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use hyper::header::CONTENT_TYPE;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server};
use tower::{Service, ServiceBuilder};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::routes;
use crate::state::AppState;

/// Permissive CORS for browser front-ends on any origin.
///
/// Pre-flight `OPTIONS` requests are answered here and never reach
/// [`routes::handle`].
#[must_use]
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}

/// The routes wrapped in [`cors_layer`]; one instance per connection.
pub fn service(
    state: AppState,
) -> impl Service<
    Request<Body>,
    Response = Response<Body>,
    Error = Infallible,
    Future: Send + 'static,
> + Send
+ 'static {
    ServiceBuilder::new()
        .layer(cors_layer())
        .service(service_fn(move |req| routes::handle(state.clone(), req)))
}

/// Bind `addr` and return the bound address with the serving future.
///
/// The future resolves once `shutdown` completes and in-flight requests
/// have been answered. Binding port 0 picks a free port.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub fn bind<S>(
    addr: SocketAddr,
    state: AppState,
    shutdown: S,
) -> hyper::Result<(SocketAddr, impl Future<Output = hyper::Result<()>> + Send)>
where
    S: Future<Output = ()> + Send + 'static,
{
    let make_service = make_service_fn(move |conn: &AddrStream| {
        let state = state.clone();
        let remote = conn.remote_addr();
        async move {
            info!(%remote, "HTTP connection accepted");
            Ok::<_, Infallible>(service(state))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);
    let local = server.local_addr();
    info!(%local, "HTTP server listening");
    Ok((local, server.with_graceful_shutdown(shutdown)))
}
