//! HTTP front end of the index.
//!
//! Connections are served one at a time: the accept loop awaits each
//! connection before accepting the next, and keep-alive is off, so every
//! request (including the git commands or API calls it triggers) completes
//! before the next one starts. A client that connects but never sends a
//! complete request head is dropped after the header read timeout.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use log::{error, info, warn};
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;

use crate::index::Index;
use crate::render;

/// Status and HTML body of a response, before it is turned into hyper types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub allow: Option<&'static str>,
}

impl Reply {
    fn html(status: StatusCode, body: String) -> Self {
        Self {
            status,
            body,
            allow: None,
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        if let Some(allow) = self.allow {
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}

/// Package name addressed by a request path, or `None` for the index page.
pub fn requested_name(path: &str) -> Option<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(percent_decode_str(trimmed).decode_utf8_lossy().into_owned())
    }
}

/// Answer one request against `index`.
#[tracing::instrument(skip(index))]
pub async fn handle(index: &Index, method: &Method, path: &str) -> Reply {
    let mut reply = match *method {
        Method::GET | Method::HEAD => route(index, path).await,
        _ => Reply {
            status: StatusCode::METHOD_NOT_ALLOWED,
            body: String::new(),
            allow: Some("GET, HEAD"),
        },
    };
    if *method == Method::HEAD {
        reply.body.clear();
    }
    info!("{} {} -> {}", method, path, reply.status.as_u16());
    reply
}

async fn route(index: &Index, path: &str) -> Reply {
    let Some(name) = requested_name(path) else {
        return Reply::html(
            StatusCode::OK,
            render::index_page(index.packages().map(|p| p.name())),
        );
    };

    let Some(package) = index.get(&name) else {
        return Reply::html(StatusCode::NOT_FOUND, render::not_found_page(&name));
    };

    match package.links().await {
        Ok(links) => Reply::html(StatusCode::OK, render::package_page(package.name(), &links)),
        Err(err) => {
            error!("{:#}", err);
            Reply::html(
                StatusCode::BAD_GATEWAY,
                render::source_error_page(package.name()),
            )
        }
    }
}

/// Bind `addr` and serve `index` until `shutdown` resolves.
pub async fn run(
    addr: SocketAddr,
    index: Index,
    header_read_timeout: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Serving {} packages on http://{}",
        index.len(),
        listener.local_addr()?
    );
    serve(listener, Arc::new(index), header_read_timeout, shutdown).await
}

/// Serve connections from `listener`, one at a time, until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    index: Arc<Index>,
    header_read_timeout: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                return Ok(());
            }
            accepted = listener.accept() => accepted.context("Failed to accept connection")?,
        };

        let index = index.clone();
        let service = service_fn(move |request: Request<Incoming>| {
            let index = index.clone();
            async move {
                let reply = handle(&index, request.method(), request.uri().path()).await;
                Ok::<_, Infallible>(reply.into_response())
            }
        });

        if let Err(err) = http1::Builder::new()
            .timer(TokioTimer::new())
            .header_read_timeout(header_read_timeout)
            .keep_alive(false)
            .serve_connection(TokioIo::new(stream), service)
            .await
        {
            warn!("Connection from {} failed: {}", peer, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::package::{MockPackage, Package, StaticLinkPackage};

    fn static_package(name: &str) -> Arc<dyn Package> {
        Arc::new(StaticLinkPackage::new(
            name,
            [(
                format!("{}-develop", name),
                format!("git+file:///src/{}@develop", name),
            )],
        ))
    }

    fn failing_package(name: &'static str) -> Arc<dyn Package> {
        let mut package = MockPackage::new();
        package.expect_name().return_const(name.to_string());
        package
            .expect_links()
            .returning(move || Err(IndexError::remote(name, anyhow::anyhow!("unreachable"))));
        Arc::new(package)
    }

    fn index() -> Index {
        Index::new([static_package("alpha"), static_package("beta")])
    }

    #[test]
    fn test_requested_name() {
        assert_eq!(requested_name(""), None);
        assert_eq!(requested_name("/"), None);
        assert_eq!(requested_name("//"), None);
        assert_eq!(requested_name("/alpha/"), Some("alpha".into()));
        assert_eq!(requested_name("/My%5FPackage"), Some("My_Package".into()));
    }

    #[tokio::test]
    async fn test_root_serves_index_page() {
        for path in ["", "/"] {
            let reply = handle(&index(), &Method::GET, path).await;
            assert_eq!(reply.status, StatusCode::OK);
            let alpha = reply.body.find("<a href=\"alpha\">alpha</a>").unwrap();
            let beta = reply.body.find("<a href=\"beta\">beta</a>").unwrap();
            assert!(alpha < beta);
        }
    }

    #[tokio::test]
    async fn test_package_page_with_fallback_name() {
        let index = Index::new([static_package("my-package")]);
        let reply = handle(&index, &Method::GET, "/My_Package/").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("<h1>Links for my-package</h1>"));
        assert!(reply.body.contains(
            "<a href=\"git+file:///src/my-package@develop#egg=my-package-develop\">my-package-develop</a>"
        ));
    }

    #[tokio::test]
    async fn test_unknown_package_is_404() {
        let reply = handle(&index(), &Method::GET, "/gamma").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(reply.body.contains("gamma"));

        let reply = handle(&index(), &Method::GET, "/%3Cb%3E").await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert!(reply.body.contains("&lt;b&gt;"));
    }

    #[tokio::test]
    async fn test_source_failure_is_bad_gateway() {
        let index = Index::new([failing_package("flaky"), static_package("alpha")]);
        let reply = handle(&index, &Method::GET, "/flaky").await;
        assert_eq!(reply.status, StatusCode::BAD_GATEWAY);
        assert!(reply.body.contains("flaky"));

        // Other packages keep working.
        let reply = handle(&index, &Method::GET, "/alpha").await;
        assert_eq!(reply.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_methods_are_rejected() {
        let reply = handle(&index(), &Method::POST, "/alpha").await;
        assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(reply.allow, Some("GET, HEAD"));

        let response = reply.into_response();
        assert_eq!(response.headers()[ALLOW], "GET, HEAD");
    }

    #[tokio::test]
    async fn test_head_has_status_but_no_body() {
        let reply = handle(&index(), &Method::HEAD, "/alpha").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.is_empty());
    }

    #[tokio::test]
    async fn test_into_response_sets_html_content_type() {
        let response = Reply::html(StatusCode::NOT_FOUND, "x".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_serve_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve(
            listener,
            Arc::new(index()),
            Duration::from_secs(10),
            async move {
                let _ = stop_rx.await;
            },
        ));

        let client = reqwest::Client::new();
        let index_page = client
            .get(format!("http://{}/", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(index_page.status(), 200);
        assert!(index_page.text().await.unwrap().contains("alpha"));

        let missing = client
            .get(format!("http://{}/gamma", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);
        assert!(missing.text().await.unwrap().contains("gamma"));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_idle_connection_does_not_block_later_requests() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve(
            listener,
            Arc::new(index()),
            Duration::from_millis(200),
            async move {
                let _ = stop_rx.await;
            },
        ));

        // Connects first and never sends a request head.
        let idle = tokio::net::TcpStream::connect(addr).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let response = client
            .get(format!("http://{}/alpha", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("alpha-develop"));

        drop(idle);
        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
