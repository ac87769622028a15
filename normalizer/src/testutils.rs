use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::convert::Infallible;
use tokio::net::TcpListener;

/// Content application stand-in. Answers every request with `<method> <path?query>` and
/// echoes back any `x-` request headers.
pub async fn spawn_echo_upstream() -> url::Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                let svc = service_fn(|req: Request<Incoming>| async move {
                    let target = req
                        .uri()
                        .path_and_query()
                        .map(|pq| pq.as_str().to_string())
                        .unwrap_or_default();
                    let mut response =
                        Response::new(Full::new(Bytes::from(format!("{} {target}", req.method()))));
                    for (name, value) in req.headers() {
                        if name.as_str().starts_with("x-") {
                            response.headers_mut().insert(name.clone(), value.clone());
                        }
                    }
                    Ok::<_, Infallible>(response)
                });
                let _ = Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });

    url::Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
}

/// Upstream that accepts connections and never answers.
pub async fn spawn_silent_upstream() -> url::Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            held.push(stream);
        }
    });

    url::Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
}
