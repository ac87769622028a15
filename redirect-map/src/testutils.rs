use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use url::Url;

type Handler = dyn Fn(&str, &str) -> (StatusCode, String) + Send + Sync;

/// In-process stand-in for the content export API, bound to an ephemeral port.
pub struct TestContentApi {
    pub url: Url,
    hits: Arc<AtomicUsize>,
}

impl TestContentApi {
    /// Serves every request with `handler(path, query)`.
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&str, &str) -> (StatusCode, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let hits = Arc::new(AtomicUsize::new(0));
        let handler: Arc<Handler> = Arc::new(handler);

        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let handler = handler.clone();
                let counter = counter.clone();

                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let (status, body) =
                            handler(req.uri().path(), req.uri().query().unwrap_or(""));
                        async move {
                            let mut response = Response::new(Full::new(Bytes::from(body)));
                            *response.status_mut() = status;
                            Ok::<_, Infallible>(response)
                        }
                    });
                    let _ = Builder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await;
                });
            }
        });

        TestContentApi {
            url: Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(),
            hits,
        }
    }

    /// Serves the given responses in order, repeating the last one.
    pub async fn spawn_sequence(responses: Vec<(StatusCode, String)>) -> Self {
        let responses = Mutex::new(responses.into_iter().collect::<std::collections::VecDeque<_>>());
        Self::spawn(move |_, _| {
            let mut queue = responses.lock().unwrap();
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        })
        .await
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub fn json_page(records: &[(&str, &str)], cursor: Option<&str>) -> String {
    let data: Vec<serde_json::Value> = records
        .iter()
        .map(|(slug, title)| serde_json::json!({"slug": slug, "title": title}))
        .collect();

    serde_json::json!({
        "data": data,
        "metadata": {"cursor": cursor, "has_more": cursor.is_some()},
    })
    .to_string()
}
