//! Server lifecycle: concurrency, keep-alive and graceful shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use erica::{App, BoxError, RequestContext, ResponseWriter, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

#[tokio::test]
async fn serves_concurrent_connections() {
    let mut app = App::new();
    app.get("/slow", |_req, res: ResponseWriter| async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        res.text("done")
    });
    let server = common::spawn(app).await;
    let client = common::client();

    let started = Instant::now();
    let mut tasks = Vec::new();
    for _ in 0..10 {
        let client = client.clone();
        let url = server.url("/slow");
        tasks.push(tokio::spawn(async move {
            client.get(url).send().await.unwrap().text().await.unwrap()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), "done");
    }

    // Sequential handling would take at least 2s.
    assert!(started.elapsed() < Duration::from_millis(1500));
    server.stop().await;
}

#[tokio::test]
async fn keep_alive_connection_serves_sequential_requests() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    let mut app = App::new();
    app.get("/count", move |_req, res: ResponseWriter| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move { res.text(n.to_string()) }
    });
    let server = common::spawn(app).await;

    // Default client pools, so both requests share one connection.
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    for expected in ["1", "2"] {
        let body = client.get(server.url("/count")).send().await.unwrap().text().await.unwrap();
        assert_eq!(body, expected);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    server.stop().await;
}

#[tokio::test]
async fn shutdown_releases_the_socket() {
    let mut app = App::new();
    app.get("/hello", |_req, res: ResponseWriter| async move { res.text("world") });
    let server = common::spawn(app).await;
    let addr = server.addr;

    let res = common::client().get(server.url("/hello")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    server.stop().await;

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    // Port can be bound again.
    tokio::net::TcpListener::bind(addr).await.unwrap();
}

#[tokio::test]
async fn in_flight_request_completes_during_shutdown() {
    let mut app = App::new();
    app.get("/slow", |_req, res: ResponseWriter| async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        res.text("finished")
    });
    let server = common::spawn(app).await;

    let url = server.url("/slow");
    let request = tokio::spawn(async move {
        common::client().get(url).send().await.unwrap().text().await.unwrap()
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    server.stop().await;

    assert_eq!(request.await.unwrap(), "finished");
}

fn hello_app(config: ServerConfig) -> App {
    let mut app = App::with_config(config);
    app.get("/hello", |_req, res: ResponseWriter| async move { res.text("world") })
        .post("/upload", |mut req: RequestContext, res: ResponseWriter| async move {
            let text = req.text().await?;
            Ok::<_, BoxError>(res.text(text)?)
        });
    app
}

async fn read_until_closed(stream: &mut TcpStream) -> String {
    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("connection was not closed")
        .unwrap();
    String::from_utf8(response).unwrap()
}

#[tokio::test]
async fn stalled_body_times_out() {
    let mut config = ServerConfig::default();
    config.timeouts.body_read_secs = 1;
    let server = common::spawn(hello_app(config)).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(
            b"POST /upload HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 10\r\n\r\nabc",
        )
        .await
        .unwrap();

    let started = Instant::now();
    let response = read_until_closed(&mut stream).await;
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{response}");
    assert!(response.ends_with("timed out reading request body"), "{response}");

    server.stop().await;
}

#[tokio::test]
async fn slow_headers_close_the_connection() {
    let mut config = ServerConfig::default();
    config.timeouts.header_read_secs = 1;
    let server = common::spawn(hello_app(config)).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"GET /hello HTTP/1.1\r\nHost: local").await.unwrap();

    let started = Instant::now();
    let response = read_until_closed(&mut stream).await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!response.contains("200 OK"), "{response}");

    server.stop().await;
}

#[tokio::test]
async fn connection_limit_holds_extra_connections() {
    let mut config = ServerConfig::default();
    config.listener.max_connections = 1;
    let server = common::spawn(hello_app(config)).await;

    // Takes the only slot without sending anything.
    let idle = TcpStream::connect(server.addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let addr = server.addr;
    let mut waiting = tokio::spawn(async move {
        common::raw_exchange(
            addr,
            b"GET /hello HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await
    });

    assert!(
        tokio::time::timeout(Duration::from_millis(300), &mut waiting)
            .await
            .is_err(),
        "second connection was served while the limit was reached"
    );

    drop(idle);
    let response = waiting.await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("world"), "{response}");

    server.stop().await;
}

#[tokio::test]
async fn keep_alive_disabled_closes_after_one_response() {
    let mut config = ServerConfig::default();
    config.http.keep_alive = false;
    let server = common::spawn(hello_app(config)).await;

    // No `Connection: close` from the client; the server closes on its own.
    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream
        .write_all(b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let response = read_until_closed(&mut stream).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.ends_with("world"), "{response}");

    server.stop().await;
}
