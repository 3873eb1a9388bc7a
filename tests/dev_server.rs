// tests/dev_server.rs

use std::error::Error;
use std::fs;
use std::net::SocketAddr;

use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};

use assetpipe::errors::PipelineError;
use assetpipe::server::{DevServer, Reloader};
use assetpipe_test_utils::builders::ConfigFileBuilder;
use assetpipe_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

async fn get(addr: SocketAddr, path: &str) -> Result<String, Box<dyn Error>> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(String::from_utf8_lossy(&response).into_owned())
}

fn site() -> Result<tempfile::TempDir, Box<dyn Error>> {
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("dist/css"))?;
    fs::create_dir_all(dir.path().join("dist/docs"))?;
    fs::write(
        dir.path().join("dist/index.html"),
        "<html><body><h1>hi</h1></body></html>",
    )?;
    fs::write(dir.path().join("dist/css/styles.min.css"), "body{color:red}")?;
    fs::write(dir.path().join("dist/docs/index.html"), "<p>docs</p>")?;
    fs::write(dir.path().join("secret.txt"), "do not serve")?;
    Ok(dir)
}

#[tokio::test]
async fn serves_files_and_injects_reload_script() -> TestResult {
    init_tracing();
    let dir = site()?;
    let cfg = ConfigFileBuilder::new().with_port(0, false).build();
    let server = DevServer::start(cfg.server(), dir.path(), Reloader::new()).await?;
    let addr = server.addr();

    let index = get(addr, "/").await?;
    assert!(index.starts_with("HTTP/1.1 200"));
    let script = index.find(r#"<script src="/__livereload.js"></script>"#).unwrap();
    assert!(script < index.find("</body>").unwrap());

    let css = get(addr, "/css/styles.min.css").await?;
    assert!(css.contains("text/css"));
    assert!(css.ends_with("body{color:red}"));

    let js = get(addr, "/__livereload.js").await?;
    assert!(js.contains("EventSource"));

    assert!(get(addr, "/missing.js").await?.starts_with("HTTP/1.1 404"));
    let redirect = get(addr, "/docs").await?;
    assert!(redirect.starts_with("HTTP/1.1 307"));
    assert!(redirect.to_ascii_lowercase().contains("location: /docs/"));
    let docs = get(addr, "/docs/").await?;
    assert!(docs.contains("<p>docs</p>"));
    assert!(docs.contains("__livereload.js"));

    let escape = get(addr, "/..%2fsecret.txt").await?;
    assert!(escape.starts_with("HTTP/1.1 404"));
    assert!(!escape.contains("do not serve"));
    let escape = get(addr, "/css/%2e%2e/%2e%2e/secret.txt").await?;
    assert!(!escape.contains("do not serve"));

    with_timeout(server.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn livereload_off_serves_html_untouched() -> TestResult {
    init_tracing();
    let dir = site()?;
    let mut raw = ConfigFileBuilder::new().with_port(0, false).raw();
    raw.server.livereload = false;
    let cfg = assetpipe::config::ConfigFile::try_from(raw)?;
    let server = DevServer::start(cfg.server(), dir.path(), Reloader::new()).await?;

    let index = get(server.addr(), "/index.html").await?;
    assert!(!index.contains("__livereload"));
    assert!(get(server.addr(), "/__livereload.js").await?.starts_with("HTTP/1.1 404"));

    with_timeout(server.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn reload_reaches_event_stream() -> TestResult {
    init_tracing();
    let dir = site()?;
    let cfg = ConfigFileBuilder::new().with_port(0, false).build();
    let server = DevServer::start(cfg.server(), dir.path(), Reloader::new()).await?;
    let addr = server.addr();

    let mut stream = TcpStream::connect(addr).await?;
    stream
        .write_all(format!("GET /__livereload HTTP/1.1\r\nHost: {addr}\r\n\r\n").as_bytes())
        .await?;

    // Wait until the handler has subscribed.
    with_timeout(async {
        while server.reloader().client_count() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert_eq!(server.notify_reload(4), 1);

    let mut seen = String::new();
    let mut buf = [0u8; 1024];
    while !seen.contains("event: reload") {
        let n = timeout(Duration::from_secs(5), stream.read(&mut buf)).await??;
        if n == 0 {
            break;
        }
        seen.push_str(&String::from_utf8_lossy(&buf[..n]));
    }
    assert!(seen.contains("text/event-stream"));
    assert!(seen.contains("event: reload"));
    assert!(seen.contains("data: 4"));

    // Shutdown must not hang on the open stream.
    with_timeout(server.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn busy_port_falls_forward_or_fails() -> TestResult {
    init_tracing();
    let dir = site()?;
    let taken = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = taken.local_addr()?.port();

    let strict = ConfigFileBuilder::new().with_port(port, false).build();
    let err = DevServer::start(strict.server(), dir.path(), Reloader::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Bind { attempts: 1, .. }));

    let lenient = ConfigFileBuilder::new().with_port(port, true).build();
    let server = DevServer::start(lenient.server(), dir.path(), Reloader::new()).await?;
    assert_ne!(server.addr().port(), port);
    assert!(server.addr().port() > port);

    with_timeout(server.shutdown()).await;
    Ok(())
}
