#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub struct Route {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl Route {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "text/html; charset=utf-8",
            body: body.into().into_bytes(),
            delay: None,
        }
    }

    pub fn bytes(content_type: &'static str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.to_vec(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: Vec::new(),
            delay: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            body: b"not found".to_vec(),
            ..Self::status(404)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        206 => "Partial Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

/// Serves fixed responses by request path on a random local port; unknown
/// paths get a 404. Returns the base URL without a trailing slash.
pub async fn serve(routes: HashMap<String, Route>) -> String {
    let routes = Arc::new(routes);
    serve_fn(move |path| match routes.get(path) {
        Some(route) => Route {
            status: route.status,
            content_type: route.content_type,
            body: route.body.clone(),
            delay: route.delay,
        },
        None => Route::not_found(),
    })
    .await
}

/// Like [`serve`], but every request is answered by `handler(path)`.
pub async fn serve_fn<F>(handler: F) -> String
where
    F: Fn(&str) -> Route + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let request = String::from_utf8_lossy(&buf);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_owned();
                let route = handler(&path);

                if let Some(delay) = route.delay {
                    tokio::time::sleep(delay).await;
                }

                // 204 must not carry a body or a length
                let head = if route.status == 204 {
                    "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n".to_owned()
                } else {
                    format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        route.status,
                        reason(route.status),
                        route.content_type,
                        route.body.len()
                    )
                };
                let _ = socket.write_all(head.as_bytes()).await;
                if route.status != 204 {
                    let _ = socket.write_all(&route.body).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

pub fn pin_page(image_url: &str, created_at: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head>
        <meta property="og:image" content="{image_url}">
        </head><body>
        <script id="__PWS_DATA__" type="application/json">{{"props":{{"pin":{{"created_at":"{created_at}"}}}}}}</script>
        </body></html>"#
    )
}

pub fn board(links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">pin</a>"#, href))
        .collect();
    format!("<html><body><a href=\"/krazikhan/\">profile</a>{}</body></html>", anchors)
}
