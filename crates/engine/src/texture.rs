//! Texture sources for `texture` edits.
//!
//! Inline `data:` URIs are decoded on the spot. Remote URIs go through a
//! [`TextureFetcher`], which the engine drives on the tokio runtime so the
//! caller never waits on the network.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::BoxFuture;
use futures::FutureExt;
use image::ImageFormat;

use crate::error::{EngineError, Result};
use crate::state::material::Texture;

pub type FetchFuture = BoxFuture<'static, Result<Vec<u8>>>;

/// Fetches raw image bytes for a URI.
pub trait TextureFetcher: Send + Sync {
    fn fetch(&self, uri: &str) -> FetchFuture;
}

/// Where a texture edit gets its pixels from
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    Inline(Texture),
    Remote(String),
}

impl TextureSource {
    pub fn parse(value: &str, max_bytes: usize) -> Result<Self> {
        let v = value.trim();
        if v.starts_with("data:") {
            return decode_data_uri(v, max_bytes).map(TextureSource::Inline);
        }
        let lower = v.to_ascii_lowercase();
        if (lower.starts_with("http://") || lower.starts_with("https://")) && v.len() > 8 {
            return Ok(TextureSource::Remote(v.to_string()));
        }
        Err(EngineError::invalid_value("texture", &abbreviate(v)))
    }
}

/// Decode a `data:<mime>;base64,<payload>` URI into a texture.
pub fn decode_data_uri(uri: &str, max_bytes: usize) -> Result<Texture> {
    let label = abbreviate(uri);
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| EngineError::invalid_value("texture", &label))?;
    if !header.ends_with(";base64") {
        return Err(EngineError::invalid_value("texture", &label));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| EngineError::invalid_value("texture", &label))?;
    if bytes.len() > max_bytes {
        return Err(EngineError::InvalidInput(format!(
            "texture is {} bytes, limit is {}",
            bytes.len(),
            max_bytes
        )));
    }
    decode_texture(bytes, &label)
}

/// Validate PNG/JPEG bytes and wrap them as a texture. Other formats are
/// rejected because glTF viewers are only required to read these two.
pub fn decode_texture(bytes: Vec<u8>, label: &str) -> Result<Texture> {
    let invalid = || EngineError::invalid_value("texture", label);
    let format = image::guess_format(&bytes).map_err(|_| invalid())?;
    let mime_type = match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        _ => return Err(invalid()),
    };
    let decoded = image::load_from_memory_with_format(&bytes, format).map_err(|e| {
        tracing::debug!("Texture {} failed to decode: {}", label, e);
        invalid()
    })?;

    Ok(Texture {
        width: decoded.width(),
        height: decoded.height(),
        bytes: bytes.into(),
        mime_type: mime_type.to_string(),
    })
}

/// Fetch and decode a remote texture, giving up after `timeout`.
pub async fn fetch_texture(
    fetcher: Arc<dyn TextureFetcher>,
    uri: String,
    timeout: Duration,
) -> Result<Texture> {
    let bytes = tokio::time::timeout(timeout, fetcher.fetch(&uri))
        .await
        .map_err(|_| {
            EngineError::Network(format!("{} timed out after {} ms", uri, timeout.as_millis()))
        })??;
    decode_texture(bytes, &uri)
}

/// Plain HTTP(S) fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Network(format!("http client: {e}")))?;
        Ok(Self::with_client(client, max_bytes))
    }

    pub fn with_client(client: reqwest::Client, max_bytes: usize) -> Self {
        Self { client, max_bytes }
    }
}

impl TextureFetcher for HttpFetcher {
    fn fetch(&self, uri: &str) -> FetchFuture {
        let client = self.client.clone();
        let uri = uri.to_string();
        let max_bytes = self.max_bytes;
        async move {
            let network = |e: reqwest::Error| EngineError::Network(format!("{uri}: {e}"));
            let mut response = client
                .get(&uri)
                .send()
                .await
                .map_err(network)?
                .error_for_status()
                .map_err(network)?;
            if let Some(declared) = response.content_length() {
                check_body_size(&uri, declared, max_bytes)?;
            }
            let mut body = Vec::new();
            while let Some(chunk) = response.chunk().await.map_err(network)? {
                check_body_size(&uri, (body.len() + chunk.len()) as u64, max_bytes)?;
                body.extend_from_slice(&chunk);
            }
            tracing::debug!("Fetched {} bytes from {}", body.len(), uri);
            Ok(body)
        }
        .boxed()
    }
}

/// Fail once a response body grows (or is declared) past `max_bytes`.
fn check_body_size(uri: &str, len: u64, max_bytes: usize) -> Result<()> {
    if len > max_bytes as u64 {
        return Err(EngineError::Network(format!(
            "{uri}: body exceeds {max_bytes} bytes"
        )));
    }
    Ok(())
}

/// Keep log lines and error messages short when the value is a data URI.
fn abbreviate(value: &str) -> String {
    const MAX: usize = 48;
    match value.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("encode png");
        out
    }

    pub(crate) fn png_data_uri(width: u32, height: u32) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(png_bytes(width, height)))
    }

    #[test]
    fn test_body_size_cap() {
        assert!(check_body_size("u", 10, 10).is_ok());
        assert!(matches!(
            check_body_size("u", 11, 10),
            Err(EngineError::Network(msg)) if msg.contains("exceeds 10 bytes")
        ));
    }

    /// Serve one canned HTTP response on a loopback port.
    async fn serve_once(response: Vec<u8>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/tile.png")
    }

    fn loopback_fetcher(max_bytes: usize) -> HttpFetcher {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpFetcher::with_client(client, max_bytes)
    }

    #[tokio::test]
    async fn test_http_fetch_stops_at_cap_without_length() {
        let mut response = b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_vec();
        response.extend(std::iter::repeat(7u8).take(4096));
        let uri = serve_once(response).await;

        let fetcher = loopback_fetcher(1024);
        let err = fetcher.fetch(&uri).await.unwrap_err();
        assert!(err.to_string().contains("exceeds 1024 bytes"), "{err}");
    }

    #[tokio::test]
    async fn test_http_fetch_rejects_declared_length() {
        let response =
            b"HTTP/1.1 200 OK\r\nContent-Length: 1000000\r\nConnection: close\r\n\r\nshort".to_vec();
        let uri = serve_once(response).await;

        let fetcher = loopback_fetcher(1024);
        let err = fetcher.fetch(&uri).await.unwrap_err();
        assert!(err.to_string().contains("exceeds 1024 bytes"), "{err}");
    }

    #[tokio::test]
    async fn test_http_fetch_within_cap() {
        let body = png_bytes(2, 2);
        let mut response =
            format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", body.len())
                .into_bytes();
        response.extend_from_slice(&body);
        let uri = serve_once(response).await;

        let fetcher = loopback_fetcher(1024 * 1024);
        assert_eq!(fetcher.fetch(&uri).await.unwrap(), body);
    }

    struct SlowFetcher;

    impl TextureFetcher for SlowFetcher {
        fn fetch(&self, _uri: &str) -> FetchFuture {
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
            .boxed()
        }
    }

    #[test]
    fn test_inline_png() {
        let source = TextureSource::parse(&png_data_uri(4, 2), 1 << 20).unwrap();
        match source {
            TextureSource::Inline(tex) => {
                assert_eq!(tex.mime_type, "image/png");
                assert_eq!((tex.width, tex.height), (4, 2));
            }
            other => panic!("expected inline texture, got {other:?}"),
        }
    }

    #[test]
    fn test_remote_uri() {
        let source = TextureSource::parse("https://cdn.example.com/oak.jpg", 1024).unwrap();
        assert_eq!(source, TextureSource::Remote("https://cdn.example.com/oak.jpg".into()));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            TextureSource::parse("oak.jpg", 1024),
            Err(EngineError::InvalidValue { .. })
        ));
        assert!(matches!(
            TextureSource::parse("data:image/png;base64,!!!", 1024),
            Err(EngineError::InvalidValue { .. })
        ));
        assert!(matches!(
            TextureSource::parse("data:text/plain,hello", 1024),
            Err(EngineError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_rejects_non_image_payload() {
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(b"not an image at all"));
        assert!(matches!(
            TextureSource::parse(&uri, 1024),
            Err(EngineError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_size_limit() {
        assert!(matches!(
            TextureSource::parse(&png_data_uri(64, 64), 16),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_abbreviate() {
        let long = "x".repeat(100);
        assert_eq!(abbreviate(&long).len(), 51);
        assert_eq!(abbreviate("short"), "short");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout() {
        let result = fetch_texture(
            Arc::new(SlowFetcher),
            "https://slow.example.com/t.png".into(),
            Duration::from_millis(100),
        )
        .await;
        assert!(matches!(result, Err(EngineError::Network(msg)) if msg.contains("timed out")));
    }
}
