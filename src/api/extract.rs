use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// Identifier the rate limiter keys on.
///
/// First entry of `X-Forwarded-For` when present, else the socket peer,
/// else `"unknown"` (e.g. when the router runs without connect info).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        if let Some(ip) = forwarded {
            return Ok(ClientIp(ip.to_string()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientIp(peer.unwrap_or_else(|| "unknown".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> String {
        let (mut parts, _) = request.into_parts();
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        ip
    }

    #[tokio::test]
    async fn test_forwarded_header_wins() {
        let request = Request::builder()
            .header("x-forwarded-for", "1.2.3.4, 10.0.0.1")
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))))
            .body(())
            .unwrap();
        assert_eq!(extract(request).await, "1.2.3.4");
    }

    #[tokio::test]
    async fn test_peer_address() {
        let request = Request::builder()
            .extension(ConnectInfo(SocketAddr::from(([192, 168, 1, 7], 9000))))
            .body(())
            .unwrap();
        assert_eq!(extract(request).await, "192.168.1.7");
    }

    #[tokio::test]
    async fn test_unknown() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(extract(request).await, "unknown");
    }
}
