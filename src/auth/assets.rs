//! Static assets under `/auth/assets/`.

use std::path::Path;

use axum::{
    body::Body,
    http::{Request, StatusCode, Uri},
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// URL prefix assets are served under.
pub const ASSETS_PREFIX: &str = "/auth/assets";

/// Files from a directory on disk.
#[derive(Debug, Clone)]
pub struct AssetService {
    dir: ServeDir,
}

impl AssetService {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: ServeDir::new(root.as_ref()),
        }
    }

    /// Serve the file named by the request path, or `None` when there is none.
    pub async fn serve(&self, request: Request<Body>) -> Option<Response> {
        let (mut parts, body) = request.into_parts();
        parts.uri = strip_prefix(&parts.uri)?;

        let response = match self.dir.clone().oneshot(Request::from_parts(parts, body)).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if response.status() == StatusCode::NOT_FOUND {
            return None;
        }
        Some(response.map(Body::new))
    }
}

fn strip_prefix(uri: &Uri) -> Option<Uri> {
    let rest = uri.path().strip_prefix(ASSETS_PREFIX)?;
    if !rest.starts_with('/') || rest.len() == 1 {
        return None;
    }

    let path_and_query = match uri.query() {
        Some(query) => format!("{}?{}", rest, query),
        None => rest.to_string(),
    };
    Uri::builder().path_and_query(path_and_query).build().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_strip_prefix() {
        let uri: Uri = "/auth/assets/css/main.css?v=2".parse().unwrap();
        assert_eq!(strip_prefix(&uri).unwrap(), "/css/main.css?v=2");
        assert!(strip_prefix(&"/auth/assets/".parse().unwrap()).is_none());
        assert!(strip_prefix(&"/auth/assetsx".parse().unwrap()).is_none());
    }

    #[tokio::test]
    async fn test_serves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.css"), "body { margin: 0 }").unwrap();
        let assets = AssetService::new(dir.path());

        let response = assets.serve(get("/auth/assets/main.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/css");
    }

    #[tokio::test]
    async fn test_missing_file_and_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let assets = AssetService::new(dir.path());

        assert!(assets.serve(get("/auth/assets/missing.js")).await.is_none());
        assert!(assets.serve(get("/auth/assets/../Cargo.toml")).await.is_none());
    }
}
