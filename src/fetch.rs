//! Fetching grammar sources.
//!
//! On the command line, `http://` and `https://` URIs are requested over the
//! network and everything else is read from disk. In the browser the page's
//! own `fetch` is used (see `JsFetcher` in the crate root).

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub status: u16,
    pub status_text: String,
    #[serde(default)]
    pub body: String,
}

impl FetchResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can retrieve the text behind a URI.
///
/// `Err` is reserved for transport failures; HTTP-level failures are
/// reported through the response status.
pub trait Fetch {
    async fn get(&self, uri: &str) -> Result<FetchResponse, String>;
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::*;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::*;
    use std::path::PathBuf;

    fn is_http(uri: &str) -> bool {
        uri.starts_with("http://") || uri.starts_with("https://")
    }

    ////////////////////////////////////////////////////////////////////////////
    // Files

    /// Serves `file://` URIs and plain paths from a directory on disk.
    pub struct FileFetcher {
        root: PathBuf,
    }

    impl FileFetcher {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            FileFetcher { root: root.into() }
        }

        fn resolve(&self, uri: &str) -> PathBuf {
            let path = PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri));
            if path.is_absolute() {
                path
            } else {
                self.root.join(path)
            }
        }
    }

    impl Fetch for FileFetcher {
        async fn get(&self, uri: &str) -> Result<FetchResponse, String> {
            use std::io::ErrorKind;

            if is_http(uri) {
                return Err(format!("{} is not a file URI", uri));
            }

            let path = self.resolve(uri);
            log::debug!("Fetching {} from {}", uri, path.display());

            let (status, status_text, body) =
                match tokio::fs::read_to_string(&path).await {
                    Ok(body) => (200, "OK", body),
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        (404, "Not Found", String::new())
                    }
                    Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                        (403, "Forbidden", String::new())
                    }
                    Err(e) => return Err(e.to_string()),
                };

            Ok(FetchResponse {
                status,
                status_text: status_text.to_owned(),
                body,
            })
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // HTTP

    /// Issues a GET request for `http://` and `https://` URIs.
    pub struct HttpFetcher;

    fn get_blocking(uri: &str) -> Result<FetchResponse, String> {
        let response = match ureq::get(uri).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(e) => return Err(e.to_string()),
        };
        let status = response.status();
        let status_text = response.status_text().to_owned();
        let body = response.into_string().map_err(|e| e.to_string())?;
        Ok(FetchResponse {
            status,
            status_text,
            body,
        })
    }

    impl Fetch for HttpFetcher {
        async fn get(&self, uri: &str) -> Result<FetchResponse, String> {
            log::debug!("Requesting {}", uri);
            let uri = uri.to_owned();
            tokio::task::spawn_blocking(move || get_blocking(&uri))
                .await
                .map_err(|e| e.to_string())?
        }
    }

    ////////////////////////////////////////////////////////////////////////////
    // Both

    /// Picks [`HttpFetcher`] or [`FileFetcher`] by the URI's scheme.
    pub struct UriFetcher {
        files: FileFetcher,
        http: HttpFetcher,
    }

    impl UriFetcher {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            UriFetcher {
                files: FileFetcher::new(root),
                http: HttpFetcher,
            }
        }
    }

    impl Fetch for UriFetcher {
        async fn get(&self, uri: &str) -> Result<FetchResponse, String> {
            if is_http(uri) {
                self.http.get(uri).await
            } else {
                self.files.get(uri).await
            }
        }
    }
}
