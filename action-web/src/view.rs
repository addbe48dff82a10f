//! Rendering collaborators. Actions hand control over to pages through a [ViewResolver], while
//! failed actions are turned into responses by an [ErrorRenderer].

use crate::attributes::{Attributes, ERROR_ATTRIBUTE};
use crate::dispatcher::DispatchError;
use crate::error::{convert_error, ErrorPtr};
use crate::future::{BoxFuture, FutureExt};
use axum::body::Bytes;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
#[cfg(test)]
use mockall::automock;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Result of rendering a page.
#[derive(Clone, Debug, Default)]
pub struct RenderedView {
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
}

/// Resolves page URLs to rendered content. Attributes of the current request are available for
/// resolvers which support them.
#[cfg_attr(test, automock)]
pub trait ViewResolver {
    fn render(
        &self,
        url: &str,
        attributes: &Attributes,
    ) -> BoxFuture<'_, Result<RenderedView, ErrorPtr>>;
}

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Page URL escapes the view root: {0}")]
    InvalidPath(String),
    #[error("Error reading page {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Serves pages as static files from a root directory.
#[derive(Clone, Debug)]
pub struct FileViewResolver {
    root: PathBuf,
}

impl FileViewResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_path(&self, url: &str) -> Result<PathBuf, ViewError> {
        let relative = Path::new(url.split(['?', '#']).next().unwrap_or_default());
        let mut path = self.root.clone();

        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(ViewError::InvalidPath(url.to_string()))
                }
            }
        }

        Ok(path)
    }
}

fn content_type_for(path: &Path) -> Option<HeaderValue> {
    let content_type = match path.extension()?.to_str()? {
        "html" | "htm" => "text/html; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        _ => return None,
    };

    Some(HeaderValue::from_static(content_type))
}

impl ViewResolver for FileViewResolver {
    fn render(
        &self,
        url: &str,
        _attributes: &Attributes,
    ) -> BoxFuture<'_, Result<RenderedView, ErrorPtr>> {
        let path = self.resolve_path(url);

        async move {
            let path = path.map_err(convert_error)?;
            debug!(?path, "Reading page");

            let body = tokio::fs::read(&path)
                .await
                .map_err(|source| ViewError::ReadError {
                    path: path.clone(),
                    source,
                })
                .map_err(convert_error)?;

            Ok(RenderedView {
                body: body.into(),
                content_type: content_type_for(&path),
            })
        }
        .boxed()
    }
}

/// Turns failed actions into responses. The cause of the failure is available in the request
/// attributes under [ERROR_ATTRIBUTE].
#[cfg_attr(test, automock)]
pub trait ErrorRenderer {
    fn render(&self, error: DispatchError) -> Response;
}

/// Renders a plain `500 Internal Server Error` response with the failure cause.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultErrorRenderer;

impl ErrorRenderer for DefaultErrorRenderer {
    fn render(&self, error: DispatchError) -> Response {
        let message = error
            .context()
            .attribute::<ErrorPtr>(ERROR_ATTRIBUTE)
            .map(|cause| format!("Action failed: {cause}"))
            .unwrap_or_else(|| error.to_string());

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            )],
            message,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::attributes::Attributes;
    use crate::view::{FileViewResolver, ViewResolver};
    use std::fs;

    #[tokio::test]
    async fn should_render_file_from_root() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("blog")).unwrap();
        fs::write(root.path().join("blog/list.html"), "<ul></ul>").unwrap();

        let resolver = FileViewResolver::new(root.path());
        let view = resolver
            .render("/blog/list.html?page=2", &Attributes::default())
            .await
            .unwrap();

        assert_eq!(&view.body[..], b"<ul></ul>");
        assert_eq!(
            view.content_type.unwrap().to_str().unwrap(),
            "text/html; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn should_reject_escaping_paths() {
        let root = tempfile::tempdir().unwrap();
        let resolver = FileViewResolver::new(root.path());

        let error = resolver
            .render("/../secret.txt", &Attributes::default())
            .await
            .unwrap_err();
        assert!(error.to_string().contains("escapes the view root"));
    }

    #[tokio::test]
    async fn should_fail_on_missing_page() {
        let root = tempfile::tempdir().unwrap();
        let resolver = FileViewResolver::new(root.path());

        assert!(resolver
            .render("missing.html", &Attributes::default())
            .await
            .is_err());
    }
}
