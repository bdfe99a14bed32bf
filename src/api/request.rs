//! Request descriptors.
//!
//! An [`ApiRequest`] is built once per call and may be sent twice (original
//! attempt and the retry after a token refresh), so bodies are kept in a
//! re-sendable form: JSON is encoded up front, multipart forms are rebuilt
//! from a [`MultipartBody`] on every attempt.

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;

use super::error::ClientError;

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    /// Already-encoded JSON bytes.
    Json(Vec<u8>),
    Multipart(MultipartBody),
}

#[derive(Debug, Clone)]
enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        bytes: Vec<u8>,
        file_name: Option<String>,
        mime: Option<String>,
    },
}

/// Multipart form that can be converted into a transport form any number of times.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    fields: Vec<MultipartField>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plain text field.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(MultipartField::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a file part. `mime` is validated when the form is sent.
    pub fn file(
        mut self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        file_name: Option<String>,
        mime: Option<String>,
    ) -> Self {
        self.fields.push(MultipartField::File {
            name: name.into(),
            bytes,
            file_name,
            mime,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn to_form(&self) -> Result<Form, reqwest::Error> {
        let mut form = Form::new();
        for field in &self.fields {
            form = match field {
                MultipartField::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartField::File {
                    name,
                    bytes,
                    file_name,
                    mime,
                } => {
                    let mut part = Part::bytes(bytes.clone());
                    if let Some(file_name) = file_name {
                        part = part.file_name(file_name.clone());
                    }
                    if let Some(mime) = mime {
                        part = part.mime_str(mime)?;
                    }
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

/// One call against the backend: method, path relative to the base URL, body,
/// and whether the stored access token should be attached.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: RequestBody,
    include_auth: bool,
}

impl ApiRequest {
    /// Authenticated request without a body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            include_auth: true,
        }
    }

    /// Authenticated request with a JSON-encoded body.
    pub fn json<B>(method: Method, path: impl Into<String>, body: &B) -> Result<Self, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let encoded = serde_json::to_vec(body).map_err(ClientError::Encode)?;
        Ok(Self {
            body: RequestBody::Json(encoded),
            ..Self::new(method, path)
        })
    }

    /// Authenticated multipart POST (file upload).
    pub fn multipart(path: impl Into<String>, form: MultipartBody) -> Self {
        Self {
            body: RequestBody::Multipart(form),
            ..Self::new(Method::POST, path)
        }
    }

    /// Send without an `Authorization` header and without the refresh-on-401 cycle.
    pub fn without_auth(mut self) -> Self {
        self.include_auth = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn include_auth(&self) -> bool {
        self.include_auth
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.body, RequestBody::Multipart(_))
    }
}

/// Append percent-encoded query parameters to a request path.
pub fn with_query<K, V>(path: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return path.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                urlencoding::encode(k.as_ref()),
                urlencoding::encode(v.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{}{}{}", path, separator, query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_request_is_authenticated_and_empty() {
        let req = ApiRequest::new(Method::GET, "subadmin/notifications/");
        assert!(req.include_auth());
        assert!(!req.is_multipart());
        assert!(matches!(req.body(), RequestBody::Empty));
        assert_eq!(req.path(), "subadmin/notifications/");
    }

    #[test]
    fn test_json_body_is_encoded_once() {
        let req = ApiRequest::json(Method::POST, "tickets/", &json!({"subject": "Broken POS"})).unwrap();
        match req.body() {
            RequestBody::Json(bytes) => {
                let decoded: serde_json::Value = serde_json::from_slice(bytes).unwrap();
                assert_eq!(decoded, json!({"subject": "Broken POS"}));
            }
            other => panic!("expected JSON body, got {:?}", other),
        }
    }

    #[test]
    fn test_without_auth() {
        let req = ApiRequest::new(Method::POST, "auth/login/").without_auth();
        assert!(!req.include_auth());
    }

    #[test]
    fn test_multipart_request() {
        let form = MultipartBody::new()
            .text("title", "Menu")
            .file("image", vec![1, 2, 3], Some("menu.png".to_string()), Some("image/png".to_string()));
        assert_eq!(form.len(), 2);

        let req = ApiRequest::multipart("uploads/", form);
        assert!(req.is_multipart());
        assert_eq!(req.method(), &Method::POST);
        assert!(req.include_auth());
    }

    #[test]
    fn test_invalid_mime_is_reported_on_conversion() {
        let form = MultipartBody::new().file("f", vec![0], None, Some("not a mime".to_string()));
        assert!(form.to_form().is_err());
    }

    #[test]
    fn test_with_query() {
        assert_eq!(with_query::<&str, &str>("tickets/", &[]), "tickets/");
        assert_eq!(
            with_query("tickets/", &[("page", "2"), ("status", "in progress")]),
            "tickets/?page=2&status=in%20progress"
        );
        assert_eq!(
            with_query("tickets/?page=1", &[("q", "a&b")]),
            "tickets/?page=1&q=a%26b"
        );
    }
}
