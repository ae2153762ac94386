//! HTTP/1.1 request parsing using the [`httparse`] crate.

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete, more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
}

/// Decoded query-string parameters.
///
/// Keys may repeat (`?page=1&page=2`); every value is kept in the order it
/// appeared. Decoding follows `application/x-www-form-urlencoded`, so `+`
/// becomes a space and `%XX` escapes are resolved.
///
/// # Examples
///
/// ```
/// use catfacts::http::QueryParams;
///
/// let params = QueryParams::parse("page=2&sortByLength=desc&page=3");
/// assert_eq!(params.first("page"), Some("2"));
/// assert_eq!(params.get_all("page").collect::<Vec<_>>(), vec!["2", "3"]);
/// assert_eq!(params.first("sortByLength"), Some("desc"));
/// assert_eq!(params.first("missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Decodes a raw query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Returns the first value recorded for `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get_all(key).next()
    }

    /// Returns every value recorded for `key`, in order of appearance.
    pub fn get_all<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` when no parameters were supplied.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A fully parsed HTTP/1.1 request.
///
/// Created by [`Request::parse`] from a raw byte buffer.
///
/// # Examples
///
/// ```
/// use catfacts::http::request::Request;
///
/// let raw = b"GET /api/facts?perPage=5 HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let (request, _offset) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/api/facts");
/// assert_eq!(request.query().first("perPage"), Some("5"));
/// assert_eq!(request.headers().get("host"), Some("localhost"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    query: QueryParams,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers we support per request.
    const MAX_HEADERS: usize = 64;

    /// Parse a raw HTTP/1.1 request from a byte slice.
    ///
    /// Returns the parsed `Request` and the byte offset at which the body begins
    /// in `buf`. The body holds at most `Content-Length` bytes of what is
    /// already buffered.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`]: more data is needed to complete the request headers.
    /// - [`RequestError::Parse`]: the data is malformed and cannot be parsed.
    /// - [`RequestError::MissingField`]: a required field (method, path, version) is absent.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let Ok(method) = raw_req
            .method
            .ok_or(RequestError::MissingField { field: "method" })?
            .parse::<Method>();

        let raw_path = raw_req
            .path
            .ok_or(RequestError::MissingField { field: "path" })?;

        let (path, query) = match raw_path.split_once('?') {
            Some((path, query)) => (path.to_owned(), QueryParams::parse(query)),
            None => (raw_path.to_owned(), QueryParams::default()),
        };

        let version = raw_req
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let mut header_map = Headers::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        let available = &buf[body_offset..];
        let body_len = header_map
            .get("content-length")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map_or(0, |len| len.min(available.len()));
        let body = Bytes::copy_from_slice(&available[..body_len]);

        Ok((
            Self {
                method,
                path,
                version,
                headers: header_map,
                query,
                body,
            },
            body_offset,
        ))
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the HTTP minor version number (0 = HTTP/1.0, 1 = HTTP/1.1).
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the decoded query parameters.
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Returns the request body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns `true` if the connection should be kept alive after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive. HTTP/1.0 defaults to close unless
    /// `Connection: keep-alive` is explicitly set.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }

    /// Returns the value of the `Content-Length` header parsed as a `usize`, if present.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.method(), &Method::Get);
        assert_eq!(req.path(), "/");
        assert_eq!(req.version(), 1);
        assert!(req.query().is_empty());
        assert_eq!(offset, raw.len());
    }

    #[test]
    fn parse_facts_query() {
        let raw = b"GET /api/facts?perPage=5&page=2&sortByAlphabet=asc HTTP/1.1\r\nHost: x\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.path(), "/api/facts");
        assert_eq!(req.query().first("perPage"), Some("5"));
        assert_eq!(req.query().first("page"), Some("2"));
        assert_eq!(req.query().first("sortByAlphabet"), Some("asc"));
    }

    #[test]
    fn query_values_are_form_decoded() {
        let params = QueryParams::parse("q=cats+and%20dogs&flag");
        assert_eq!(params.first("q"), Some("cats and dogs"));
        assert_eq!(params.first("flag"), Some(""));
    }

    #[test]
    fn repeated_keys_keep_every_value() {
        let params = QueryParams::parse("page=1&page=4");
        assert_eq!(params.get_all("page").collect::<Vec<_>>(), vec!["1", "4"]);
    }

    #[test]
    fn looked_up_values_outlive_the_key() {
        let params = QueryParams::parse("page=2&sortByLength=asc");
        let (page, sort) = {
            let page_key = String::from("page");
            let sort_key = String::from("sortByLength");
            (params.first(&page_key), params.get_all(&sort_key).collect::<Vec<_>>())
        };
        assert_eq!(page, Some("2"));
        assert_eq!(sort, vec!["asc"]);
    }

    #[test]
    fn incomplete_request() {
        let raw = b"GET / HTTP/1.1\r\nHost:";
        assert!(matches!(Request::parse(raw), Err(RequestError::Incomplete)));
    }

    #[test]
    fn malformed_request_is_parse_error() {
        let raw = b"GET / HTTP/9\r\n\r\n";
        assert!(matches!(Request::parse(raw), Err(RequestError::Parse(_))));
    }

    #[test]
    fn keep_alive_defaults() {
        let (v11, _) = Request::parse(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
        assert!(v11.is_keep_alive());
        let (v10, _) = Request::parse(b"GET / HTTP/1.0\r\nHost: a\r\n\r\n").unwrap();
        assert!(!v10.is_keep_alive());
        let (close, _) =
            Request::parse(b"GET / HTTP/1.1\r\nHost: a\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!close.is_keep_alive());
    }

    #[test]
    fn body_is_bounded_by_content_length() {
        let raw = b"POST /api/facts HTTP/1.1\r\nContent-Length: 5\r\n\r\nhelloGET / HTTP/1.1\r\n";
        let (req, body_offset) = Request::parse(raw).unwrap();
        assert_eq!(req.content_length(), Some(5));
        assert_eq!(req.body().as_ref(), b"hello");
        assert_eq!(&raw[body_offset..body_offset + 5], b"hello");
    }
}
