use crate::{Error, Result};
use http::header::HeaderName;
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Uri;
use std::borrow::Cow;
use std::mem;
use std::str::FromStr;

/// Signing context for request.
///
/// Built from `http::request::Parts` by taking the uri and headers out, and
/// written back with [`SigningRequest::apply`] once signing is done.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, exactly as it appears on the wire.
    pub path: String,
    /// HTTP query parameters, still in their encoded form.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    v.split('&')
                        .filter(|pair| !pair.is_empty())
                        .map(|pair| match pair.split_once('=') {
                            Some((k, v)) => (k.to_string(), v.to_string()),
                            None => (pair.to_string(), String::new()),
                        })
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size();

        // Return headers back.
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if query_size == 0 {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get the path percent decoded.
    pub fn path_percent_decoded(&self) -> Cow<'_, str> {
        percent_encoding::percent_decode_str(&self.path).decode_utf8_lossy()
    }

    /// Get the query pairs percent decoded, with `+` treated as a space.
    pub fn query_percent_decoded(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .map(|(k, v)| {
                let decode = |s: &str| {
                    percent_encoding::percent_decode_str(&s.replace('+', " "))
                        .decode_utf8_lossy()
                        .into_owned()
                };
                (decode(k), decode(v))
            })
            .collect()
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Convert sorted query to string.
    ///
    /// ```shell
    /// [(a, b), (c, d)] => "a=b&c=d"
    /// ```
    pub fn query_to_string(mut query: Vec<(String, String)>, sep: &str, join: &str) -> String {
        let mut s = String::with_capacity(16);

        query.sort();

        for (idx, (k, v)) in query.into_iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }

            s.push_str(&k);
            s.push_str(sep);
            s.push_str(&v);
        }

        s
    }

    /// Get header value by name.
    ///
    /// Returns empty string if header not found.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Normalize header value by trimming surrounding spaces.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();

        let starting_index = bs.iter().position(|b| *b != b' ').unwrap_or(0);
        let ending_offset = bs.iter().rev().position(|b| *b != b' ').unwrap_or(0);
        let ending_index = bs.len() - ending_offset;

        // Trimming spaces from a valid value always yields a valid value.
        if let Ok(trimmed) = HeaderValue::from_bytes(&bs[starting_index..ending_index]) {
            *v = trimmed;
        }
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parts(uri: &str) -> http::request::Parts {
        http::Request::post(uri)
            .header("x-test", "  padded  ")
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0
    }

    #[test]
    fn test_build_and_apply_keeps_uri() {
        let mut p = parts("https://search.example.com:9200/_plugins/_sql?format=jdbc&pretty");
        let req = SigningRequest::build(&mut p).expect("build must succeed");
        assert_eq!(req.path, "/_plugins/_sql");
        assert_eq!(
            req.query,
            vec![
                ("format".to_string(), "jdbc".to_string()),
                ("pretty".to_string(), "".to_string())
            ]
        );
        req.apply(&mut p).expect("apply must succeed");
        assert_eq!(
            p.uri.to_string(),
            "https://search.example.com:9200/_plugins/_sql?format=jdbc&pretty"
        );
        assert_eq!(p.headers["x-test"], "  padded  ");
    }

    #[test]
    fn test_apply_drops_empty_query() {
        let mut p = parts("https://search.example.com/*?");
        let req = SigningRequest::build(&mut p).expect("build must succeed");
        assert!(req.query.is_empty());
        req.apply(&mut p).expect("apply must succeed");
        assert_eq!(p.uri.to_string(), "https://search.example.com/*");
    }

    #[test]
    fn test_query_percent_decoded() {
        let mut p = parts("https://search.example.com/?expand_wildcards=open%2Cclosed&q=a+b");
        let req = SigningRequest::build(&mut p).expect("build must succeed");
        assert_eq!(
            req.query_percent_decoded(),
            vec![
                ("expand_wildcards".to_string(), "open,closed".to_string()),
                ("q".to_string(), "a b".to_string())
            ]
        );
    }

    #[test]
    fn test_header_value_normalize() {
        let mut v = HeaderValue::from_static("  padded  ");
        SigningRequest::header_value_normalize(&mut v);
        assert_eq!(v, "padded");
    }

    #[test]
    fn test_build_requires_authority() {
        let mut p = parts("/relative");
        assert!(SigningRequest::build(&mut p).is_err());
    }
}
