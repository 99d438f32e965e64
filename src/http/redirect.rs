//! Bounded redirect following.
//!
//! The inner `reqwest::Client` is built with redirects disabled; media links on
//! the supported backends are often chained 301/302 hops (sometimes downgrading
//! HTTPS to HTTP) which this layer re-issues by hand.

use reqwest::{
    Client, Request, Response, StatusCode, Url,
    header::{AUTHORIZATION, COOKIE, LOCATION},
};

use crate::error::{ApiError, ApiResult};

pub const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct RedirectPolicy {
    max_hops: usize,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::new(MAX_REDIRECTS)
    }
}

impl RedirectPolicy {
    pub fn new(max_hops: usize) -> Self {
        Self { max_hops }
    }

    /// Sends `request`, re-issuing it against the `Location` target of every
    /// 301/302 response. At most `max_hops` redirects are followed; one more
    /// redirect fails with [`ApiError::TooManyRedirects`].
    pub async fn send(&self, client: &Client, mut request: Request) -> ApiResult<Response> {
        for hop in 0..=self.max_hops {
            let replay = request.try_clone();
            let response = client.execute(request).await?;

            if !Self::is_followed(response.status()) {
                return Ok(response);
            }
            if hop == self.max_hops {
                break;
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| ApiError::Malformed("redirect without Location header".into()))?;
            let target = response
                .url()
                .join(location)
                .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", location, e)))?;

            log::debug!(
                "Following redirect {}/{}: {} -> {}",
                hop + 1,
                self.max_hops,
                response.url(),
                target
            );

            request = replay
                .ok_or_else(|| ApiError::Malformed("request body cannot be replayed".into()))?;
            if !Self::same_origin(response.url(), &target) {
                let headers = request.headers_mut();
                headers.remove(COOKIE);
                headers.remove(AUTHORIZATION);
            }
            *request.url_mut() = target;
        }

        Err(ApiError::TooManyRedirects)
    }

    /// Credentials only travel to the host and port they were issued for.
    fn same_origin(from: &Url, to: &Url) -> bool {
        from.host_str() == to.host_str()
            && from.port_or_known_default() == to.port_or_known_default()
    }

    fn is_followed(status: StatusCode) -> bool {
        status == StatusCode::MOVED_PERMANENTLY || status == StatusCode::FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_compares_host_and_effective_port() {
        let url = |s: &str| Url::parse(s).unwrap();
        assert!(RedirectPolicy::same_origin(&url("http://a.com/x"), &url("http://a.com:80/y")));
        assert!(!RedirectPolicy::same_origin(&url("http://a.com/x"), &url("https://a.com/x")));
        assert!(!RedirectPolicy::same_origin(&url("http://127.0.0.1:1/"), &url("http://localhost:1/")));
        assert!(!RedirectPolicy::same_origin(&url("http://a.com:1/"), &url("http://a.com:2/")));
    }
}
