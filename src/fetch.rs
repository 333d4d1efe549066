//! Fetching metadata from a located publisher.
//!
//! The crate only locates publishers. Retrieving documents from them is
//! left to an HTTP client of the caller’s choice, plugged in through the
//! [`Fetcher`] trait.

use core::fmt;

/// The response header carrying the namespace of the returned document.
pub const NAMESPACE_HEADER: &str = "X-SMP-Namespace";

//------------ Fetcher -------------------------------------------------------

/// A type that can retrieve a document by its URI.
pub trait Fetcher {
    fn fetch(&self, uri: &str) -> Result<FetcherResponse, FetchError>;
}

impl<'a, F: Fetcher + ?Sized> Fetcher for &'a F {
    fn fetch(&self, uri: &str) -> Result<FetcherResponse, FetchError> {
        (**self).fetch(uri)
    }
}

//------------ FetcherResponse -----------------------------------------------

/// A successfully retrieved document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetcherResponse {
    body: Vec<u8>,
    namespace: Option<String>,
}

impl FetcherResponse {
    pub fn new(body: Vec<u8>, namespace: Option<String>) -> Self {
        FetcherResponse { body, namespace }
    }

    /// Creates a response from an HTTP status code.
    ///
    /// Only 200 is a success. A 404 means the publisher doesn't support the
    /// request, any other status is reported as is.
    pub fn from_status(
        status: u16,
        body: Vec<u8>,
        namespace: Option<String>,
    ) -> Result<Self, FetchError> {
        match status {
            200 => Ok(FetcherResponse::new(body, namespace)),
            404 => Err(FetchError::NotSupported),
            status => Err(FetchError::Status(status)),
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// The value of the `X-SMP-Namespace` header, if present.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

//------------ FetchError ----------------------------------------------------

/// Retrieving a document failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FetchError {
    /// The publisher answered with 404.
    NotSupported,

    /// The publisher answered with an unexpected status code.
    Status(u16),

    /// The publisher could not be reached.
    Transport(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchError::NotSupported => f.write_str("not supported"),
            FetchError::Status(status) => {
                write!(f, "received code {status} for lookup")
            }
            FetchError::Transport(msg) => write!(f, "unable to fetch: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

//============ Test ==========================================================
