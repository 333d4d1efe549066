//! Locating the metadata publisher of a participant.
//!
//! [`ParticipantLocator`] ties the pieces together: it generates the host
//! name for a participant, resolves its NAPTR records, and applies their
//! delegation rules. The result is always one of the three variants of
//! [`LookupOutcome`].
//!
//! ```no_run
//! use domain_bdxl::config::LocatorConfig;
//! use domain_bdxl::identifier::ParticipantIdentifier;
//! use domain_bdxl::locator::{LookupOutcome, ParticipantLocator};
//!
//! let locator = ParticipantLocator::new(LocatorConfig::peppol_production());
//! let participant =
//!     ParticipantIdentifier::iso6523("9908:810418052").unwrap();
//! match locator.locate(&participant) {
//!     LookupOutcome::Resolved(uri) => println!("{uri}"),
//!     LookupOutcome::NotFound(id) => println!("{id} is not registered"),
//!     LookupOutcome::LookupFailed(id, err) => println!("{id}: {err}"),
//! }
//! ```

use crate::config::LocatorConfig;
use crate::ddds;
use crate::fetch::{FetchError, Fetcher, FetcherResponse};
use crate::hostname::HostnameGenerator;
use crate::identifier::ParticipantIdentifier;
use crate::resolv::{
    self, NaptrQuery, Resolution, ResolveError, ResolverPolicy,
};
use core::fmt;
use tracing::{debug, warn};

#[cfg(feature = "stub")]
use crate::resolv::stub::StubQuery;

//------------ LookupOutcome -------------------------------------------------

/// The result of locating a participant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LookupOutcome {
    /// The URI of the participant’s metadata publisher.
    Resolved(String),

    /// The participant is not registered.
    NotFound(ParticipantIdentifier),

    /// The lookup failed. Trying again later may succeed.
    LookupFailed(ParticipantIdentifier, LookupError),
}

impl LookupOutcome {
    /// Converts the outcome into a result.
    pub fn into_result(self) -> Result<String, LocateError> {
        match self {
            LookupOutcome::Resolved(uri) => Ok(uri),
            LookupOutcome::NotFound(id) => Err(LocateError::NotFound(id)),
            LookupOutcome::LookupFailed(id, err) => {
                Err(LocateError::LookupFailed(id, err))
            }
        }
    }
}

//------------ ParticipantLocator --------------------------------------------

/// Locates metadata publishers via BDXL.
///
/// A locator holds only immutable configuration and can be shared between
/// threads if its query implementation can.
#[derive(Clone, Debug)]
pub struct ParticipantLocator<Q> {
    generator: HostnameGenerator,
    policy: ResolverPolicy,
    query: Q,
}

#[cfg(feature = "stub")]
#[cfg_attr(docsrs, doc(cfg(feature = "stub")))]
impl ParticipantLocator<StubQuery> {
    /// Creates a locator using the system’s resolver configuration.
    pub fn new(config: LocatorConfig) -> Self {
        Self::with_query(config, StubQuery::new())
    }
}

impl<Q: NaptrQuery> ParticipantLocator<Q> {
    /// Creates a locator that sends its queries via `query`.
    pub fn with_query(config: LocatorConfig, query: Q) -> Self {
        ParticipantLocator {
            generator: HostnameGenerator::new(config.hostname),
            policy: config.policy,
            query,
        }
    }

    pub fn policy(&self) -> &ResolverPolicy {
        &self.policy
    }

    /// Returns the host name queried for `identifier`.
    pub fn hostname(&self, identifier: &ParticipantIdentifier) -> String {
        self.generator.generate(identifier)
    }

    /// Locates the metadata publisher of `identifier`.
    pub fn locate(
        &self,
        identifier: &ParticipantIdentifier,
    ) -> LookupOutcome {
        let hostname = self.hostname(identifier);
        debug!(%identifier, %hostname, "looking up participant");

        let resolution =
            resolv::resolve(&self.query, &hostname, &self.policy);
        let outcome = match resolution {
            Resolution::NotFound => {
                LookupOutcome::NotFound(identifier.clone())
            }
            Resolution::Fatal(err) => LookupOutcome::LookupFailed(
                identifier.clone(),
                LookupError::Resolve(err),
            ),
            Resolution::Success(records) => {
                match ddds::evaluate(&records, &hostname) {
                    Some(uri) if is_absolute_uri(&uri) => {
                        LookupOutcome::Resolved(uri)
                    }
                    Some(uri) => LookupOutcome::LookupFailed(
                        identifier.clone(),
                        LookupError::InvalidUri(uri),
                    ),
                    None => LookupOutcome::NotFound(identifier.clone()),
                }
            }
        };

        match &outcome {
            LookupOutcome::Resolved(uri) => {
                debug!(%identifier, %uri, "participant located")
            }
            LookupOutcome::NotFound(_) => {
                debug!(%identifier, "participant not registered")
            }
            LookupOutcome::LookupFailed(_, err) => {
                warn!(%identifier, "participant lookup failed: {err}")
            }
        }
        outcome
    }

    /// Locates the publisher of `identifier` and fetches the located URI.
    pub fn locate_and_fetch<F: Fetcher + ?Sized>(
        &self,
        identifier: &ParticipantIdentifier,
        fetcher: &F,
    ) -> Result<FetcherResponse, LocateError> {
        let uri = self.locate(identifier).into_result()?;
        fetcher
            .fetch(&uri)
            .map_err(|err| LocateError::Fetch(uri, err))
    }
}

/// Returns whether `uri` starts with a scheme and is free of whitespace.
fn is_absolute_uri(uri: &str) -> bool {
    let (scheme, rest) = match uri.split_once(':') {
        Some(parts) => parts,
        None => return false,
    };
    let mut chars = scheme.chars();
    chars.next().map_or(false, |ch| ch.is_ascii_alphabetic())
        && chars.all(|ch| {
            ch.is_ascii_alphanumeric() || ch == '+' || ch == '-' || ch == '.'
        })
        && !rest.is_empty()
        && !uri.chars().any(|ch| ch.is_whitespace() || ch.is_control())
}

//------------ LookupError ---------------------------------------------------

/// Why a lookup failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LookupError {
    /// Resolving the NAPTR records failed.
    Resolve(ResolveError),

    /// The matching rule did not produce an absolute URI.
    InvalidUri(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LookupError::Resolve(err) => fmt::Display::fmt(err, f),
            LookupError::InvalidUri(uri) => {
                write!(f, "rule produced invalid URI '{uri}'")
            }
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LookupError::Resolve(err) => Some(err),
            LookupError::InvalidUri(_) => None,
        }
    }
}

impl From<ResolveError> for LookupError {
    fn from(err: ResolveError) -> Self {
        LookupError::Resolve(err)
    }
}

//------------ LocateError ---------------------------------------------------

/// Locating or fetching failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LocateError {
    /// The participant is not registered.
    NotFound(ParticipantIdentifier),

    /// The lookup failed.
    LookupFailed(ParticipantIdentifier, LookupError),

    /// Fetching from the located URI failed.
    Fetch(String, FetchError),
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LocateError::NotFound(id) => {
                write!(f, "identifier '{id}' is not registered in SML")
            }
            LocateError::LookupFailed(id, err) => {
                write!(f, "error when looking up identifier '{id}': {err}")
            }
            LocateError::Fetch(uri, err) => {
                write!(f, "error when fetching '{uri}': {err}")
            }
        }
    }
}

impl std::error::Error for LocateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LocateError::NotFound(_) => None,
            LocateError::LookupFailed(_, err) => Some(err),
            LocateError::Fetch(_, err) => Some(err),
        }
    }
}

//============ Test ==========================================================
