//! Locator configuration.
//!
//! All configuration is checked when it is created. A [`LocatorConfig`]
//! that exists can be used for any number of lookups without ever causing
//! a configuration error.
//!
//! With the `serde` feature, the configuration can be deserialized from a
//! flat representation:
//!
//! ```text
//! {
//!     "prefix": "",
//!     "domain_suffix": "edelivery.tech.ec.europa.eu",
//!     "algorithm": "SHA-256",
//!     "encoding": "base32",
//!     "retries": 3,
//!     "timeout_secs": 30
//! }
//! ```
//!
//! All fields but `domain_suffix` are optional.

use crate::hostname::{DigestAlgorithm, HostnameConfig, TextEncoding};
use crate::resolv::ResolverPolicy;
use core::fmt;

/// The SML zone of the production Peppol network.
pub const PEPPOL_PRODUCTION_ZONE: &str = "edelivery.tech.ec.europa.eu";

/// The SML zone of the Peppol test network.
pub const PEPPOL_TEST_ZONE: &str = "acc.edelivery.tech.ec.europa.eu";

//------------ LocatorConfig -------------------------------------------------

/// The complete configuration of a participant locator.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "FlatConfig", into = "FlatConfig")
)]
pub struct LocatorConfig {
    pub hostname: HostnameConfig,
    pub policy: ResolverPolicy,
}

impl LocatorConfig {
    pub fn new(hostname: HostnameConfig, policy: ResolverPolicy) -> Self {
        LocatorConfig { hostname, policy }
    }

    /// The defaults for the production Peppol SML.
    pub fn peppol_production() -> Self {
        Self::with_zone(PEPPOL_PRODUCTION_ZONE)
    }

    /// The defaults for the Peppol test SML.
    pub fn peppol_test() -> Self {
        Self::with_zone(PEPPOL_TEST_ZONE)
    }

    fn with_zone(zone: &'static str) -> Self {
        LocatorConfig {
            hostname: HostnameConfig {
                prefix: String::new(),
                domain_suffix: zone.into(),
                digest: DigestAlgorithm::default(),
                encoding: TextEncoding::default(),
            },
            policy: ResolverPolicy::default(),
        }
    }
}

//------------ FlatConfig ----------------------------------------------------

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct FlatConfig {
    #[serde(default)]
    prefix: String,
    domain_suffix: String,
    #[serde(default)]
    algorithm: DigestAlgorithm,
    #[serde(default)]
    encoding: TextEncoding,
    #[serde(default = "default_retries")]
    retries: usize,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

#[cfg(feature = "serde")]
fn default_retries() -> usize {
    ResolverPolicy::DEFAULT_RETRIES
}

#[cfg(feature = "serde")]
fn default_timeout_secs() -> u64 {
    ResolverPolicy::DEFAULT_TIMEOUT.as_secs()
}

#[cfg(feature = "serde")]
impl TryFrom<FlatConfig> for LocatorConfig {
    type Error = ConfigError;

    fn try_from(flat: FlatConfig) -> Result<Self, Self::Error> {
        Ok(LocatorConfig {
            hostname: HostnameConfig::new(
                flat.prefix,
                flat.domain_suffix,
                flat.algorithm,
                flat.encoding,
            )?,
            policy: ResolverPolicy::default()
                .with_retries(flat.retries)
                .with_timeout(std::time::Duration::from_secs(
                    flat.timeout_secs,
                )),
        })
    }
}

#[cfg(feature = "serde")]
impl From<LocatorConfig> for FlatConfig {
    fn from(config: LocatorConfig) -> Self {
        FlatConfig {
            prefix: config.hostname.prefix().into(),
            domain_suffix: config.hostname.domain_suffix().into(),
            algorithm: config.hostname.digest(),
            encoding: config.hostname.encoding(),
            retries: config.policy.retries(),
            timeout_secs: config.policy.timeout().as_secs(),
        }
    }
}

//------------ ConfigError ---------------------------------------------------

/// The configuration is not usable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The digest algorithm name is not known.
    UnknownAlgorithm(String),

    /// The text encoding name is not known.
    UnknownEncoding(String),

    /// The prefix contains characters not allowed in a host label.
    InvalidPrefix(String),

    /// The domain suffix is not a valid host name.
    InvalidDomain(String),

    /// Prefix and encoded digest together exceed the label limit.
    LabelTooLong(usize),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::UnknownAlgorithm(name) => {
                write!(f, "unknown digest algorithm '{name}'")
            }
            ConfigError::UnknownEncoding(name) => {
                write!(f, "unknown text encoding '{name}'")
            }
            ConfigError::InvalidPrefix(prefix) => {
                write!(f, "invalid host label prefix '{prefix}'")
            }
            ConfigError::InvalidDomain(domain) => {
                write!(f, "invalid domain suffix '{domain}'")
            }
            ConfigError::LabelTooLong(len) => {
                write!(f, "host label of {len} characters exceeds 63")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

//============ Test ==========================================================
