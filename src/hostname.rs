//! Generating BDXL host names for participants.
//!
//! The host name under which a participant's NAPTR records are published
//! is derived from the participant identifier alone. The canonical form of
//! the identifier is hashed, the digest is encoded into a single host
//! label, and the label is placed in front of the domain of the location
//! service:
//!
//! ```text
//! <prefix><encoded digest>.<domain suffix>
//! ```
//!
//! The encoding's padding characters are never part of the label since
//! the host name grammar doesn't permit them.

use crate::config::ConfigError;
use crate::identifier::ParticipantIdentifier;
use crate::utils::{base16, base32};
use core::fmt;
use core::str::FromStr;
use sha2::{Digest, Sha224, Sha256};
use tracing::trace;

/// The maximum length of a single host label.
const MAX_LABEL_LEN: usize = 63;

/// The maximum length of a host name in presentation format.
const MAX_NAME_LEN: usize = 253;

//------------ DigestAlgorithm -----------------------------------------------

/// The digest algorithm used to hash the canonical identifier.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "&'static str")
)]
pub enum DigestAlgorithm {
    Sha224,

    #[default]
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the digest of `data`.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        }
    }

    /// Returns the length of the digest in octets.
    pub fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha256 => 32,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha224 => "SHA-224",
            DigestAlgorithm::Sha256 => "SHA-256",
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = ConfigError;

    /// Parses names like `SHA-256`, `sha256`, or `Sha-224`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name: String = s
            .trim()
            .chars()
            .filter(|ch| *ch != '-' && *ch != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match name.as_str() {
            "SHA224" => Ok(DigestAlgorithm::Sha224),
            "SHA256" => Ok(DigestAlgorithm::Sha256),
            _ => Err(ConfigError::UnknownAlgorithm(s.into())),
        }
    }
}

impl TryFrom<String> for DigestAlgorithm {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DigestAlgorithm> for &'static str {
    fn from(alg: DigestAlgorithm) -> Self {
        alg.as_str()
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------ TextEncoding --------------------------------------------------

/// The text encoding used to turn the digest into a host label.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "&'static str")
)]
pub enum TextEncoding {
    /// Base 32 with the standard RFC 4648 alphabet.
    #[default]
    Base32,

    /// Base 32 with the extended hex alphabet.
    Base32Hex,

    /// Base 16, upper case.
    Base16,
}

impl TextEncoding {
    /// Encodes `data`, including any padding the encoding produces.
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            TextEncoding::Base32 => base32::encode_string(data),
            TextEncoding::Base32Hex => base32::encode_string_hex(data),
            TextEncoding::Base16 => base16::encode_string(data),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextEncoding::Base32 => "base32",
            TextEncoding::Base32Hex => "base32hex",
            TextEncoding::Base16 => "base16",
        }
    }
}

impl FromStr for TextEncoding {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base32" => Ok(TextEncoding::Base32),
            "base32hex" => Ok(TextEncoding::Base32Hex),
            "base16" | "hex" => Ok(TextEncoding::Base16),
            _ => Err(ConfigError::UnknownEncoding(s.into())),
        }
    }
}

impl TryFrom<String> for TextEncoding {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TextEncoding> for &'static str {
    fn from(enc: TextEncoding) -> Self {
        enc.as_str()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------ HostnameConfig ------------------------------------------------

/// The parameters for host name generation.
///
/// A value can only be created through [`HostnameConfig::new`] which
/// rejects combinations that would never produce a valid host name.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct HostnameConfig {
    pub(crate) prefix: String,
    pub(crate) domain_suffix: String,
    pub(crate) digest: DigestAlgorithm,
    pub(crate) encoding: TextEncoding,
}

impl HostnameConfig {
    pub fn new(
        prefix: impl Into<String>,
        domain_suffix: impl Into<String>,
        digest: DigestAlgorithm,
        encoding: TextEncoding,
    ) -> Result<Self, ConfigError> {
        let prefix = prefix.into();
        let domain_suffix = domain_suffix.into();
        let domain_suffix = domain_suffix.trim_end_matches('.').to_owned();

        if !prefix.chars().all(is_label_char) {
            return Err(ConfigError::InvalidPrefix(prefix));
        }
        check_domain(&domain_suffix)?;

        let label_len = prefix.len() + encoded_len(digest, encoding);
        if label_len > MAX_LABEL_LEN {
            return Err(ConfigError::LabelTooLong(label_len));
        }
        if label_len + 1 + domain_suffix.len() > MAX_NAME_LEN {
            return Err(ConfigError::InvalidDomain(domain_suffix));
        }

        Ok(HostnameConfig {
            prefix,
            domain_suffix,
            digest,
            encoding,
        })
    }

    /// Creates a configuration with no prefix, SHA-256 and base 32.
    pub fn with_domain(
        domain_suffix: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            "",
            domain_suffix,
            DigestAlgorithm::default(),
            TextEncoding::default(),
        )
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn domain_suffix(&self) -> &str {
        &self.domain_suffix
    }

    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

/// Returns the length of an encoded digest without padding.
fn encoded_len(digest: DigestAlgorithm, encoding: TextEncoding) -> usize {
    strip_padding(&encoding.encode(&vec![0; digest.output_len()])).len()
}

fn strip_padding(s: &str) -> &str {
    s.trim_end_matches(base32::PADDING)
}

fn is_label_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn check_domain(domain: &str) -> Result<(), ConfigError> {
    let valid = !domain.is_empty()
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= MAX_LABEL_LEN
                && label.chars().all(is_label_char)
        });
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidDomain(domain.into()))
    }
}

//------------ HostnameGenerator ---------------------------------------------

/// Generates the host name to query for a participant.
#[derive(Clone, Debug)]
pub struct HostnameGenerator {
    config: HostnameConfig,
}

impl HostnameGenerator {
    pub fn new(config: HostnameConfig) -> Self {
        HostnameGenerator { config }
    }

    pub fn config(&self) -> &HostnameConfig {
        &self.config
    }

    /// Returns the host name for `identifier`.
    ///
    /// The result is deterministic and never contains padding characters.
    pub fn generate(&self, identifier: &ParticipantIdentifier) -> String {
        let canonical = identifier.canonical();
        let digest = self.config.digest.digest(canonical.as_bytes());
        let encoded = self.config.encoding.encode(&digest);
        let hostname = format!(
            "{}{}.{}",
            self.config.prefix,
            strip_padding(&encoded),
            self.config.domain_suffix
        );
        trace!(%identifier, %hostname, "generated BDXL host name");
        hostname
    }
}

//============ Test ==========================================================
