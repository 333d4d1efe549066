//! Participant identifiers.
//!
//! A participant is named by a pair of an identifier scheme and a value
//! within that scheme. The scheme decides whether values are compared case
//! sensitively. For the common case-insensitive schemes, the value is
//! normalized to lower case when the identifier is created so that
//! equality and the canonical form never depend on how the caller spelled
//! it.

use core::fmt;
use core::str::FromStr;
use std::borrow::Cow;

//------------ Scheme --------------------------------------------------------

/// An identifier scheme.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Scheme {
    /// The scheme token, used verbatim.
    identifier: Cow<'static, str>,

    /// Whether values in this scheme are case sensitive.
    case_sensitive: bool,
}

impl Scheme {
    /// The ISO 6523 based scheme used for Peppol participants.
    pub const ISO6523_ACTORID_UPIS: Scheme = Scheme {
        identifier: Cow::Borrowed("iso6523-actorid-upis"),
        case_sensitive: false,
    };

    /// Creates a case-insensitive scheme.
    pub fn new(identifier: impl Into<Cow<'static, str>>) -> Self {
        Scheme {
            identifier: identifier.into(),
            case_sensitive: false,
        }
    }

    /// Creates a scheme whose values are compared case sensitively.
    pub fn case_sensitive(identifier: impl Into<Cow<'static, str>>) -> Self {
        Scheme {
            identifier: identifier.into(),
            case_sensitive: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.identifier
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Normalizes a value according to the rules of this scheme.
    fn normalize(&self, value: &str) -> String {
        let value = value.trim();
        if self.case_sensitive {
            value.into()
        } else {
            value.to_lowercase()
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}

//------------ ParticipantIdentifier -----------------------------------------

/// The identifier of a participant.
///
/// Values of this type are immutable. The value part is stored in its
/// normalized form.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ParticipantIdentifier {
    scheme: Scheme,
    value: String,
}

impl ParticipantIdentifier {
    /// Creates a new identifier, normalizing the value per `scheme`.
    pub fn new(
        scheme: Scheme,
        value: &str,
    ) -> Result<Self, IdentifierError> {
        if scheme.as_str().is_empty() {
            return Err(IdentifierError::EmptyScheme);
        }
        let value = scheme.normalize(value);
        if value.is_empty() {
            return Err(IdentifierError::EmptyValue);
        }
        Ok(ParticipantIdentifier { scheme, value })
    }

    /// Creates an identifier in the Peppol ISO 6523 scheme.
    pub fn iso6523(value: &str) -> Result<Self, IdentifierError> {
        Self::new(Scheme::ISO6523_ACTORID_UPIS, value)
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the canonical form `<scheme>::<value>`.
    ///
    /// These are the exact octets that get hashed for the host name.
    pub fn canonical(&self) -> String {
        format!("{}::{}", self.scheme, self.value)
    }
}

impl fmt::Display for ParticipantIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::{}", self.scheme, self.value)
    }
}

impl FromStr for ParticipantIdentifier {
    type Err = IdentifierError;

    /// Parses `<scheme>::<value>`.
    ///
    /// The scheme is split at the first `::`. Parsed schemes are treated as
    /// case insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, value) = s
            .split_once("::")
            .ok_or(IdentifierError::MissingSeparator)?;
        Self::new(Scheme::new(scheme.trim().to_owned()), value)
    }
}

//------------ IdentifierError -----------------------------------------------

/// An identifier could not be created.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IdentifierError {
    /// The string has no `::` between scheme and value.
    MissingSeparator,

    /// The scheme is empty.
    EmptyScheme,

    /// The value is empty after normalization.
    EmptyValue,
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IdentifierError::MissingSeparator => {
                f.write_str("missing '::' between scheme and value")
            }
            IdentifierError::EmptyScheme => f.write_str("empty scheme"),
            IdentifierError::EmptyValue => f.write_str("empty value"),
        }
    }
}

impl std::error::Error for IdentifierError {}

//============ Test ==========================================================
