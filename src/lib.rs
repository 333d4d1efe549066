//! Locating business document metadata services via the DNS.
//!
//! This crate implements the client side of the OASIS Business Document
//! Metadata Service Location (BDXL) specification as used by the Peppol
//! network. Given a participant identifier, it finds the URI of the
//! service metadata publisher (SMP) responsible for the participant:
//!
//! 1. The canonical form of the identifier is hashed and encoded into a
//!    host name below the domain of the service metadata locator (SML),
//!    see [hostname].
//! 2. The NAPTR records of that host name are resolved, retrying over UDP
//!    and then over TCP if the name servers don’t respond, see [resolv].
//! 3. The delegation rule of the first eligible record that matches the
//!    host name produces the URI, see [ddds].
//!
//! The [locator] module combines these steps into a single call.
//!
//! Fetching documents from the publisher is not part of this crate. The
//! [fetch] module only defines the interface an HTTP client needs to
//! provide.
//!
//! # Reference of Feature Flags
//!
//! * `serde`: Enables deserializing and serializing the configuration
//!   types via [serde](https://serde.rs/).
#![cfg_attr(feature = "stub", doc = "* `stub`: Enables [resolv::stub],")]
#![cfg_attr(not(feature = "stub"), doc = "* `stub`: Enables resolv::stub,")]
//!   a NAPTR query implementation built on the client transports of the
//!   [domain](https://github.com/nlnetlabs/domain) crate. This feature is
//!   enabled by default.

#![allow(renamed_and_removed_lints)]
#![allow(clippy::unknown_clippy_lints)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod ddds;
pub mod fetch;
pub mod hostname;
pub mod identifier;
pub mod locator;
pub mod resolv;
pub mod utils;
