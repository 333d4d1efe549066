//! Resolving the NAPTR records of a BDXL host name.
//!
//! A lookup runs a small state machine over a sequence of single DNS
//! queries. Queries first go out over UDP. Whenever a query fails with a
//! transient error, the next one is tried until the retry budget of the
//! policy is used up. At that point, the whole exercise is repeated over
//! TCP with a fresh budget. Authoritative negative answers end the lookup
//! immediately on either transport.
//!
//! The actual queries are performed by a [`NaptrQuery`] implementation.
//! The one used in production, [`StubQuery`][stub::StubQuery], is built
//! atop the client transports of the `domain` crate and is available with
//! the `stub` feature.

use crate::ddds::DelegationRecord;
use core::fmt;
use std::time::Duration;
use tracing::{debug, warn};

//------------ Sub-modules ---------------------------------------------------

#[cfg(feature = "stub")]
#[cfg_attr(docsrs, doc(cfg(feature = "stub")))]
pub mod stub;

//------------ ResolverPolicy ------------------------------------------------

/// How hard a lookup should try.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ResolverPolicy {
    /// The number of retries per transport after the first attempt.
    retries: usize,

    /// The time to wait for the answer to a single query.
    timeout: Duration,
}

impl ResolverPolicy {
    pub const DEFAULT_RETRIES: usize = 3;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(retries: usize, timeout: Duration) -> Self {
        ResolverPolicy { retries, timeout }
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the number of queries sent over a single transport.
    pub fn attempts_per_transport(&self) -> usize {
        self.retries.saturating_add(1)
    }
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        ResolverPolicy {
            retries: Self::DEFAULT_RETRIES,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

//------------ Transport -----------------------------------------------------

/// The transport a single query is sent over.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Transport {
    /// UDP, falling back to TCP for truncated answers.
    Udp,

    /// TCP only.
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Transport::Udp => f.write_str("UDP"),
            Transport::Tcp => f.write_str("TCP"),
        }
    }
}

//------------ QueryStatus ---------------------------------------------------

/// The outcome of a single NAPTR query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QueryStatus {
    /// The query returned NAPTR records.
    Successful(Vec<DelegationRecord>),

    /// A transient failure. Repeating the query may help.
    TryAgain,

    /// The host name does not exist.
    HostNotFound,

    /// The host name exists but has no NAPTR records.
    TypeNotFound,

    /// Any other failure. Repeating the query will not help.
    Unrecoverable(String),
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryStatus::Successful(records) => {
                write!(f, "successful ({} records)", records.len())
            }
            QueryStatus::TryAgain => f.write_str("try again"),
            QueryStatus::HostNotFound => f.write_str("host not found"),
            QueryStatus::TypeNotFound => f.write_str("type not found"),
            QueryStatus::Unrecoverable(msg) => {
                write!(f, "unrecoverable: {msg}")
            }
        }
    }
}

//------------ NaptrQuery ----------------------------------------------------

/// A type that can perform a single NAPTR query.
///
/// Implementations must not retry internally. Each call should send exactly
/// one query and wait no longer than `timeout` for its answer.
pub trait NaptrQuery {
    fn query(
        &self,
        qname: &str,
        transport: Transport,
        timeout: Duration,
    ) -> QueryStatus;
}

impl<'a, Q: NaptrQuery + ?Sized> NaptrQuery for &'a Q {
    fn query(
        &self,
        qname: &str,
        transport: Transport,
        timeout: Duration,
    ) -> QueryStatus {
        (**self).query(qname, transport, timeout)
    }
}

//------------ Resolution ----------------------------------------------------

/// The classified result of resolving a host name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// Records were found.
    Success(Vec<DelegationRecord>),

    /// There are definitely no records for the host name.
    NotFound,

    /// The lookup failed.
    Fatal(ResolveError),
}

//------------ State ---------------------------------------------------------

/// The state of a lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum State {
    /// The next query is to be sent.
    Attempt {
        /// The transport to use.
        transport: Transport,

        /// The attempts left on this transport, including this one.
        remaining: usize,
    },

    /// The lookup has finished.
    Done(Resolution),
}

impl State {
    /// Returns the initial state for `policy`.
    pub fn start(policy: &ResolverPolicy) -> Self {
        State::Attempt {
            transport: Transport::Udp,
            remaining: policy.attempts_per_transport(),
        }
    }

    /// Returns the state that follows receiving `status`.
    ///
    /// A finished state stays finished.
    pub fn next(self, status: QueryStatus, policy: &ResolverPolicy) -> Self {
        let (transport, remaining) = match self {
            State::Attempt {
                transport,
                remaining,
            } => (transport, remaining),
            done @ State::Done(_) => return done,
        };
        match status {
            QueryStatus::Successful(records) => {
                State::Done(Resolution::Success(records))
            }
            QueryStatus::HostNotFound | QueryStatus::TypeNotFound => {
                State::Done(Resolution::NotFound)
            }
            QueryStatus::Unrecoverable(msg) => {
                State::Done(Resolution::Fatal(ResolveError::Unrecoverable(
                    msg,
                )))
            }
            QueryStatus::TryAgain if remaining > 1 => State::Attempt {
                transport,
                remaining: remaining - 1,
            },
            QueryStatus::TryAgain => match transport {
                Transport::Udp => State::Attempt {
                    transport: Transport::Tcp,
                    remaining: policy.attempts_per_transport(),
                },
                Transport::Tcp => {
                    State::Done(Resolution::Fatal(ResolveError::Exhausted))
                }
            },
        }
    }
}

//------------ resolve -------------------------------------------------------

/// Resolves the NAPTR records for `hostname`.
///
/// Sends queries via `query` until the state machine reaches a final
/// state. Queries are strictly sequential.
pub fn resolve<Q: NaptrQuery + ?Sized>(
    query: &Q,
    hostname: &str,
    policy: &ResolverPolicy,
) -> Resolution {
    let mut state = State::start(policy);
    loop {
        let (transport, remaining) = match state {
            State::Attempt {
                transport,
                remaining,
            } => (transport, remaining),
            State::Done(resolution) => return resolution,
        };
        let attempt = policy.attempts_per_transport() - remaining + 1;
        let status = query.query(hostname, transport, policy.timeout());
        debug!(
            %hostname, %transport, attempt, %status,
            "NAPTR query attempt"
        );
        if status == QueryStatus::TryAgain && remaining == 1 {
            match transport {
                Transport::Udp => {
                    debug!(%hostname, "UDP attempts exhausted, trying TCP")
                }
                Transport::Tcp => {
                    warn!(%hostname, "all NAPTR query attempts failed")
                }
            }
        }
        state = state.next(status, policy);
    }
}

//------------ ResolveError --------------------------------------------------

/// Resolving failed in a way that is not a negative answer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolveError {
    /// A query failed in a way that repeating it will not fix.
    Unrecoverable(String),

    /// All attempts on both transports failed transiently.
    Exhausted,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolveError::Unrecoverable(msg) => {
                write!(f, "unrecoverable resolver error: {msg}")
            }
            ResolveError::Exhausted => {
                f.write_str("resolver did not answer over UDP or TCP")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

//============ Test ==========================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Plays back a scripted sequence of statuses.
    ///
    /// Once the script runs out, every further query returns `TryAgain`.
    struct Script {
        statuses: RefCell<VecDeque<QueryStatus>>,
        log: RefCell<Vec<Transport>>,
    }

    impl Script {
        fn new(statuses: impl IntoIterator<Item = QueryStatus>) -> Self {
            Script {
                statuses: RefCell::new(statuses.into_iter().collect()),
                log: RefCell::new(Vec::new()),
            }
        }

        fn transports(&self) -> Vec<Transport> {
            self.log.borrow().clone()
        }
    }

    impl NaptrQuery for Script {
        fn query(
            &self,
            _: &str,
            transport: Transport,
            _: Duration,
        ) -> QueryStatus {
            self.log.borrow_mut().push(transport);
            self.statuses
                .borrow_mut()
                .pop_front()
                .unwrap_or(QueryStatus::TryAgain)
        }
    }

    fn record() -> DelegationRecord {
        DelegationRecord::new(
            10,
            10,
            "U",
            "Meta:SMP",
            "!^.*$!https://smp.example.org/!",
        )
    }

    #[test]
    fn default_policy() {
        let policy = ResolverPolicy::default();
        assert_eq!(policy.retries(), 3);
        assert_eq!(policy.timeout(), Duration::from_secs(30));
        assert_eq!(policy.attempts_per_transport(), 4);
    }

    #[test]
    fn try_again_exhausts_both_transports() {
        let policy = ResolverPolicy::default();
        let script = Script::new([]);
        assert_eq!(
            resolve(&script, "host.example", &policy),
            Resolution::Fatal(ResolveError::Exhausted)
        );
        let mut expected = vec![Transport::Udp; 4];
        expected.extend([Transport::Tcp; 4]);
        assert_eq!(script.transports(), expected);
    }

    #[test]
    fn zero_retries() {
        let policy = ResolverPolicy::default().with_retries(0);
        let script = Script::new([]);
        assert_eq!(
            resolve(&script, "host.example", &policy),
            Resolution::Fatal(ResolveError::Exhausted)
        );
        assert_eq!(script.transports(), [Transport::Udp, Transport::Tcp]);
    }

    #[test]
    fn host_not_found_short_circuits() {
        let policy = ResolverPolicy::default();
        let script = Script::new([QueryStatus::HostNotFound]);
        assert_eq!(
            resolve(&script, "host.example", &policy),
            Resolution::NotFound
        );
        assert_eq!(script.transports(), [Transport::Udp]);
    }

    #[test]
    fn type_not_found_over_tcp() {
        let policy = ResolverPolicy::default().with_retries(1);
        let script = Script::new([
            QueryStatus::TryAgain,
            QueryStatus::TryAgain,
            QueryStatus::TypeNotFound,
        ]);
        assert_eq!(
            resolve(&script, "host.example", &policy),
            Resolution::NotFound
        );
        assert_eq!(
            script.transports(),
            [Transport::Udp, Transport::Udp, Transport::Tcp]
        );
    }

    #[test]
    fn success_after_retry() {
        let policy = ResolverPolicy::default();
        let script = Script::new([
            QueryStatus::TryAgain,
            QueryStatus::Successful(vec![record()]),
        ]);
        assert_eq!(
            resolve(&script, "host.example", &policy),
            Resolution::Success(vec![record()])
        );
        assert_eq!(script.transports(), [Transport::Udp, Transport::Udp]);
    }

    #[test]
    fn unrecoverable_is_fatal() {
        let policy = ResolverPolicy::default();
        let script =
            Script::new([QueryStatus::Unrecoverable("REFUSED".into())]);
        assert_eq!(
            resolve(&script, "host.example", &policy),
            Resolution::Fatal(ResolveError::Unrecoverable("REFUSED".into()))
        );
        assert_eq!(script.transports().len(), 1);
    }

    #[test]
    fn transitions() {
        let policy = ResolverPolicy::default().with_retries(1);
        let state = State::start(&policy);
        assert_eq!(
            state,
            State::Attempt {
                transport: Transport::Udp,
                remaining: 2
            }
        );
        let state = state.next(QueryStatus::TryAgain, &policy);
        assert_eq!(
            state,
            State::Attempt {
                transport: Transport::Udp,
                remaining: 1
            }
        );
        let state = state.next(QueryStatus::TryAgain, &policy);
        assert_eq!(
            state,
            State::Attempt {
                transport: Transport::Tcp,
                remaining: 2
            }
        );
        let done = State::Done(Resolution::NotFound);
        assert_eq!(
            done.clone().next(QueryStatus::Successful(vec![]), &policy),
            done
        );
    }
}
