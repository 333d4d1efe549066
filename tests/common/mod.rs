//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use domain_bdxl::ddds::{DelegationRecord, SMP_SERVICE};
use domain_bdxl::resolv::{NaptrQuery, QueryStatus, Transport};
use tracing_subscriber::EnvFilter;

/// Setup logging of events reported by the crate and the test suite.
///
/// Use the RUST_LOG environment variable to override the defaults.
///
/// E.g. To enable debug level logging:
///   RUST_LOG=DEBUG
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_ids(true)
        .without_time()
        .try_init()
        .ok();
}

//------------ Attempt -------------------------------------------------------

/// A query received by a [`ScriptedQuery`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attempt {
    pub qname: String,
    pub transport: Transport,
    pub timeout: Duration,
}

//------------ ScriptedQuery -------------------------------------------------

/// A NAPTR query stub that plays back a script of statuses.
///
/// Every query is recorded. Once the script has run out, the fallback
/// status is returned.
pub struct ScriptedQuery {
    script: Mutex<VecDeque<QueryStatus>>,
    fallback: QueryStatus,
    attempts: Mutex<Vec<Attempt>>,
}

impl ScriptedQuery {
    pub fn new(script: impl IntoIterator<Item = QueryStatus>) -> Self {
        Self::with_fallback(script, QueryStatus::TryAgain)
    }

    pub fn with_fallback(
        script: impl IntoIterator<Item = QueryStatus>,
        fallback: QueryStatus,
    ) -> Self {
        ScriptedQuery {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with the given records.
    pub fn answering(records: Vec<DelegationRecord>) -> Self {
        Self::with_fallback([], QueryStatus::Successful(records))
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn transports(&self) -> Vec<Transport> {
        self.attempts().into_iter().map(|a| a.transport).collect()
    }
}

impl NaptrQuery for ScriptedQuery {
    fn query(
        &self,
        qname: &str,
        transport: Transport,
        timeout: Duration,
    ) -> QueryStatus {
        self.attempts.lock().unwrap().push(Attempt {
            qname: qname.into(),
            transport,
            timeout,
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Returns an eligible record with the given rule.
pub fn smp_record(rule: &str) -> DelegationRecord {
    DelegationRecord::new(100, 10, "U", SMP_SERVICE, rule)
}
