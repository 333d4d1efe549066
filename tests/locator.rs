//! End-to-end tests of participant lookups against a scripted resolver.

mod common;

use std::cell::RefCell;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::rstest;

use common::{init_logging, smp_record, ScriptedQuery};
use domain_bdxl::config::LocatorConfig;
use domain_bdxl::ddds::DelegationRecord;
use domain_bdxl::fetch::{FetchError, Fetcher, FetcherResponse};
use domain_bdxl::hostname::{DigestAlgorithm, HostnameConfig, TextEncoding};
use domain_bdxl::identifier::ParticipantIdentifier;
use domain_bdxl::locator::{
    LocateError, LookupError, LookupOutcome, ParticipantLocator,
};
use domain_bdxl::resolv::{
    QueryStatus, ResolveError, ResolverPolicy, Transport,
};

const SML: &str = "edelivery.tech.ec.europa.eu";

/// Base 32 of SHA-256 over `iso6523-actorid-upis::9908:810418052`.
const LABEL: &str = "T7KVKUXLCPTOUTP5SPNXFNYSL7BT43TVMXWOCL5DUQDYZ7A7UNDQ";

fn participant() -> ParticipantIdentifier {
    ParticipantIdentifier::iso6523("9908:810418052").unwrap()
}

fn config(prefix: &str) -> LocatorConfig {
    LocatorConfig::new(
        HostnameConfig::new(
            prefix,
            SML,
            DigestAlgorithm::Sha256,
            TextEncoding::Base32,
        )
        .unwrap(),
        ResolverPolicy::default(),
    )
}

fn locator(query: ScriptedQuery) -> ParticipantLocator<ScriptedQuery> {
    init_logging();
    ParticipantLocator::with_query(config(""), query)
}

#[test]
fn resolves_participant() {
    let locator = locator(ScriptedQuery::answering(vec![smp_record(
        "!^.*$!https://smp.example.org/!",
    )]));
    assert_eq!(
        locator.locate(&participant()),
        LookupOutcome::Resolved("https://smp.example.org/".into())
    );

    let hostname = format!("{LABEL}.{SML}");
    assert_eq!(locator.hostname(&participant()), hostname);
    assert!(!hostname.contains('='));
}

#[test]
fn queries_generated_hostname_with_policy_timeout() {
    init_logging();
    let query = ScriptedQuery::new([QueryStatus::TryAgain]);
    let mut config = config("");
    config.policy = config.policy.with_timeout(Duration::from_secs(5));
    let locator = ParticipantLocator::with_query(config, &query);
    locator.locate(&participant());

    let attempts = query.attempts();
    assert_eq!(attempts.len(), 8);
    for attempt in attempts {
        assert_eq!(attempt.qname, format!("{LABEL}.{SML}"));
        assert_eq!(attempt.timeout, Duration::from_secs(5));
    }
}

#[test]
fn prefixed_hostname() {
    init_logging();
    let query = ScriptedQuery::answering(vec![smp_record(
        r"!^B-([A-Z2-7]+)\..*$!https://\\1.smp.example/!",
    )]);
    let locator = ParticipantLocator::with_query(config("B-"), &query);
    assert_eq!(
        locator.locate(&participant()),
        LookupOutcome::Resolved(format!("https://{LABEL}.smp.example/"))
    );
    let attempts = query.attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].qname, format!("B-{LABEL}.{SML}"));
    assert_eq!(attempts[0].transport, Transport::Udp);
    assert_eq!(attempts[0].timeout, Duration::from_secs(30));
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(3)]
#[case(5)]
fn exhausted_budget_is_fatal(#[case] retries: usize) {
    init_logging();
    let query = ScriptedQuery::new([]);
    let mut config = config("");
    config.policy = config.policy.with_retries(retries);
    let locator = ParticipantLocator::with_query(config, &query);

    assert_eq!(
        locator.locate(&participant()),
        LookupOutcome::LookupFailed(
            participant(),
            LookupError::Resolve(ResolveError::Exhausted)
        )
    );
    let mut expected = vec![Transport::Udp; retries + 1];
    expected.extend(vec![Transport::Tcp; retries + 1]);
    assert_eq!(query.transports(), expected);
}

#[rstest]
#[case(QueryStatus::HostNotFound)]
#[case(QueryStatus::TypeNotFound)]
fn authoritative_negative_short_circuits(#[case] status: QueryStatus) {
    init_logging();
    let query = ScriptedQuery::new([status]);
    let locator = ParticipantLocator::with_query(config(""), &query);
    assert_eq!(
        locator.locate(&participant()),
        LookupOutcome::NotFound(participant())
    );
    assert_eq!(query.transports(), [Transport::Udp]);
}

#[test]
fn tcp_fallback_recovers() {
    init_logging();
    let mut script = vec![QueryStatus::TryAgain; 4];
    script.push(QueryStatus::Successful(vec![smp_record(
        "!.*!https://smp.example.org/!",
    )]));
    let query = ScriptedQuery::new(script);
    let locator = ParticipantLocator::with_query(config(""), &query);
    assert_eq!(
        locator.locate(&participant()),
        LookupOutcome::Resolved("https://smp.example.org/".into())
    );
    assert_eq!(query.transports().last(), Some(&Transport::Tcp));
    assert_eq!(query.attempts().len(), 5);
}

#[test]
fn unrecoverable_failure() {
    let locator = locator(ScriptedQuery::new([QueryStatus::Unrecoverable(
        "server responded with REFUSED".into(),
    )]));
    match locator.locate(&participant()) {
        LookupOutcome::LookupFailed(id, LookupError::Resolve(err)) => {
            assert_eq!(id, participant());
            assert_eq!(
                err,
                ResolveError::Unrecoverable(
                    "server responded with REFUSED".into()
                )
            );
        }
        outcome => panic!("unexpected outcome {outcome:?}"),
    }
}

#[test]
fn malformed_rule_falls_through() {
    let fallback = locator(ScriptedQuery::answering(vec![
        smp_record("!^.*$!"),
        smp_record("!^.*$!https://fallback.example.org/!"),
    ]));
    assert_eq!(
        fallback.locate(&participant()),
        LookupOutcome::Resolved("https://fallback.example.org/".into())
    );

    let broken =
        locator(ScriptedQuery::answering(vec![smp_record("!^.*$!")]));
    assert_eq!(
        broken.locate(&participant()),
        LookupOutcome::NotFound(participant())
    );
}

#[test]
fn no_eligible_record_is_not_found() {
    let locator = locator(ScriptedQuery::answering(vec![
        DelegationRecord::new(1, 1, "S", "Meta:SMP", "!.*!https://a/!"),
        DelegationRecord::new(1, 1, "U", "Meta:Other", "!.*!https://b/!"),
        smp_record("!^nomatch$!https://c/!"),
    ]));
    assert_eq!(
        locator.locate(&participant()),
        LookupOutcome::NotFound(participant())
    );
}

#[test]
fn empty_answer_is_not_found() {
    let locator = locator(ScriptedQuery::answering(Vec::new()));
    assert_eq!(
        locator.locate(&participant()),
        LookupOutcome::NotFound(participant())
    );
}

#[test]
fn relative_result_is_rejected() {
    let locator = locator(ScriptedQuery::answering(vec![smp_record(
        "!.*!smp.example/!",
    )]));
    assert_eq!(
        locator.locate(&participant()),
        LookupOutcome::LookupFailed(
            participant(),
            LookupError::InvalidUri("smp.example/".into())
        )
    );
}

#[test]
fn concurrent_lookups() {
    let locator = Arc::new(locator(ScriptedQuery::answering(vec![smp_record(
        "!.*!https://smp.example.org/!",
    )])));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let locator = locator.clone();
            thread::spawn(move || {
                let id =
                    ParticipantIdentifier::iso6523(&format!("0088:{i}"))
                        .unwrap();
                locator.locate(&id)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(
            handle.join().unwrap(),
            LookupOutcome::Resolved("https://smp.example.org/".into())
        );
    }
}

//------------ Fetching ------------------------------------------------------

struct RecordingFetcher {
    uris: RefCell<Vec<String>>,
    status: u16,
}

impl RecordingFetcher {
    fn new(status: u16) -> Self {
        RecordingFetcher {
            uris: RefCell::new(Vec::new()),
            status,
        }
    }
}

impl Fetcher for RecordingFetcher {
    fn fetch(&self, uri: &str) -> Result<FetcherResponse, FetchError> {
        self.uris.borrow_mut().push(uri.into());
        FetcherResponse::from_status(
            self.status,
            b"<ServiceGroup/>".to_vec(),
            None,
        )
    }
}

#[test]
fn locate_and_fetch() {
    let locator = locator(ScriptedQuery::answering(vec![smp_record(
        "!.*!https://smp.example.org/!",
    )]));

    let fetcher = RecordingFetcher::new(200);
    let response =
        locator.locate_and_fetch(&participant(), &fetcher).unwrap();
    assert_eq!(response.body(), b"<ServiceGroup/>");
    assert_eq!(*fetcher.uris.borrow(), ["https://smp.example.org/"]);

    let fetcher = RecordingFetcher::new(404);
    assert_eq!(
        locator.locate_and_fetch(&participant(), &fetcher),
        Err(LocateError::Fetch(
            "https://smp.example.org/".into(),
            FetchError::NotSupported
        ))
    );
}

#[test]
fn fetch_is_skipped_when_not_found() {
    let locator = locator(ScriptedQuery::new([QueryStatus::HostNotFound]));
    let fetcher = RecordingFetcher::new(200);
    assert_eq!(
        locator.locate_and_fetch(&participant(), &fetcher),
        Err(LocateError::NotFound(participant()))
    );
    assert!(fetcher.uris.borrow().is_empty());
}
