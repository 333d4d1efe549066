//! NAPTR queries via the client transports of the `domain` crate.
//!
//! Every query is a single exchange with a single server. UDP queries are
//! sent exactly once and only fall back to TCP if the answer is truncated.
//! Retransmissions are left to the state machine in the parent module.
//!
//! The servers are taken from a resolver configuration. Successive
//! queries go to the configured servers in turn. Each query runs on its
//! own current-thread Tokio runtime, so queries block the calling thread.

use super::{NaptrQuery, QueryStatus, Transport};
use crate::ddds::DelegationRecord;
use bytes::Bytes;
use domain::base::iana::Rcode;
use domain::base::message::Message;
use domain::base::message_builder::MessageBuilder;
use domain::base::name::Name;
use domain::base::Rtype;
use domain::net::client::protocol::{TcpConnect, UdpConnect};
use domain::net::client::request::{self, RequestMessage, SendRequest};
use domain::net::client::{dgram, dgram_stream, multi_stream, stream};
use domain::rdata::Naptr;
use domain::resolv::stub::conf::{self, ResolvConf, ServerConf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime;
use tracing::trace;

type Request = RequestMessage<Vec<u8>>;

//------------ StubQuery -----------------------------------------------------

/// Performs NAPTR queries against the configured recursive resolvers.
#[derive(Debug)]
pub struct StubQuery {
    conf: ResolvConf,

    /// The index of the server for the next query.
    next: AtomicUsize,
}

impl StubQuery {
    /// Creates a value using the system’s resolver configuration.
    pub fn new() -> Self {
        Self::from_conf(ResolvConf::default())
    }

    /// Creates a value using the given resolver configuration.
    ///
    /// Only the server list of `conf` is used. Its options are replaced
    /// by the transport and timeout of each query.
    pub fn from_conf(conf: ResolvConf) -> Self {
        StubQuery {
            conf,
            next: AtomicUsize::new(0),
        }
    }

    fn next_server(&self) -> Option<&ServerConf> {
        if self.conf.servers.is_empty() {
            return None;
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        self.conf.servers.get(idx % self.conf.servers.len())
    }
}

impl Default for StubQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StubQuery {
    fn clone(&self) -> Self {
        Self::from_conf(self.conf.clone())
    }
}

impl NaptrQuery for StubQuery {
    fn query(
        &self,
        qname: &str,
        transport: Transport,
        timeout: Duration,
    ) -> QueryStatus {
        let request = match build_request(qname) {
            Ok(request) => request,
            Err(err) => return QueryStatus::Unrecoverable(err),
        };
        let server = match self.next_server() {
            Some(server) => server,
            None => {
                return QueryStatus::Unrecoverable(
                    "no name servers configured".into(),
                )
            }
        };
        let runtime = match runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => return QueryStatus::Unrecoverable(err.to_string()),
        };
        let res = runtime.block_on(async {
            tokio::time::timeout(
                timeout,
                exchange(server, transport, timeout, request),
            )
            .await
        });
        match res {
            Ok(Ok(response)) => classify_response(&response),
            Ok(Err(err)) => {
                trace!(%qname, %transport, server = %server.addr, "{err}");
                classify_error(&err)
            }
            Err(_) => {
                trace!(
                    %qname, %transport, server = %server.addr,
                    "query timed out"
                );
                QueryStatus::TryAgain
            }
        }
    }
}

/// Creates a recursive NAPTR query for `qname`.
fn build_request(qname: &str) -> Result<Request, String> {
    let name = Name::<Vec<u8>>::from_str(qname)
        .map_err(|err| format!("invalid query name '{qname}': {err}"))?;
    let mut msg = MessageBuilder::new_vec();
    msg.header_mut().set_rd(true);
    let mut msg = msg.question();
    msg.push((name, Rtype::NAPTR))
        .map_err(|err| format!("cannot build query: {err}"))?;
    RequestMessage::new(msg)
        .map_err(|err| format!("cannot build query: {err}"))
}

/// Sends `request` to `server` once.
async fn exchange(
    server: &ServerConf,
    transport: Transport,
    timeout: Duration,
    request: Request,
) -> Result<Message<Bytes>, request::Error> {
    let mut stream_config = stream::Config::new();
    stream_config.set_response_timeout(timeout);
    let stream_config = multi_stream::Config::from(stream_config);

    if transport == Transport::Tcp || server.transport == conf::Transport::Tcp
    {
        let (conn, tran) = multi_stream::Connection::<Request>::with_config(
            TcpConnect::new(server.addr),
            stream_config,
        );
        tokio::spawn(tran.run());
        let mut response = conn.send_request(request);
        response.get_response().await
    } else {
        let mut dgram_config = dgram::Config::new();
        dgram_config.set_max_retries(0);
        dgram_config.set_read_timeout(timeout);
        let (conn, tran) =
            dgram_stream::Connection::<_, Request>::with_config(
                UdpConnect::new(server.addr),
                TcpConnect::new(server.addr),
                dgram_stream::Config::from_parts(dgram_config, stream_config),
            );
        tokio::spawn(tran.run());
        let mut response = conn.send_request(request);
        response.get_response().await
    }
}

//------------ Classification ------------------------------------------------

/// Classifies a response and extracts its NAPTR records.
fn classify_response(response: &Message<Bytes>) -> QueryStatus {
    let rcode = response.header().rcode();
    if rcode != Rcode::NOERROR {
        return classify(rcode, Vec::new());
    }
    let section = match response.answer() {
        Ok(section) => section,
        Err(err) => {
            return QueryStatus::Unrecoverable(format!(
                "malformed answer: {err}"
            ))
        }
    };
    let mut records = Vec::new();
    for record in section.limit_to::<Naptr<_, _>>() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                return QueryStatus::Unrecoverable(format!(
                    "malformed NAPTR record: {err}"
                ))
            }
        };
        let data = record.data();
        records.push(DelegationRecord::new(
            data.order(),
            data.preference(),
            String::from_utf8_lossy(data.flags().as_slice()),
            String::from_utf8_lossy(data.services().as_slice()),
            String::from_utf8_lossy(data.regexp().as_slice()),
        ));
    }
    classify(rcode, records)
}

/// Classifies a response by its rcode and the NAPTR records it carried.
fn classify(rcode: Rcode, records: Vec<DelegationRecord>) -> QueryStatus {
    if rcode == Rcode::NOERROR {
        if records.is_empty() {
            QueryStatus::TypeNotFound
        } else {
            QueryStatus::Successful(records)
        }
    } else if rcode == Rcode::NXDOMAIN {
        QueryStatus::HostNotFound
    } else if rcode == Rcode::SERVFAIL {
        QueryStatus::TryAgain
    } else {
        QueryStatus::Unrecoverable(format!("server responded with {rcode}"))
    }
}

/// Classifies a failed exchange.
///
/// Broken messages won't get better by asking again. Everything else is
/// a network problem that may go away.
fn classify_error(err: &request::Error) -> QueryStatus {
    use request::Error::*;

    match err {
        MessageParseError | ShortMessage | FormError | StreamLongMessage
        | OptTooLong | MessageBuilderPushError => {
            QueryStatus::Unrecoverable(err.to_string())
        }
        _ => QueryStatus::TryAgain,
    }
}

//============ Test ==========================================================
