//! Adapts `hickory-server`'s `RequestHandler` trait onto [`Engine`]: unwrap
//! the incoming wire query into a domain [`Question`], run the query
//! pipeline, and write the [`Response`] back onto the wire.

use crate::forwarding::record_type_map::{from_hickory, to_hickory};
use gudgeon_application::Engine;
use gudgeon_domain::{Question, RecordData, ResponseCode};
use hickory_proto::op::ResponseCode as HickoryResponseCode;
use hickory_proto::rr::rdata;
use hickory_proto::rr::{Name, RData, Record};
use hickory_server::authority::MessageResponseBuilder;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct DnsServerHandler {
    engine: Arc<Engine>,
    /// The address this handler's listener is bound to, used to answer
    /// `ENDPOINT`-policy blocked queries ("the interface that received
    /// the query").
    local_ip: IpAddr,
}

impl DnsServerHandler {
    pub fn new(engine: Arc<Engine>, local_ip: IpAddr) -> Self {
        Self { engine, local_ip }
    }
}

#[async_trait::async_trait]
impl RequestHandler for DnsServerHandler {
    async fn handle_request<R: ResponseHandler>(
        &self,
        request: &Request,
        mut response_handle: R,
    ) -> ResponseInfo {
        let request_info = match request.request_info() {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "failed to parse request info");
                return send_error(request, &mut response_handle, HickoryResponseCode::FormErr).await;
            }
        };

        let query = &request_info.query;
        let name = query.name().to_utf8();
        let hickory_record_type = query.query_type();
        let client_ip = request.src().ip();

        let record_type = from_hickory(hickory_record_type);
        let question = Question::new(name.clone(), record_type)
            .with_recursion_desired(request.header().recursion_desired());

        debug!(domain = %name, record_type = ?record_type, client = %client_ip, "query received");

        let (response, resolution) = self.engine.handle(&question, client_ip, self.local_ip).await;
        debug!(domain = %name, ?resolution, "query resolved");

        let code = to_hickory_response_code(response.code);
        if response.code != ResponseCode::NoError {
            if response.code != ResponseCode::NxDomain {
                warn!(domain = %name, code = ?response.code, "query did not resolve cleanly");
            }
            return send_error(request, &mut response_handle, code).await;
        }

        let record_name = Name::from_str(&name).unwrap_or_else(|_| Name::root());
        let ttl = response.min_ttl().unwrap_or(0);
        let records: Vec<Record> = response
            .answers
            .iter()
            .filter_map(|answer| to_hickory_rdata(&answer.data))
            .map(|rdata| Record::from_rdata(record_name.clone(), ttl, rdata))
            .collect();

        let builder = MessageResponseBuilder::from_message_request(request);
        let mut header = *request.header();
        header.set_recursion_available(true);
        header.set_response_code(code);
        let message = builder.build(header, records.iter(), &[], &[], &[]);

        match response_handle.send_response(message).await {
            Ok(info) => info,
            Err(e) => {
                error!(error = %e, "failed to send response");
                ResponseInfo::from(*request.header())
            }
        }
    }
}

fn to_hickory_response_code(code: ResponseCode) -> HickoryResponseCode {
    match code {
        ResponseCode::NoError => HickoryResponseCode::NoError,
        ResponseCode::NxDomain => HickoryResponseCode::NXDomain,
        ResponseCode::ServFail => HickoryResponseCode::ServFail,
        ResponseCode::Refused => HickoryResponseCode::Refused,
        ResponseCode::FormErr => HickoryResponseCode::FormErr,
        ResponseCode::NotImp => HickoryResponseCode::NotImp,
    }
}

fn to_hickory_rdata(data: &RecordData) -> Option<RData> {
    match data {
        RecordData::A(v4) => Some(RData::A(rdata::A(*v4))),
        RecordData::Aaaa(v6) => Some(RData::AAAA(rdata::AAAA(*v6))),
        RecordData::Cname(name) => Name::from_str(name).ok().map(rdata::CNAME).map(RData::CNAME),
        RecordData::Ptr(name) => Name::from_str(name).ok().map(rdata::PTR).map(RData::PTR),
        RecordData::Ns(name) => Name::from_str(name).ok().map(rdata::NS).map(RData::NS),
        RecordData::Txt(chunks) => Some(RData::TXT(rdata::TXT::new(chunks.clone()))),
        RecordData::Mx { preference, exchange } => Name::from_str(exchange)
            .ok()
            .map(|exchange| RData::MX(rdata::MX::new(*preference, exchange))),
        RecordData::Soa {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        } => {
            let mname = Name::from_str(mname).ok()?;
            let rname = Name::from_str(rname).ok()?;
            Some(RData::SOA(rdata::SOA::new(
                mname, rname, *serial, *refresh, *retry, *expire, *minimum,
            )))
        }
        RecordData::Raw { .. } => None,
    }
}

async fn send_error<R: ResponseHandler>(
    request: &Request,
    response_handle: &mut R,
    code: HickoryResponseCode,
) -> ResponseInfo {
    let builder = MessageResponseBuilder::from_message_request(request);
    let mut header = *request.header();
    header.set_response_code(code);
    header.set_recursion_available(true);
    let message = builder.build(header, &[], &[], &[], &[]);
    match response_handle.send_response(message).await {
        Ok(info) => info,
        Err(e) => {
            error!(error = %e, "failed to send error response");
            ResponseInfo::from(*request.header())
        }
    }
}
