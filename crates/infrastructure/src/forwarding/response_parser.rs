//! Parses raw DNS wire responses into the domain's transport-agnostic
//! [`Response`]/[`ResourceRecord`] shape.

use gudgeon_domain::{DomainError, RecordData, Response, ResponseCode, ResourceRecord};
use hickory_proto::op::{Message, ResponseCode as HickoryRcode};
use hickory_proto::rr::{RData, Record};

pub fn parse(bytes: &[u8]) -> Result<(Response, bool), DomainError> {
    let message =
        Message::from_vec(bytes).map_err(|e| DomainError::Transport(e.to_string()))?;
    let truncated = message.truncated();
    let code = to_response_code(message.response_code());
    let answers = message.answers().iter().filter_map(to_resource_record).collect();

    Ok((
        Response {
            code,
            answers,
            authoritative: message.authoritative(),
        },
        truncated,
    ))
}

fn to_response_code(rcode: HickoryRcode) -> ResponseCode {
    match rcode {
        HickoryRcode::NoError => ResponseCode::NoError,
        HickoryRcode::NXDomain => ResponseCode::NxDomain,
        HickoryRcode::Refused => ResponseCode::Refused,
        HickoryRcode::FormErr => ResponseCode::FormErr,
        HickoryRcode::NotImp => ResponseCode::NotImp,
        _ => ResponseCode::ServFail,
    }
}

fn to_resource_record(record: &Record) -> Option<ResourceRecord> {
    let ttl = record.ttl();
    let name = record.name().to_utf8();
    let data = match record.data() {
        RData::A(a) => RecordData::A(a.0),
        RData::AAAA(aaaa) => RecordData::Aaaa(aaaa.0),
        RData::CNAME(name) => RecordData::Cname(name.to_utf8()),
        RData::PTR(name) => RecordData::Ptr(name.to_utf8()),
        RData::NS(name) => RecordData::Ns(name.to_utf8()),
        RData::TXT(txt) => RecordData::Txt(
            txt.iter()
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                .collect(),
        ),
        RData::MX(mx) => RecordData::Mx {
            preference: mx.preference(),
            exchange: mx.exchange().to_utf8(),
        },
        RData::SOA(soa) => RecordData::Soa {
            mname: soa.mname().to_utf8(),
            rname: soa.rname().to_utf8(),
            serial: soa.serial(),
            refresh: soa.refresh(),
            retry: soa.retry(),
            expire: soa.expire(),
            minimum: soa.minimum(),
        },
        other => RecordData::Raw {
            rtype: u16::from(other.record_type()),
            bytes: Vec::new(),
        },
    };

    Some(ResourceRecord { name, ttl, data })
}

pub fn is_transport_error(error: &DomainError) -> bool {
    matches!(error, DomainError::Transport(_) | DomainError::QueryTimeout)
}

pub fn rcode_to_status(code: ResponseCode) -> &'static str {
    match code {
        ResponseCode::NoError => "NOERROR",
        ResponseCode::NxDomain => "NXDOMAIN",
        ResponseCode::ServFail => "SERVFAIL",
        ResponseCode::Refused => "REFUSED",
        ResponseCode::FormErr => "FORMERR",
        ResponseCode::NotImp => "NOTIMP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_bytes() {
        assert!(parse(&[0xFF, 0x00, 0x01]).is_err());
    }
}
