//! Constructs DNS query messages in wire format via `hickory-proto`.

use super::record_type_map::to_hickory;
use gudgeon_domain::{DomainError, Question};
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name};
use hickory_proto::serialize::binary::BinEncodable;
use std::str::FromStr;

/// Builds a standard recursive query: random ID, RD set, single question.
pub fn build_query(question: &Question, recursion_desired: bool) -> Result<Vec<u8>, DomainError> {
    let name = Name::from_str(question.normalized_name())
        .map_err(|_| DomainError::InvalidDomainName(question.normalized_name().to_string()))?;

    let mut query = Query::new();
    query.set_name(name);
    query.set_query_type(to_hickory(question.record_type));
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
    message.set_recursion_desired(recursion_desired);
    message.add_query(query);

    message
        .to_vec()
        .map_err(|_| DomainError::InvalidDomainName(question.normalized_name().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gudgeon_domain::RecordType;

    #[test]
    fn sets_recursion_desired_flag() {
        let question = Question::new("example.com", RecordType::A);
        let bytes = build_query(&question, true).unwrap();
        assert!(bytes.len() >= 12);
        assert_eq!(bytes[2] & 0x01, 0x01);
    }
}
