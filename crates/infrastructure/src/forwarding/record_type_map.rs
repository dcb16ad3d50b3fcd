use gudgeon_domain::RecordType;
use hickory_proto::rr::RecordType as HickoryType;

pub fn to_hickory(rt: RecordType) -> HickoryType {
    match rt {
        RecordType::A => HickoryType::A,
        RecordType::Aaaa => HickoryType::AAAA,
        RecordType::Cname => HickoryType::CNAME,
        RecordType::Ptr => HickoryType::PTR,
        RecordType::Txt => HickoryType::TXT,
        RecordType::Ns => HickoryType::NS,
        RecordType::Mx => HickoryType::MX,
        RecordType::Soa => HickoryType::SOA,
        RecordType::Srv => HickoryType::SRV,
        RecordType::Other(v) => HickoryType::Unknown(v),
    }
}

pub fn from_hickory(rt: HickoryType) -> RecordType {
    RecordType::from_u16(u16::from(rt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_known_types() {
        for rt in [RecordType::A, RecordType::Aaaa, RecordType::Mx, RecordType::Soa] {
            assert_eq!(from_hickory(to_hickory(rt)), rt);
        }
    }
}
