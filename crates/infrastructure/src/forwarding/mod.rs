pub mod message_builder;
pub mod record_type_map;
pub mod response_parser;

pub use message_builder::build_query;
pub use response_parser::parse as parse_response;
