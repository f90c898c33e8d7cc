pub mod conv;
pub mod fmt;
pub mod http;
pub mod serialize;
