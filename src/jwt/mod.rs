//! Claim assembly and compact serialization.

pub mod claims;
pub mod serializer;

pub use claims::Request;
pub use serializer::JwtSerializer;
