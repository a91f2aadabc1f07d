//! Schema-driven codec and message catalogue for iAP2 Control Session
//! Messages (CSM): the TLV-framed application protocol carried over the
//! control session of an iAP2 link.

pub mod catalogue;
pub mod errors;
pub mod message;
pub mod registry;
pub mod schema;

pub use errors::CsmError;
pub use message::Message;
pub use registry::{MessageDescriptor, describe};
pub use schema::{Cardinality, FieldSpec, FieldType, Param};
