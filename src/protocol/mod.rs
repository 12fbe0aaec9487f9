//! TNS protocol implementation for Oracle thin client.

pub mod auth;
pub mod buffer;
pub mod connect;
pub mod constants;
pub mod crypto;
pub mod decode;
pub mod message;
pub mod messages;
pub mod oson;
pub mod packet;
pub mod response;
pub mod types;

pub use buffer::{ReadBuffer, WriteBuffer};
pub use message::{DataMessage, Message, WriteExt};
pub use messages::{
    AuthPhaseOneMessage, AuthPhaseTwoMessage, ConnectMessage, DataTypesMessage, ExecuteMessage,
    FastAuthMessage, MarkerMessage, ProtocolMessage,
};
pub use packet::Packet;
pub use types::{Column, ColumnInfo, ColumnMetadata, OracleType, OracleValue, Row};
