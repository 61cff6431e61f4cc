pub mod client_hello;
pub mod extension;
pub mod handshake;
pub mod record;

pub use client_hello::ClientHelloMessage;
pub use extension::ExtensionType;
pub use handshake::{
    read_client_hello, read_client_hello_async, read_handshake, read_handshake_async,
    HandshakeType,
};
pub use record::{read_record, read_record_async, ContentType, RecordHeader};
