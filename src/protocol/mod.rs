pub mod sniffer;
pub mod tls;
