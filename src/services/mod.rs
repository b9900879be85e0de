pub mod gateway;
pub use gateway::{GatewayError, SearchGateway};
