// TODO(zephyr): enable "#![no_std]" later, and start to build for multiple targets.
//   cargo build --target thumbv6m-none-eabi
//   cargo build --target x86_64-unknown-linux-gnu

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]

pub mod client;
pub mod config;
pub mod constant;
pub mod data_type;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod frame;
pub mod queue;
pub mod request;
pub mod timeout;
pub mod transport;
pub mod value;

mod prelude;

pub use client::SdoClient;
pub use config::SdoClientConfig;
pub use data_type::DataType;
pub use dictionary::{Dictionary, UpdateFlag};
pub use error::{AbortCode, ClientError};
pub use value::Value;
