pub mod domain;
pub mod frameworks;
pub mod interface_adapters;
pub mod use_cases;

pub use frameworks::config::host_port;
pub use frameworks::server::{run_host, run_host_with_config};
