#![allow(dead_code)]

pub mod http_server;
pub mod memory_namespace;
pub mod mock_object;
