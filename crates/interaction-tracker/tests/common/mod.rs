#![allow(dead_code)]

pub mod collectors;
pub mod server;
