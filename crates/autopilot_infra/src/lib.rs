#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod nicehash;
pub mod rates;
pub mod scheduler;
