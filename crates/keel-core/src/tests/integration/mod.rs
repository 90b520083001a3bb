#![cfg(test)]

pub mod common;
pub mod cache_tests;
pub mod scenario_tests;
