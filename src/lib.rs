// SPDX-License-Identifier: MIT OR Apache-2.0

//! faqseek - Local semantic FAQ lookup library
//!
//! Shared modules for the faqseek CLI tool.

pub mod config;
pub mod embedding;
pub mod engine;
pub mod errors;
pub mod faq;
pub mod output;
pub mod retrieval;
pub mod session;
