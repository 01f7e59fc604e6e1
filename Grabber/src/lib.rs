// src/lib.rs

//! Grabber Library
//!
//! Reads post metadata and media from Xiaohongshu, Douyin, TikTok and
//! generic video pages.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod platforms;
pub mod services;
pub mod storage;
pub mod utils;

pub use error::{AppError, Result};
pub use models::{Config, ExtractionResult, Platform, ServiceResponse, UserProfile};
pub use pipeline::Grabber;
