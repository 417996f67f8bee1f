//! invoice-ai
//!
//! 請求書画像を Gemini で解析し、Excel出力・Google Drive / Sheets 保存を行う

pub mod analyzer;
pub mod cli;
pub mod cloud;
pub mod config;
pub mod error;
pub mod export;
pub mod scanner;
pub mod session;
