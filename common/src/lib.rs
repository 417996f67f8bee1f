//! Invoice AI Common Library
//!
//! CLIとクラウド保存で共有される型とユーティリティ

pub mod types;
pub mod layout;
pub mod error;
pub mod parser;
pub mod prompts;
pub mod sheet_name;
pub mod export;

pub use types::{InvoiceLineItem, InvoiceRecord};
pub use error::{Error, Result};
pub use parser::{extract_json, parse_invoice_response};
pub use prompts::{build_extraction_prompt, invoice_response_schema, DEFAULT_HOME_CURRENCY};
pub use sheet_name::SheetNamer;

#[cfg(feature = "excel")]
pub use export::excel_core::generate_invoice_workbook;
