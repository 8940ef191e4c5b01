pub mod error;
pub mod models;
pub mod number;
pub mod source;
pub mod types;

pub use error::{Error, ErrorKind};
pub use models::{ReportGenerator, VatCheck, VatValidator};
pub use number::CompanyNumber;
pub use source::{PageResponse, PageSource};
pub use types::*;

pub use rust_decimal::Decimal;

pub type Result<T> = std::result::Result<T, Error>;
