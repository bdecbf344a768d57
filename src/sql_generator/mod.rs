pub mod data_type;
pub mod errors;
pub mod select_statement;
pub mod vendor;

pub use data_type::SqlDataType;
pub use errors::SqlGeneratorError;
pub use select_statement::{build_select, SelectStatement};
pub use vendor::{is_numeric_literal, Vendor};
