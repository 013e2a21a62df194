//! Data Validation
//!
//! Range checking for decoded OBD-II readings. The session layer reports a
//! reading outside its physical range as absent, the same as `NO DATA`.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::ValueRange;
