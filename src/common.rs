pub mod error;
pub mod db_utils;

pub use error::AppError;
