pub mod api_errors;
pub mod signature;
pub mod webhook;
