pub mod invoke;
pub use invoke::router;

pub const HEADER_FUNCTION_ARN: &str = "x-invoked-function-arn";
pub const HEADER_REQUEST_ID: &str = "x-request-id";
