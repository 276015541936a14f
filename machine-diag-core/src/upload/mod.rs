pub mod client;
pub mod endpoint;
pub mod multipart;
