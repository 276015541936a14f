pub mod capture;
pub mod pipeline;
