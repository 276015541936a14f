pub mod capture_device;
pub mod diagnostic_delegate;
pub mod feature_extractor;
pub mod sample_sink;
