pub mod classify;
pub mod peak;
pub mod preprocess;
pub mod spectrum;
