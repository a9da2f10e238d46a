pub mod compile;
pub mod serve;
pub mod version;
