pub mod ask;
pub mod ping;
pub mod serve;
