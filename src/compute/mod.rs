pub mod dispatch;
pub mod engine;
pub mod pairing;
