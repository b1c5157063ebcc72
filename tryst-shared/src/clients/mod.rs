pub mod redis;
pub mod telegram;
