pub mod level;
pub mod meta;
pub mod record;

pub mod insert;
pub mod processor;
pub mod storage;

pub mod layer;

#[cfg(feature = "postgres")]
pub mod postgres;

pub mod env;
pub mod init;
pub mod noop;
