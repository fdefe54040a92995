/*
[INPUT]:  Public API exports for zubr-demo crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod feed;

pub use config::DemoConfig;
pub use feed::register_feeds;
