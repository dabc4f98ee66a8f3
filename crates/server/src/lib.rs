pub mod assemble;
pub mod config;
pub mod dispatch;
pub mod mute;
pub mod notifier;
pub mod rest;
pub mod window;
