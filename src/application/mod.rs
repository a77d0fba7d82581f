pub mod bootstrap;
pub mod commands;
pub mod feed_loader;
pub mod presenter;
pub mod view_state;
