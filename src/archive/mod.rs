pub mod config;
pub mod discovery;
pub mod merge;
pub mod paths;
pub mod post;
pub mod profile;
pub mod source;
pub mod store;
pub mod thread;
pub mod util;
pub mod warn;
