pub mod plugins;
pub mod schema;
pub mod settings;
