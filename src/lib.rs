pub mod app;
pub mod core;
pub mod server;
pub mod utils;

pub use app::App;
pub use utils::AppConfig;
