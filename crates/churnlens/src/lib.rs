pub mod app;
pub mod cli;
pub mod logging;
pub mod report;
pub mod sizemap_view;

pub use app::App;
