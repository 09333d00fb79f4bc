pub mod app;
pub mod dashboard;

pub use app::App;
pub use dashboard::run_dashboard;
