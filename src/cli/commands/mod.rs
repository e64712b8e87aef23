mod cycle;
mod listings;
mod notify;
mod searches;

pub use cycle::{cmd_daemon, cmd_evaluate, cmd_report, cmd_run, cmd_scrape};
pub use listings::{cmd_clear_evaluation, cmd_listings};
pub use notify::cmd_notify_test;
pub use searches::cmd_searches;
