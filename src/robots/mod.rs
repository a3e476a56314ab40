//! Robots.txt handling module
//!
//! [`RobotRules`] extracts the Disallow prefixes that apply to the crawler;
//! [`RobotService`] fetches the seed site's robots.txt once and answers
//! admission questions from it.

mod parser;
mod service;

pub use parser::RobotRules;
pub use service::RobotService;
