//! Robots.txt rule extraction
//!
//! Only `User-agent` and `Disallow` lines matter here. The robotstxt crate
//! tokenizes the file; a small parse handler keeps the Disallow prefixes of
//! every group that applies to our user agent.

use robotstxt::{parse_robotstxt, RobotsParseHandler};

const ROBOTS_PATH: &str = "/ROBOTS.TXT";

/// Disallowed path prefixes for one user agent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotRules {
    /// Uppercased prefixes, compared against uppercased paths
    disallowed: Vec<String>,
}

impl RobotRules {
    /// Rules that restrict nothing but robots.txt itself
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Extracts the rules that apply to `user_agent`
    ///
    /// A `User-agent` line whose value is `*`, or contains the user agent
    /// (ignoring case), enables the `Disallow` lines that follow it until the
    /// next `User-agent` line. `Allow` lines are ignored and an empty
    /// `Disallow` restricts nothing.
    ///
    /// # Arguments
    ///
    /// * `content` - The robots.txt body
    /// * `user_agent` - The crawler's configured user agent
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let mut collector = DisallowCollector {
            user_agent: user_agent.to_lowercase(),
            active: false,
            disallowed: Vec::new(),
        };
        parse_robotstxt(content, &mut collector);

        Self {
            disallowed: collector.disallowed,
        }
    }

    /// Returns the disallowed prefixes, uppercased
    pub fn disallowed(&self) -> &[String] {
        &self.disallowed
    }

    /// Checks a URL path against the rules
    ///
    /// # Returns
    ///
    /// * `false` - The path is robots.txt itself, or starts with a disallowed
    ///   prefix (ignoring case)
    /// * `true` - Otherwise
    pub fn is_allowed(&self, path: &str) -> bool {
        let path = path.to_uppercase();
        if path == ROBOTS_PATH {
            return false;
        }
        !self
            .disallowed
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

struct DisallowCollector {
    user_agent: String,
    active: bool,
    disallowed: Vec<String>,
}

impl RobotsParseHandler for DisallowCollector {
    fn handle_robots_start(&mut self) {}

    fn handle_robots_end(&mut self) {}

    fn handle_user_agent(&mut self, _line_num: u32, user_agent: &str) {
        let value = user_agent.trim().to_lowercase();
        self.active = value == "*" || (!value.is_empty() && value.contains(&self.user_agent));
    }

    fn handle_allow(&mut self, _line_num: u32, _value: &str) {}

    fn handle_disallow(&mut self, _line_num: u32, value: &str) {
        let value = value.trim();
        if self.active && !value.is_empty() {
            self.disallowed.push(value.to_uppercase());
        }
    }

    fn handle_sitemap(&mut self, _line_num: u32, _value: &str) {}

    fn handle_unknown_action(&mut self, _line_num: u32, _action: &str, _value: &str) {}
}
