use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static MOBILE_USER_AGENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)iPhone|iPad|iPod|Android").expect("valid user-agent pattern"));

/// Client platform class. Mobile clients get shorter wait bounds because the
/// OS suspends backgrounded pages aggressively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Desktop,
    Mobile,
}

impl Platform {
    pub fn from_user_agent(user_agent: &str) -> Self {
        if MOBILE_USER_AGENT.is_match(user_agent) {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    pub fn is_mobile(self) -> bool {
        matches!(self, Self::Mobile)
    }
}
