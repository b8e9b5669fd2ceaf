use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Icon given to a server when the creator does not pick one.
pub const DEFAULT_SERVER_ICON: &str = "🚀";

/// Number of messages returned by a channel history read.
pub const MESSAGE_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Text,
    Voice,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "voice" => Ok(Self::Voice),
            other => Err(format!("unknown channel type '{}'", other)),
        }
    }
}

/// A channel every new server starts with.
#[derive(Debug, Clone, Copy)]
pub struct ChannelTemplate {
    pub name: &'static str,
    pub kind: ChannelKind,
    pub position: i64,
}

pub const DEFAULT_CHANNELS: [ChannelTemplate; 2] = [
    ChannelTemplate {
        name: "general",
        kind: ChannelKind::Text,
        position: 0,
    },
    ChannelTemplate {
        name: "Lounge",
        kind: ChannelKind::Voice,
        position: 1,
    },
];
