//! The social platforms the pipeline can post to.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Reddit,
    Facebook,
    Twitter,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Reddit,
        Platform::Facebook,
        Platform::Twitter,
        Platform::Instagram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reddit    => "reddit",
            Self::Facebook  => "facebook",
            Self::Twitter   => "twitter",
            Self::Instagram => "instagram",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reddit"    => Ok(Self::Reddit),
            "facebook"  => Ok(Self::Facebook),
            "twitter"   => Ok(Self::Twitter),
            "instagram" => Ok(Self::Instagram),
            other       => Err(format!("unknown platform: {other}")),
        }
    }
}
