use std::{fmt, str::FromStr};

use serde::Serialize;
use utoipa::ToSchema;

use super::error::ValidationError;

/// Output formats the renderer can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Svg,
    Pdf,
}

impl OutputFormat {
    /// Every format, in content-negotiation preference order.
    pub const ALL: [OutputFormat; 4] = [Self::Png, Self::Jpeg, Self::Svg, Self::Pdf];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }

    /// File extension of the rendered output, which the renderer also uses
    /// to pick its exporter.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    /// Media type without parameters, used for `Accept` matching.
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
            Self::Pdf => "application/pdf",
        }
    }

    /// Full `Content-Type` value sent with the rendered file.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Svg => "image/svg+xml; charset=utf-8",
            other => other.media_type(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "png" => Ok(Self::Png),
            "jpeg" => Ok(Self::Jpeg),
            "svg" => Ok(Self::Svg),
            "pdf" => Ok(Self::Pdf),
            other => Err(ValidationError::UnknownFormat {
                value: other.to_string(),
            }),
        }
    }
}
