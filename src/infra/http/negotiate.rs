//! `Accept` header negotiation for the raw upload endpoint.

use crate::{application::convert::ConvertError, domain::OutputFormat};

/// Pick the output format the client prefers among the ones we produce.
///
/// Each supported media type takes the q-value of the most specific range
/// that matches it (`image/png` over `image/*` over `*/*`). The highest
/// q-value wins, ties go to the order of [`OutputFormat::ALL`], and `q=0`
/// excludes a type. A missing or blank header accepts anything.
pub fn negotiate(accept: Option<&str>) -> Result<OutputFormat, ConvertError> {
    let header = match accept.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(OutputFormat::default()),
    };
    let ranges: Vec<MediaRange<'_>> = header.split(',').filter_map(MediaRange::parse).collect();

    let mut best: Option<(OutputFormat, f32)> = None;
    for format in OutputFormat::ALL {
        let Some(quality) = quality_for(&ranges, format.media_type()) else {
            continue;
        };
        if quality <= 0.0 {
            continue;
        }
        if best.is_none_or(|(_, current)| quality > current) {
            best = Some((format, quality));
        }
    }

    best.map(|(format, _)| format)
        .ok_or_else(|| ConvertError::not_acceptable(accepted_types()))
}

/// The supported types as a client-facing list.
pub fn accepted_types() -> String {
    OutputFormat::ALL
        .iter()
        .map(|format| format.content_type())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug)]
struct MediaRange<'a> {
    kind: &'a str,
    subtype: &'a str,
    quality: f32,
}

impl<'a> MediaRange<'a> {
    fn parse(item: &'a str) -> Option<Self> {
        let mut parts = item.split(';');
        let essence = parts.next()?.trim();
        let (kind, subtype) = essence.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let mut quality = 1.0;
        for param in parts {
            if let Some((name, value)) = param.split_once('=')
                && name.trim().eq_ignore_ascii_case("q")
            {
                quality = value.trim().parse::<f32>().ok()?.clamp(0.0, 1.0);
            }
        }
        Some(Self {
            kind,
            subtype,
            quality,
        })
    }

    /// 2 for an exact match, 1 for `type/*`, 0 for `*/*`.
    fn specificity(&self, kind: &str, subtype: &str) -> Option<u8> {
        if self.kind == "*" && self.subtype == "*" {
            Some(0)
        } else if self.kind.eq_ignore_ascii_case(kind) && self.subtype == "*" {
            Some(1)
        } else if self.kind.eq_ignore_ascii_case(kind) && self.subtype.eq_ignore_ascii_case(subtype)
        {
            Some(2)
        } else {
            None
        }
    }
}

fn quality_for(ranges: &[MediaRange<'_>], media_type: &str) -> Option<f32> {
    let (kind, subtype) = media_type.split_once('/')?;
    ranges
        .iter()
        .filter_map(|range| {
            range
                .specificity(kind, subtype)
                .map(|score| (score, range.quality))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, quality)| quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(accept: &str) -> Option<OutputFormat> {
        negotiate(Some(accept)).ok()
    }

    #[test]
    fn exact_types_select_their_format() {
        assert_eq!(pick("image/png"), Some(OutputFormat::Png));
        assert_eq!(pick("image/jpeg"), Some(OutputFormat::Jpeg));
        assert_eq!(pick("image/svg+xml; charset=utf-8"), Some(OutputFormat::Svg));
        assert_eq!(pick("image/svg+xml"), Some(OutputFormat::Svg));
        assert_eq!(pick("application/pdf"), Some(OutputFormat::Pdf));
        assert_eq!(pick("Application/PDF"), Some(OutputFormat::Pdf));
    }

    #[test]
    fn missing_or_wildcard_accept_defaults_to_png() {
        assert_eq!(negotiate(None).ok(), Some(OutputFormat::Png));
        assert_eq!(pick(""), Some(OutputFormat::Png));
        assert_eq!(pick("*/*"), Some(OutputFormat::Png));
        assert_eq!(pick("image/*"), Some(OutputFormat::Png));
        assert_eq!(pick("application/*"), Some(OutputFormat::Pdf));
    }

    #[test]
    fn quality_values_rank_candidates() {
        assert_eq!(
            pick("image/png;q=0.5, application/pdf"),
            Some(OutputFormat::Pdf)
        );
        assert_eq!(
            pick("image/*;q=0.8, image/png;q=0, image/svg+xml;q=0.9"),
            Some(OutputFormat::Svg)
        );
        assert_eq!(pick("*/*;q=0.1, image/jpeg;q=0.2"), Some(OutputFormat::Jpeg));
    }

    #[test]
    fn unsupported_types_are_not_acceptable() {
        let err = negotiate(Some("text/plain")).expect_err("406");
        assert!(matches!(err, ConvertError::NotAcceptable { .. }));
        assert!(err.to_string().contains("image/svg+xml; charset=utf-8"));
        assert!(pick("nonsense").is_none());
        assert!(pick("image/png;q=0").is_none());
    }
}
