use std::ops::RangeInclusive;

use bytes::Bytes;
use serde_json::Value;

use super::{
    error::ValidationError,
    format::OutputFormat,
    params::{RawParam, RawParams},
};

pub const SOURCE_FIELD: &str = "source";
pub const FORMAT_FIELD: &str = "format";
pub const QUALITY_FIELD: &str = "quality";
pub const TRANSPARENT_FIELD: &str = "transparent";
pub const EMBED_FIELD: &str = "embed";
pub const BORDER_FIELD: &str = "border";
pub const SCALE_FIELD: &str = "scale";
pub const WIDTH_FIELD: &str = "width";
pub const HEIGHT_FIELD: &str = "height";
pub const CROP_FIELD: &str = "crop";

pub const QUALITY_RANGE: RangeInclusive<i64> = 1..=100;
pub const BORDER_RANGE: RangeInclusive<i64> = 0..=10_000;
pub const DIMENSION_RANGE: RangeInclusive<i64> = 10..=131_072;
pub const MAX_SCALE: f64 = 5.0;

/// A validated, normalized conversion of one diagram document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub source: Bytes,
    pub format: OutputFormat,
    pub options: RenderOptions,
}

/// Optional renderer modifiers. `None` means the caller did not send the
/// field; `Some(false)` on a boolean is still a supplied value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    pub quality: Option<u8>,
    pub transparent_background: Option<bool>,
    pub embed_resources: Option<bool>,
    pub border: Option<u32>,
    pub scale: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub crop: Option<bool>,
}

impl ConversionRequest {
    /// Validate a structured JSON request body.
    pub fn from_json_body(body: &[u8]) -> Result<Self, ValidationError> {
        let document: Value = serde_json::from_slice(body)
            .map_err(|err| ValidationError::MalformedBody(err.to_string()))?;
        let object = document.as_object().ok_or(ValidationError::NotAnObject)?;
        let mut params = RawParams::from_json_object(object);

        let source = params
            .take(SOURCE_FIELD)
            .ok_or(ValidationError::Missing {
                field: SOURCE_FIELD,
            })?
            .string(SOURCE_FIELD)?;
        let format = match params.take(FORMAT_FIELD) {
            Some(raw) => raw.string(FORMAT_FIELD)?.parse()?,
            None => OutputFormat::default(),
        };
        let options = RenderOptions::from_params(&mut params, format)?;
        params.finish()?;

        Ok(Self {
            source: Bytes::copy_from_slice(source.as_bytes()),
            format,
            options,
        })
    }

    /// Validate a raw upload: the body is the document, the format was
    /// negotiated elsewhere and modifiers arrive as query-string text.
    pub fn from_raw_upload(
        source: Bytes,
        format: OutputFormat,
        query: &[(String, String)],
    ) -> Result<Self, ValidationError> {
        let mut params = RawParams::from_query_pairs(query)?;
        let options = RenderOptions::from_params(&mut params, format)?;
        params.finish()?;

        Ok(Self {
            source,
            format,
            options,
        })
    }

    /// Name of the file the renderer writes into the job directory.
    pub fn output_file_name(&self) -> String {
        format!("output.{}", self.format.extension())
    }
}

impl RenderOptions {
    /// Pull every modifier out of `params`, type and range check it, then
    /// make sure it applies to `format`.
    pub fn from_params(
        params: &mut RawParams<'_>,
        format: OutputFormat,
    ) -> Result<Self, ValidationError> {
        let options = Self {
            quality: take_with(params, QUALITY_FIELD, |raw| {
                raw.integer(QUALITY_FIELD, QUALITY_RANGE).map(|v| v as u8)
            })?,
            transparent_background: take_with(params, TRANSPARENT_FIELD, |raw| {
                raw.boolean(TRANSPARENT_FIELD)
            })?,
            embed_resources: take_with(params, EMBED_FIELD, |raw| raw.boolean(EMBED_FIELD))?,
            border: take_with(params, BORDER_FIELD, |raw| {
                raw.integer(BORDER_FIELD, BORDER_RANGE).map(|v| v as u32)
            })?,
            scale: take_with(params, SCALE_FIELD, |raw| {
                raw.number_above(SCALE_FIELD, 0.0, MAX_SCALE)
            })?,
            width: take_with(params, WIDTH_FIELD, |raw| {
                raw.integer(WIDTH_FIELD, DIMENSION_RANGE).map(|v| v as u32)
            })?,
            height: take_with(params, HEIGHT_FIELD, |raw| {
                raw.integer(HEIGHT_FIELD, DIMENSION_RANGE).map(|v| v as u32)
            })?,
            crop: take_with(params, CROP_FIELD, |raw| raw.boolean(CROP_FIELD))?,
        };
        options.ensure_supported_by(format)?;
        Ok(options)
    }

    pub fn ensure_supported_by(&self, format: OutputFormat) -> Result<(), ValidationError> {
        let restricted = [
            (QUALITY_FIELD, self.quality.is_some(), OutputFormat::Jpeg),
            (
                TRANSPARENT_FIELD,
                self.transparent_background.is_some(),
                OutputFormat::Png,
            ),
            (EMBED_FIELD, self.embed_resources.is_some(), OutputFormat::Png),
            (CROP_FIELD, self.crop.is_some(), OutputFormat::Pdf),
        ];
        for (field, present, required) in restricted {
            if present && format != required {
                return Err(ValidationError::UnsupportedForFormat {
                    field,
                    format: required,
                });
            }
        }
        Ok(())
    }
}

fn take_with<'a, T>(
    params: &mut RawParams<'a>,
    field: &'static str,
    coerce: impl FnOnce(RawParam<'a>) -> Result<T, ValidationError>,
) -> Result<Option<T>, ValidationError> {
    params.take(field).map(coerce).transpose()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn json_request(value: Value) -> Result<ConversionRequest, ValidationError> {
        ConversionRequest::from_json_body(value.to_string().as_bytes())
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn format_defaults_to_png() {
        let request = json_request(json!({ "source": "<mxfile/>" })).expect("valid");
        assert_eq!(request.format, OutputFormat::Png);
        assert_eq!(request.options, RenderOptions::default());
        assert_eq!(request.source, Bytes::from_static(b"<mxfile/>"));
        assert_eq!(request.output_file_name(), "output.png");
    }

    #[test]
    fn empty_source_is_structurally_valid() {
        assert!(json_request(json!({ "source": "" })).is_ok());
    }

    #[test]
    fn missing_source_is_rejected() {
        let err = json_request(json!({ "format": "png" })).expect_err("no source");
        assert_eq!(err, ValidationError::Missing { field: "source" });
    }

    #[test]
    fn non_json_and_non_object_bodies_are_rejected() {
        assert!(matches!(
            ConversionRequest::from_json_body(b"nonsense!"),
            Err(ValidationError::MalformedBody(_))
        ));
        assert_eq!(
            json_request(json!(["source"])),
            Err(ValidationError::NotAnObject)
        );
    }

    #[test]
    fn unknown_format_and_unknown_fields_are_rejected() {
        let err = json_request(json!({ "source": "x", "format": "nonsense!" }))
            .expect_err("bad format");
        assert_eq!(err.field(), Some("format"));

        let err = json_request(json!({ "source": "x", "pages": "1..2" })).expect_err("unknown");
        assert_eq!(
            err,
            ValidationError::UnknownField {
                field: "pages".to_string()
            }
        );
    }

    #[test]
    fn quality_boundaries() {
        for (value, ok) in [(0, false), (1, true), (100, true), (101, false)] {
            let result = json_request(json!({ "source": "x", "format": "jpeg", "quality": value }));
            assert_eq!(result.is_ok(), ok, "quality={value}");
        }
    }

    #[test]
    fn border_boundaries() {
        for (value, ok) in [(-1, false), (0, true), (10_000, true), (10_001, false)] {
            let result = json_request(json!({ "source": "x", "border": value }));
            assert_eq!(result.is_ok(), ok, "border={value}");
        }
    }

    #[test]
    fn scale_boundaries() {
        for (value, ok) in [(0.0, false), (0.01, true), (5.0, true), (5.01, false)] {
            let result = json_request(json!({ "source": "x", "scale": value }));
            assert_eq!(result.is_ok(), ok, "scale={value}");
        }
    }

    #[test]
    fn dimension_boundaries() {
        for field in ["width", "height"] {
            for (value, ok) in [
                (9, false),
                (10, true),
                (131_072, true),
                (131_073, false),
                (1_000_000, false),
            ] {
                let result = json_request(json!({ "source": "x", field: value }));
                assert_eq!(result.is_ok(), ok, "{field}={value}");
            }
        }
    }

    #[test]
    fn modifiers_must_match_format() {
        let cases = [
            (json!({ "source": "x", "format": "png", "quality": 50 }), "quality", OutputFormat::Jpeg),
            (json!({ "source": "x", "format": "svg", "transparent": true }), "transparent", OutputFormat::Png),
            (json!({ "source": "x", "format": "pdf", "embed": false }), "embed", OutputFormat::Png),
            (json!({ "source": "x", "crop": true }), "crop", OutputFormat::Pdf),
        ];
        for (body, field, format) in cases {
            let err = json_request(body).expect_err(field);
            assert_eq!(err, ValidationError::UnsupportedForFormat { field, format });
        }
    }

    #[test]
    fn incompatible_modifier_message_names_field_and_format() {
        let err = json_request(json!({ "source": "x", "quality": 50 })).expect_err("png");
        assert_eq!(err.to_string(), "only jpeg format supports quality");
    }

    #[test]
    fn json_typed_modifiers_are_collected() {
        let request = json_request(json!({
            "source": "x",
            "format": "png",
            "transparent": true,
            "embed": false,
            "border": 4,
            "scale": 1.5,
            "width": 800,
            "height": 600,
        }))
        .expect("valid");
        assert_eq!(
            request.options,
            RenderOptions {
                transparent_background: Some(true),
                embed_resources: Some(false),
                border: Some(4),
                scale: Some(1.5),
                width: Some(800),
                height: Some(600),
                ..RenderOptions::default()
            }
        );
    }

    #[test]
    fn raw_upload_coerces_query_text() {
        let request = ConversionRequest::from_raw_upload(
            Bytes::from_static(b"<mxfile/>"),
            OutputFormat::Jpeg,
            &query(&[("quality", "80"), ("scale", "2"), ("border", "0")]),
        )
        .expect("valid");
        assert_eq!(request.options.quality, Some(80));
        assert_eq!(request.options.scale, Some(2.0));
        assert_eq!(request.options.border, Some(0));
    }

    #[test]
    fn raw_upload_applies_same_ranges_and_format_rules() {
        let source = Bytes::from_static(b"<mxfile/>");
        assert!(
            ConversionRequest::from_raw_upload(
                source.clone(),
                OutputFormat::Jpeg,
                &query(&[("quality", "101")])
            )
            .is_err()
        );
        assert!(
            ConversionRequest::from_raw_upload(
                source.clone(),
                OutputFormat::Png,
                &query(&[("crop", "true")])
            )
            .is_err()
        );
        let err = ConversionRequest::from_raw_upload(
            source,
            OutputFormat::Png,
            &query(&[("format", "pdf")]),
        )
        .expect_err("format is negotiated, not a query parameter");
        assert_eq!(err.field(), Some("format"));
    }
}
