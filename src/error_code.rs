//! 错误分类码：为适配器的错误分类提供稳定的代码、名称与默认 HTTP 状态。
//!
//! Error taxonomy codes for the Gemini relay.
//!
//! | Code  | Name                    | Phase      | Default status |
//! |-------|-------------------------|------------|----------------|
//! | G1001 | unsupported_model       | conversion | 400            |
//! | G1002 | invalid_input           | conversion | 400            |
//! | G2001 | decode_failure          | both       | 400            |
//! | G3001 | upstream_empty_result   | response   | 400            |
//! | G3002 | upstream_error          | response   | 502            |
//! | G9001 | encode_failure          | both       | 500            |
//! | G9002 | configuration           | setup      | 500            |
//! | G9003 | transport               | response   | 502            |
//!
//! ## Example
//!
//! ```rust
//! use gemini_relay::error_code::ErrorCode;
//!
//! let code = ErrorCode::UnsupportedModel;
//! assert_eq!(code.code(), "G1001");
//! assert_eq!(code.http_status(), 400);
//! assert!(code.is_conversion_error());
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// G1001: modality not permitted for the resolved model
    UnsupportedModel,
    /// G1002: a required field is missing or empty
    InvalidInput,
    /// G2001: malformed self-describing payload, unparseable body, failed media fetch
    DecodeFailure,
    /// G3001: syntactically valid but semantically empty vendor result
    UpstreamEmptyResult,
    /// G3002: vendor answered with a non-success status
    Upstream,
    /// G9001: outbound payload could not be serialized
    EncodeFailure,
    /// G9002: adaptor misuse or invalid settings
    Configuration,
    /// G9003: network failure talking to the vendor or a media host
    Transport,
}

impl ErrorCode {
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedModel => "G1001",
            Self::InvalidInput => "G1002",
            Self::DecodeFailure => "G2001",
            Self::UpstreamEmptyResult => "G3001",
            Self::Upstream => "G3002",
            Self::EncodeFailure => "G9001",
            Self::Configuration => "G9002",
            Self::Transport => "G9003",
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UnsupportedModel => "unsupported_model",
            Self::InvalidInput => "invalid_input",
            Self::DecodeFailure => "decode_failure",
            Self::UpstreamEmptyResult => "upstream_empty_result",
            Self::Upstream => "upstream_error",
            Self::EncodeFailure => "encode_failure",
            Self::Configuration => "configuration",
            Self::Transport => "transport",
        }
    }

    /// Error `type` used in the OpenAI-compatible error envelope.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnsupportedModel | Self::InvalidInput => "invalid_request_error",
            Self::DecodeFailure => "decode_error",
            Self::UpstreamEmptyResult | Self::Upstream => "upstream_error",
            Self::EncodeFailure | Self::Configuration => "internal_error",
            Self::Transport => "transport_error",
        }
    }

    /// Status used when no originating upstream status is known.
    #[inline]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UnsupportedModel
            | Self::InvalidInput
            | Self::DecodeFailure
            | Self::UpstreamEmptyResult => 400,
            Self::Upstream | Self::Transport => 502,
            Self::EncodeFailure | Self::Configuration => 500,
        }
    }

    /// Errors raised before any network call is made.
    pub fn is_conversion_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedModel | Self::InvalidInput | Self::DecodeFailure
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let all = [
            ErrorCode::UnsupportedModel,
            ErrorCode::InvalidInput,
            ErrorCode::DecodeFailure,
            ErrorCode::UpstreamEmptyResult,
            ErrorCode::Upstream,
            ErrorCode::EncodeFailure,
            ErrorCode::Configuration,
            ErrorCode::Transport,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|c| c.code()).collect();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_internal_errors_map_to_500() {
        assert_eq!(ErrorCode::EncodeFailure.http_status(), 500);
        assert_eq!(ErrorCode::Configuration.http_status(), 500);
        assert!(!ErrorCode::EncodeFailure.is_conversion_error());
    }
}
