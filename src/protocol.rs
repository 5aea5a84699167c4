// MIT License - Copyright (c) 2026 Peter Wright
// Panel HTTP API: endpoints and response parsing

use serde::Deserialize;

use crate::error::{Result, TuxedoError};
use crate::status::{ArmMode, RawStatus};

/// Base path of the panel's JSON API.
pub const API_BASE_PATH: &str = "/system_http_api/API_REV01";

/// Partition addressed by every command. The panel exposes one.
pub const PARTITION_ID: u32 = 1;

/// Endpoints exposed by the panel's web server.
///
/// Everything is a `GET`, including the side-effecting commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// `GetSecurityStatus`: JSON body with a `Status` field.
    SecurityStatus,
    /// `AdvancedSecurity/ArmWithCode`: arm in the given mode.
    ArmWithCode { mode: ArmMode, code: &'a str },
    /// `handlerequest.html`: backend of the web keypad. Used for disarm
    /// because the API has no working DisarmWithCode. No JSON response.
    Disarm { code: &'a str },
    /// `home.html`: fetched only to keep the panel's status cache fresh.
    Home,
}

impl Endpoint<'_> {
    /// Path appended to the panel's base URL.
    pub fn path(&self) -> String {
        match self {
            Endpoint::SecurityStatus => format!("{API_BASE_PATH}/GetSecurityStatus"),
            Endpoint::ArmWithCode { .. } => format!("{API_BASE_PATH}/AdvancedSecurity/ArmWithCode"),
            Endpoint::Disarm { .. } => "/handlerequest.html".to_string(),
            Endpoint::Home => "/home.html".to_string(),
        }
    }

    /// Query parameters, unencoded. The HTTP client percent-encodes them.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::SecurityStatus | Endpoint::Home => Vec::new(),
            Endpoint::ArmWithCode { mode, code } => vec![
                ("arming", mode.as_str().to_string()),
                ("pID", PARTITION_ID.to_string()),
                ("ucode", code.to_string()),
                ("operation", "set".to_string()),
            ],
            Endpoint::Disarm { code } => vec![
                ("cmd", "3".to_string()),
                ("Type", "3".to_string()),
                ("pID", PARTITION_ID.to_string()),
                ("uCode", code.to_string()),
            ],
        }
    }

    /// Base URL plus path. Never carries the query, so it is safe to log.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }

    /// Short name for log lines. Never includes the alarm code.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::SecurityStatus => "GetSecurityStatus",
            Endpoint::ArmWithCode { .. } => "ArmWithCode",
            Endpoint::Disarm { .. } => "Disarm",
            Endpoint::Home => "Home",
        }
    }
}

/// Cut a response body off at its last `}`.
///
/// The panel appends an HTML disclaimer after the JSON object. Bodies
/// without any `}` come back empty.
pub fn truncate_after_last_brace(body: &str) -> &str {
    match body.rfind('}') {
        Some(pos) => &body[..=pos],
        None => "",
    }
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(rename = "Status")]
    status: serde_json::Value,
}

/// Extract the trimmed `Status` field from a (possibly contaminated)
/// `GetSecurityStatus` response body.
pub fn parse_status_body(body: &str) -> Result<RawStatus> {
    let json = truncate_after_last_brace(body);
    let parsed: StatusBody = serde_json::from_str(json).map_err(|e| TuxedoError::InvalidResponse {
        details: format!("status body is not JSON ({e}): {body:.80}"),
    })?;
    // The panel has been seen sending numbers here; keep their text form.
    let status = match parsed.status {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => {
            return Err(TuxedoError::InvalidResponse {
                details: "Status field is null".to_string(),
            });
        }
        other => other.to_string(),
    };
    Ok(RawStatus::new(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_strips_disclaimer() {
        let body = r#"{"Status":"Ready To Arm"}<html>disclaimer</html>"#;
        assert_eq!(truncate_after_last_brace(body), r#"{"Status":"Ready To Arm"}"#);
    }

    #[test]
    fn test_truncate_keeps_clean_body() {
        let body = r#"{"Status":"Armed Away"}"#;
        assert_eq!(truncate_after_last_brace(body), body);
    }

    #[test]
    fn test_truncate_without_brace() {
        assert_eq!(truncate_after_last_brace("<html>nothing</html>"), "");
    }

    #[test]
    fn test_parse_status_body() {
        let raw = parse_status_body("{\"Status\":\"  Armed Stay \"}\n<p>VAM</p>").unwrap();
        assert_eq!(raw.as_str(), "Armed Stay");
    }

    #[test]
    fn test_parse_status_body_extra_fields() {
        let raw = parse_status_body(r#"{"Status":"Not available","Zones":[{"id":1}]}<br>"#).unwrap();
        assert_eq!(raw.as_str(), "Not available");
    }

    #[test]
    fn test_parse_status_body_rejects_garbage() {
        assert!(parse_status_body("<html>login required</html>").is_err());
        assert!(parse_status_body(r#"{"Other":"x"}"#).is_err());
        assert!(parse_status_body(r#"{"Status":null}"#).is_err());
    }

    #[test]
    fn test_status_path() {
        assert_eq!(
            Endpoint::SecurityStatus.url("http://10.0.0.5"),
            "http://10.0.0.5/system_http_api/API_REV01/GetSecurityStatus"
        );
    }

    #[test]
    fn test_arm_endpoint() {
        let endpoint = Endpoint::ArmWithCode { mode: ArmMode::Night, code: "1234" };
        assert_eq!(
            endpoint.url("https://panel:8443/"),
            "https://panel:8443/system_http_api/API_REV01/AdvancedSecurity/ArmWithCode"
        );
        assert_eq!(
            endpoint.query(),
            vec![
                ("arming", "NIGHT".to_string()),
                ("pID", "1".to_string()),
                ("ucode", "1234".to_string()),
                ("operation", "set".to_string()),
            ]
        );
    }

    #[test]
    fn test_disarm_forwards_code_verbatim() {
        let endpoint = Endpoint::Disarm { code: "0042" };
        assert_eq!(endpoint.path(), "/handlerequest.html");
        assert!(endpoint.query().contains(&("uCode", "0042".to_string())));
        assert_eq!(endpoint.name(), "Disarm");
    }

    #[test]
    fn test_code_never_in_url() {
        let endpoint = Endpoint::Disarm { code: "12&34" };
        assert!(!endpoint.url("http://panel").contains("12&34"));
        assert!(Endpoint::Home.query().is_empty());
    }
}
