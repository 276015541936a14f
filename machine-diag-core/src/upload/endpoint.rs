use crate::models::error::DiagnosticError;

/// Path segment the diagnostic service serves predictions on.
pub const PREDICT_PATH: &str = "predict";

/// Port assumed for a LAN server given as a bare host or IP.
pub const LAN_SERVER_PORT: u16 = 5000;

/// Turn a configured server address into the prediction endpoint.
///
/// - `https://host/` → `https://host/predict` (one trailing slash stripped)
/// - `192.168.1.10` → `http://192.168.1.10:5000/predict`
/// - `192.168.1.10:8080` → `http://192.168.1.10:8080/predict`
pub fn resolve_predict_url(server: &str) -> Result<String, DiagnosticError> {
    let server = server.trim();
    if server.is_empty() {
        return Err(DiagnosticError::ConfigurationFailed("server address is empty".into()));
    }

    let lower = server.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        let base = server.strip_suffix('/').unwrap_or(server);
        return Ok(format!("{}/{}", base, PREDICT_PATH));
    }

    let host = server.strip_suffix('/').unwrap_or(server);
    if host.contains(':') {
        Ok(format!("http://{}/{}", host, PREDICT_PATH))
    } else {
        Ok(format!("http://{}:{}/{}", host, LAN_SERVER_PORT, PREDICT_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_exactly_one_trailing_slash() {
        assert_eq!(
            resolve_predict_url("https://example.hf.space").unwrap(),
            "https://example.hf.space/predict"
        );
        assert_eq!(
            resolve_predict_url("https://example.hf.space/").unwrap(),
            "https://example.hf.space/predict"
        );
        assert_eq!(
            resolve_predict_url("http://10.0.0.2:5000/api//").unwrap(),
            "http://10.0.0.2:5000/api//predict"
        );
    }

    #[test]
    fn bare_host_targets_lan_server() {
        assert_eq!(
            resolve_predict_url(" 192.168.1.10 ").unwrap(),
            "http://192.168.1.10:5000/predict"
        );
        assert_eq!(
            resolve_predict_url("workshop-pc:8080").unwrap(),
            "http://workshop-pc:8080/predict"
        );
    }

    #[test]
    fn scheme_match_is_case_insensitive() {
        assert_eq!(
            resolve_predict_url("HTTPS://Tunnel.ngrok.io/").unwrap(),
            "HTTPS://Tunnel.ngrok.io/predict"
        );
    }

    #[test]
    fn empty_address_is_rejected() {
        assert!(matches!(
            resolve_predict_url("   "),
            Err(DiagnosticError::ConfigurationFailed(_))
        ));
    }
}
