use std::path::PathBuf;
use std::time::Duration;

/// Default diagnostic service.
pub const DEFAULT_SERVER_URL: &str = "https://rudragamerz-mechanic-fault-detector.hf.space";

/// Header that suppresses the browser interstitial served by ngrok tunnels.
pub const TUNNEL_BYPASS_HEADER: &str = "ngrok-skip-browser-warning";

/// Shape of the JSON verdict returned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseProfile {
    /// Label under one of several keys, optional `confidence` as a fraction
    /// in [0, 1] or a pre-formatted string.
    #[default]
    Tolerant,
    /// `label` + `score` + `confidence`, where `confidence` is already an
    /// integer percentage.
    Legacy,
}

impl std::str::FromStr for ResponseProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tolerant" => Ok(Self::Tolerant),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown response profile: {}", other)),
        }
    }
}

/// Highest capture rate accepted.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Configuration for a diagnostic attempt.
///
/// Supplied once at construction and never mutated afterwards. Audio is
/// always mono 16-bit signed PCM.
#[derive(Debug, Clone)]
pub struct DiagnosticConfig {
    /// Server base URL, or a bare host/IP for a LAN server.
    pub server_url: String,

    /// Capture sample rate in Hz (default: 22050).
    pub sample_rate: u32,

    /// Capture length in seconds for fixed-quota recordings (default: 5).
    pub capture_secs: f64,

    /// Bound on TCP/TLS connection establishment (default: 10s).
    pub connect_timeout: Duration,

    /// Bound on waiting for and reading the response (default: 10s).
    pub read_timeout: Duration,

    /// Extra request headers, sent in order.
    pub extra_headers: Vec<(String, String)>,

    /// Send the tunnel interstitial bypass header.
    pub skip_tunnel_warning: bool,

    /// How to read the server's JSON verdict.
    pub response_profile: ResponseProfile,

    /// Directory holding the single working capture file.
    pub output_directory: PathBuf,

    /// `User-Agent` sent with uploads.
    pub user_agent: String,
}

impl DiagnosticConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server_url.trim().is_empty() {
            return Err("server url must not be empty".into());
        }
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(format!(
                "sample rate must be between 1 and {} Hz, got {}",
                MAX_SAMPLE_RATE, self.sample_rate
            ));
        }
        if !self.capture_secs.is_finite() || self.capture_secs <= 0.0 {
            return Err(format!("invalid capture duration: {}", self.capture_secs));
        }
        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err("timeouts must be non-zero".into());
        }
        Ok(())
    }

    /// Number of samples a fixed-quota recording collects.
    pub fn quota_samples(&self) -> u64 {
        (self.sample_rate as f64 * self.capture_secs).round() as u64
    }

    /// All headers to attach to an upload, bypass header first.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.extra_headers.len() + 1);
        if self.skip_tunnel_warning {
            headers.push((TUNNEL_BYPASS_HEADER.to_string(), "true".to_string()));
        }
        headers.extend(self.extra_headers.iter().cloned());
        headers
    }
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            sample_rate: 22050,
            capture_secs: 5.0,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            extra_headers: Vec::new(),
            skip_tunnel_warning: false,
            response_profile: ResponseProfile::Tolerant,
            output_directory: std::env::temp_dir(),
            user_agent: "MachineDiagnosticApp".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = DiagnosticConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.quota_samples(), 110_250);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = DiagnosticConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.sample_rate = 300_000_000;
        assert!(config.validate().is_err());

        config.sample_rate = MAX_SAMPLE_RATE;
        assert!(config.validate().is_ok());

        config.sample_rate = 44100;
        config.capture_secs = f64::NAN;
        assert!(config.validate().is_err());

        config.capture_secs = 1.0;
        config.read_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.read_timeout = Duration::from_secs(1);
        config.server_url = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bypass_header_precedes_extra_headers() {
        let config = DiagnosticConfig {
            skip_tunnel_warning: true,
            extra_headers: vec![("X-Device".into(), "bench-3".into())],
            ..Default::default()
        };
        let headers = config.request_headers();
        assert_eq!(headers[0], (TUNNEL_BYPASS_HEADER.to_string(), "true".to_string()));
        assert_eq!(headers[1].0, "X-Device");
    }

    #[test]
    fn parses_profile_names() {
        assert_eq!("Legacy".parse::<ResponseProfile>(), Ok(ResponseProfile::Legacy));
        assert_eq!("tolerant".parse::<ResponseProfile>(), Ok(ResponseProfile::Tolerant));
        assert!("strict".parse::<ResponseProfile>().is_err());
    }
}
