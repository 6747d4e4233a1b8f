//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable (hat Vorrang vor der Config-Datei):
//! - `CHATLY_LOG_LEVEL`: Filter-Direktive (z.B. `info`, `chatly_relay=debug`)
//! - `CHATLY_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Verbindungs-IDs werden als Tracing-Span-Felder propagiert.

use tracing_subscriber::{fmt, EnvFilter};

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Liest das Format; alles ausser "json" ergibt Text
    pub fn aus_str(format: &str) -> Self {
        match format {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Ermittelt Filter-Direktive und Format aus Config-Werten und Umgebung
///
/// Umgebungswerte gewinnen; ungueltige Level fallen auf "info" zurueck.
pub fn einstellungen_aufloesen(
    level: &str,
    format: &str,
    env_level: Option<String>,
    env_format: Option<String>,
) -> (String, LogFormat) {
    let level = env_level.unwrap_or_else(|| level.to_string());
    let level = if EnvFilter::try_new(&level).is_ok() {
        level
    } else {
        "info".to_string()
    };
    let format = LogFormat::aus_str(env_format.as_deref().unwrap_or(format));
    (level, format)
}

/// Initialisiert das Logging-System.
///
/// Liest `CHATLY_LOG_LEVEL` und `CHATLY_LOG_FORMAT` aus der Umgebung.
/// Ein bereits gesetzter globaler Subscriber wird nicht ersetzt.
pub fn logging_initialisieren(level: &str, format: &str) {
    let (direktive, format) = einstellungen_aufloesen(
        level,
        format,
        std::env::var("CHATLY_LOG_LEVEL").ok(),
        std::env::var("CHATLY_LOG_FORMAT").ok(),
    );
    let filter = EnvFilter::new(direktive);

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    if ergebnis.is_err() {
        tracing::debug!("Logging war bereits initialisiert");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_erkennung() {
        assert_eq!(LogFormat::aus_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::aus_str("text"), LogFormat::Text);
        assert_eq!(LogFormat::aus_str("xml"), LogFormat::Text);
    }

    #[test]
    fn config_werte_ohne_umgebung() {
        let (level, format) = einstellungen_aufloesen("warn", "json", None, None);
        assert_eq!(level, "warn");
        assert_eq!(format, LogFormat::Json);
    }

    #[test]
    fn umgebung_hat_vorrang() {
        let (level, format) = einstellungen_aufloesen(
            "info",
            "text",
            Some("chatly_relay=debug".into()),
            Some("json".into()),
        );
        assert_eq!(level, "chatly_relay=debug");
        assert_eq!(format, LogFormat::Json);
    }
}
