use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::IntakeTiming;
use shared::domain::Visibility;

const SETTINGS_FILE: &str = "visualizer.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub generation_url: Option<String>,
    pub persistence_url: Option<String>,
    pub upload_interval_ms: u64,
    pub progress_increment: u8,
    pub redirect_delay_ms: u64,
    pub signed_in: bool,
    pub visibility: Visibility,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generation_url: None,
            persistence_url: None,
            upload_interval_ms: client_core::UPLOAD_INTERVAL_MS,
            progress_increment: client_core::PROGRESS_INCREMENT,
            redirect_delay_ms: client_core::REDIRECT_DELAY_MS,
            signed_in: true,
            visibility: Visibility::Private,
        }
    }
}

impl Settings {
    pub fn intake_timing(&self) -> IntakeTiming {
        IntakeTiming {
            interval: Duration::from_millis(self.upload_interval_ms.max(1)),
            increment: self.progress_increment.max(1),
            redirect_delay: Duration::from_millis(self.redirect_delay_ms),
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat settings file, then environment overrides.
fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => apply(&mut settings, |key| file_cfg.get(key).cloned()),
            Err(err) => tracing::warn!(
                path = %path.display(),
                error = %err,
                "ignoring unreadable settings file"
            ),
        }
    }

    apply(&mut settings, |key| {
        env(&format!("APP__{}", key.to_ascii_uppercase()))
    });
    if let Some(v) = env("VISUALIZER_GENERATION_URL") {
        settings.generation_url = Some(v);
    }
    if let Some(v) = env("VISUALIZER_PERSISTENCE_URL") {
        settings.persistence_url = Some(v);
    }

    settings
}

fn apply(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("generation_url") {
        settings.generation_url = non_blank(v);
    }
    if let Some(v) = lookup("persistence_url") {
        settings.persistence_url = non_blank(v);
    }
    if let Some(parsed) = lookup("upload_interval_ms").and_then(|v| v.trim().parse().ok()) {
        settings.upload_interval_ms = parsed;
    }
    if let Some(parsed) = lookup("progress_increment").and_then(|v| v.trim().parse().ok()) {
        settings.progress_increment = parsed;
    }
    if let Some(parsed) = lookup("redirect_delay_ms").and_then(|v| v.trim().parse().ok()) {
        settings.redirect_delay_ms = parsed;
    }
    if let Some(parsed) = lookup("signed_in").and_then(|v| v.trim().parse().ok()) {
        settings.signed_in = parsed;
    }
    if let Some(parsed) = lookup("visibility").and_then(|v| v.parse().ok()) {
        settings.visibility = parsed;
    }
}

fn non_blank(value: String) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn temp_settings_file(contents: &str) -> std::path::PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let path = env::temp_dir().join(format!("visualizer_settings_{suffix}.toml"));
        fs::write(&path, contents).expect("write settings");
        path
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let settings = load_settings_from(Path::new("/nonexistent/visualizer.toml"), |_| None);
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.intake_timing(), IntakeTiming::default());
    }

    #[test]
    fn file_values_then_env_overrides() {
        let path = temp_settings_file(
            r#"
generation_url = "http://localhost:9000"
upload_interval_ms = "50"
progress_increment = "25"
visibility = "public"
"#,
        );

        let settings = load_settings_from(&path, |key| match key {
            "APP__UPLOAD_INTERVAL_MS" => Some("75".into()),
            "APP__SIGNED_IN" => Some("false".into()),
            "VISUALIZER_PERSISTENCE_URL" => Some("http://localhost:9001".into()),
            _ => None,
        });

        assert_eq!(settings.generation_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(settings.persistence_url.as_deref(), Some("http://localhost:9001"));
        assert_eq!(settings.upload_interval_ms, 75);
        assert_eq!(settings.progress_increment, 25);
        assert!(!settings.signed_in);
        assert_eq!(settings.visibility, Visibility::Public);

        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let path = temp_settings_file("progress_increment = \"lots\"\ngeneration_url = \"  \"\n");

        let settings = load_settings_from(&path, |_| None);

        assert_eq!(settings.progress_increment, client_core::PROGRESS_INCREMENT);
        assert_eq!(settings.generation_url, None);
        fs::remove_file(path).expect("cleanup");
    }

    #[test]
    fn timing_never_uses_zero_interval_or_step() {
        let settings = Settings {
            upload_interval_ms: 0,
            progress_increment: 0,
            ..Settings::default()
        };
        let timing = settings.intake_timing();
        assert_eq!(timing.interval, Duration::from_millis(1));
        assert_eq!(timing.increment, 1);
    }
}
