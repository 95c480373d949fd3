use serde::{Deserialize, Serialize};

/// Site-wide settings document stored as JSON in `app_settings` row 1.
///
/// Required text fields deserialize to empty strings when absent so that
/// validation can report them; [`AppSettings::default`] carries the values
/// served before anything has been saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub site_description: String,
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub admin_email: String,
    #[serde(default = "enabled")]
    pub enable_notifications: bool,
    #[serde(default = "enabled")]
    pub enable_analytics: bool,
    #[serde(default)]
    pub maintenance_mode: bool,
    #[serde(default)]
    pub auto_approve_airdrops: bool,
    #[serde(default = "default_airdrops_per_page")]
    pub max_airdrops_per_page: u32,
    #[serde(default = "enabled")]
    pub email_notifications: bool,
    #[serde(default)]
    pub sms_notifications: bool,
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    #[serde(default)]
    pub two_factor_enabled: bool,
    /// Hours
    #[serde(default = "default_session_timeout")]
    pub session_timeout: u32,
    #[serde(default = "default_max_login_attempts")]
    pub max_login_attempts: u32,
    #[serde(default = "default_backup_frequency")]
    pub backup_frequency: String,
    #[serde(default = "enabled")]
    pub enable_rate_limiting: bool,
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            site_name: "AirdropHunter".to_string(),
            site_description: "Your ultimate crypto co-pilot for discovering profitable airdrops"
                .to_string(),
            site_url: "https://airdrophunter.com".to_string(),
            admin_email: "admin@airdrophunter.com".to_string(),
            enable_notifications: true,
            enable_analytics: true,
            maintenance_mode: false,
            auto_approve_airdrops: false,
            max_airdrops_per_page: default_airdrops_per_page(),
            email_notifications: true,
            sms_notifications: false,
            theme_color: default_theme_color(),
            logo_url: None,
            favicon_url: None,
            two_factor_enabled: false,
            session_timeout: default_session_timeout(),
            max_login_attempts: default_max_login_attempts(),
            backup_frequency: default_backup_frequency(),
            enable_rate_limiting: true,
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

pub const BACKUP_FREQUENCIES: [&str; 4] = ["hourly", "daily", "weekly", "monthly"];

fn enabled() -> bool {
    true
}

fn default_airdrops_per_page() -> u32 {
    10
}

fn default_theme_color() -> String {
    "#7cb342".to_string()
}

fn default_session_timeout() -> u32 {
    24
}

fn default_max_login_attempts() -> u32 {
    5
}

fn default_backup_frequency() -> String {
    "daily".to_string()
}

fn default_api_rate_limit() -> u32 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_toggle_defaults_but_blanks_required_text() {
        let settings: AppSettings =
            serde_json::from_value(serde_json::json!({ "siteName": "Hunter" })).unwrap();
        assert_eq!(settings.site_name, "Hunter");
        assert!(settings.admin_email.is_empty());
        assert!(settings.enable_rate_limiting);
        assert_eq!(settings.api_rate_limit, 100);
        assert_eq!(settings.theme_color, "#7cb342");
    }

    #[test]
    fn defaults_serialize_camel_case() {
        let wire = serde_json::to_value(AppSettings::default()).unwrap();
        assert_eq!(wire["siteName"], "AirdropHunter");
        assert_eq!(wire["maxAirdropsPerPage"], 10);
        assert!(wire.get("logoUrl").is_none());
    }
}
