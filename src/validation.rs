use std::collections::BTreeMap;

use chrono::NaiveDate;
use reqwest::Url;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::catalog::{self, MAX_SLUG_LEN, StepDraft, StepList};
use crate::models::airdrop::{About, AirdropStatus, Difficulty, SocialLinks};
use crate::models::category::{
    CategoryDraft, CategoryPayload, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON,
};
use crate::models::settings::{AppSettings, BACKUP_FREQUENCIES};

pub const MAX_NAME_LEN: usize = 100;
pub const MIN_DESCRIPTION_LEN: usize = 10;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_ACTION_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_REWARD_LEN: usize = 128;
pub const MAX_ABOUT_LEN: usize = 5_000;
pub const MAX_STEPS: usize = 20;
pub const MAX_STEP_TITLE_LEN: usize = 200;
pub const MAX_STEP_DESCRIPTION_LEN: usize = 1_000;
pub const MAX_REQUIREMENTS: usize = 20;
pub const MAX_REQUIREMENT_LEN: usize = 300;
pub const MAX_NETWORKS: usize = 16;
pub const MAX_NETWORK_LEN: usize = 32;
pub const MAX_URL_LEN: usize = 2_048;
pub const MAX_CATEGORY_DESCRIPTION_LEN: usize = 500;
pub const MAX_CATEGORY_ICON_LEN: usize = 32;

const _: [(); MAX_SLUG_LEN - MAX_NAME_LEN] = [(); MAX_SLUG_LEN - MAX_NAME_LEN];

/// Field path to message, in the order the problems were found. Only the
/// first message per path is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(String, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(path, message);
        errors
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        let path = path.into();
        if self.entries.iter().any(|(existing, _)| *existing == path) {
            return;
        }
        self.entries.push((path, message.into()));
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == path)
            .map(|(_, message)| message.as_str())
    }

    pub fn first(&self) -> Option<(&str, &str)> {
        self.entries
            .first()
            .map(|(path, message)| (path.as_str(), message.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(path, message)| (path.as_str(), message.as_str()))
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries.into_iter().collect()
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, message) in &self.entries {
            map.serialize_entry(path, message)?;
        }
        map.end()
    }
}

fn field_path(parent: &str, child: &str) -> String {
    format!("{parent}.{child}")
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicInfoPayload {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub logo: Option<String>,
    pub description: Option<String>,
    pub action: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub difficulty: Option<String>,
    pub reward: Option<String>,
    pub start_date: Option<String>,
    pub participants: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AboutPayload {
    pub overview: Option<String>,
    pub tokenomics: Option<String>,
    pub roadmap: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_required: Option<bool>,
}

/// Steps arrive either as bare titles or as full objects.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StepPayload {
    Text(String),
    Detailed(StepFields),
}

/// Admin create/edit body, grouped the way the admin form is laid out.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AirdropPayload {
    #[serde(flatten)]
    pub basic: BasicInfoPayload,
    pub social_links: SocialLinks,
    pub about: AboutPayload,
    pub steps: Vec<StepPayload>,
    pub requirements: Vec<String>,
    pub networks: Vec<String>,
    pub is_hot: bool,
    pub is_confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
    pub name: String,
    pub slug: String,
    pub logo: String,
    pub description: String,
    pub action: String,
    pub category: String,
    pub status: AirdropStatus,
    pub difficulty: Difficulty,
    pub reward: String,
    pub start_date: Option<String>,
    pub participants: i64,
}

/// A payload that passed every group validator, normalized for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirdropDraft {
    #[serde(flatten)]
    pub basic: BasicInfo,
    pub social_links: SocialLinks,
    pub about: About,
    pub steps: StepList,
    pub requirements: Vec<String>,
    pub networks: Vec<String>,
    pub is_hot: bool,
    pub is_confirmed: bool,
}

pub fn validate_airdrop(payload: &AirdropPayload) -> Result<AirdropDraft, FieldErrors> {
    let mut errors = FieldErrors::new();
    let basic = validate_basic_info(&payload.basic, &mut errors);
    let social_links = validate_social_links(&payload.social_links, "socialLinks", &mut errors);
    let about = validate_about(&payload.about, "about", &mut errors);
    let steps = validate_steps(&payload.steps, "steps", &mut errors);
    let requirements = validate_requirements(&payload.requirements, "requirements", &mut errors);
    let networks = validate_networks(&payload.networks, "networks", &mut errors);

    match basic {
        Some(basic) if errors.is_empty() => Ok(AirdropDraft {
            basic,
            social_links,
            about,
            steps,
            requirements,
            networks,
            is_hot: payload.is_hot,
            is_confirmed: payload.is_confirmed,
        }),
        _ => Err(errors),
    }
}

pub fn validate_basic_info(payload: &BasicInfoPayload, errors: &mut FieldErrors) -> Option<BasicInfo> {
    let before = errors.len();

    let name = required_text(&payload.name, "name", errors);
    let description = required_text(&payload.description, "description", errors);
    let action = required_text(&payload.action, "action", errors);
    let category = required_text(&payload.category, "category", errors);
    let status = required_text(&payload.status, "status", errors);
    let difficulty = required_text(&payload.difficulty, "difficulty", errors);

    if let Some(name) = name {
        check_max_len(name, MAX_NAME_LEN, "name", "Name too long", errors);
    }
    if let Some(description) = description {
        let length = description.chars().count();
        if length < MIN_DESCRIPTION_LEN {
            errors.push(
                "description",
                format!("Description must be at least {MIN_DESCRIPTION_LEN} characters"),
            );
        } else if length > MAX_DESCRIPTION_LEN {
            errors.push("description", "Description too long");
        }
    }
    if let Some(action) = action {
        check_max_len(action, MAX_ACTION_LEN, "action", "Action too long", errors);
    }
    if let Some(category) = category {
        check_max_len(category, MAX_CATEGORY_LEN, "category", "Category too long", errors);
    }
    let status = status.and_then(|value| {
        let parsed = AirdropStatus::parse(value);
        if parsed.is_none() {
            errors.push("status", "Invalid status");
        }
        parsed
    });
    let difficulty = difficulty.and_then(|value| {
        let parsed = Difficulty::parse(value);
        if parsed.is_none() {
            errors.push("difficulty", "Invalid difficulty");
        }
        parsed
    });

    let slug = match non_blank(&payload.slug) {
        Some(provided) => {
            let normalized = catalog::generate_slug(provided);
            if normalized.is_empty() {
                errors.push("slug", "Slug must contain letters or digits");
            } else if normalized.len() > MAX_SLUG_LEN {
                errors.push("slug", "Slug too long");
            }
            normalized
        }
        None => {
            let derived = name.map(catalog::generate_slug).unwrap_or_default();
            if name.is_some() && derived.is_empty() {
                errors.push("slug", "Name must contain letters or digits to derive a slug");
            }
            derived
        }
    };

    let logo = match non_blank(&payload.logo) {
        Some(logo) => {
            if !logo.starts_with('/') && !is_http_url(logo) {
                errors.push("logo", "Logo must be an http(s) URL or an uploaded path");
            }
            logo.to_string()
        }
        None => placeholder_logo(name.unwrap_or("")),
    };

    let reward = match non_blank(&payload.reward) {
        Some(reward) => {
            check_max_len(reward, MAX_REWARD_LEN, "reward", "Reward too long", errors);
            reward.to_string()
        }
        None => "TBA".to_string(),
    };

    let start_date = non_blank(&payload.start_date).map(str::to_string);
    if let Some(date) = start_date.as_deref() {
        if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() || date.len() != 10 {
            errors.push("startDate", "Start date must use YYYY-MM-DD");
        }
    }

    let participants = payload.participants.unwrap_or(0);
    if participants < 0 {
        errors.push("participants", "Participants cannot be negative");
    }

    if errors.len() != before {
        return None;
    }
    Some(BasicInfo {
        name: name?.to_string(),
        slug,
        logo,
        description: description?.to_string(),
        action: action?.to_string(),
        category: category?.to_string(),
        status: status?,
        difficulty: difficulty?,
        reward,
        start_date,
        participants,
    })
}

pub fn validate_social_links(
    links: &SocialLinks,
    parent: &str,
    errors: &mut FieldErrors,
) -> SocialLinks {
    let mut cleaned = SocialLinks::default();
    for (field, value) in links.entries() {
        let Some(url) = value.map(str::trim).filter(|url| !url.is_empty()) else {
            continue;
        };
        if url.len() > MAX_URL_LEN || !is_http_url(url) {
            errors.push(field_path(parent, field), "Invalid URL");
            continue;
        }
        cleaned.set(field, Some(url.to_string()));
    }
    cleaned
}

pub fn validate_about(about: &AboutPayload, parent: &str, errors: &mut FieldErrors) -> About {
    let mut section = |value: &Option<String>, field: &str, label: &str| -> String {
        let text = value.as_deref().map(str::trim).unwrap_or("");
        if text.chars().count() > MAX_ABOUT_LEN {
            errors.push(field_path(parent, field), format!("{label} too long"));
        }
        text.to_string()
    };
    About {
        overview: section(&about.overview, "overview", "Overview"),
        tokenomics: section(&about.tokenomics, "tokenomics", "Tokenomics"),
        roadmap: section(&about.roadmap, "roadmap", "Roadmap"),
    }
}

/// Blank steps are dropped; error paths keep the index of the incoming list.
pub fn validate_steps(steps: &[StepPayload], parent: &str, errors: &mut FieldErrors) -> StepList {
    let mut kept = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let (title, description, is_required, title_path) = match step {
            StepPayload::Text(text) => (text.trim(), "", true, index_path(parent, index)),
            StepPayload::Detailed(fields) => (
                fields.title.as_deref().map(str::trim).unwrap_or(""),
                fields.description.as_deref().map(str::trim).unwrap_or(""),
                fields.is_required.unwrap_or(true),
                field_path(&index_path(parent, index), "title"),
            ),
        };
        if title.is_empty() {
            continue;
        }
        if title.chars().count() > MAX_STEP_TITLE_LEN {
            errors.push(title_path, "Step title too long");
        }
        if description.chars().count() > MAX_STEP_DESCRIPTION_LEN {
            errors.push(
                field_path(&index_path(parent, index), "description"),
                "Step description too long",
            );
        }
        kept.push(StepDraft {
            step_number: 0,
            title: title.to_string(),
            description: description.to_string(),
            is_required,
        });
    }
    if kept.len() > MAX_STEPS {
        errors.push(parent, format!("At most {MAX_STEPS} steps are allowed"));
    }
    StepList::from_steps(kept)
}

pub fn validate_requirements(
    requirements: &[String],
    parent: &str,
    errors: &mut FieldErrors,
) -> Vec<String> {
    let mut kept = Vec::with_capacity(requirements.len());
    for (index, requirement) in requirements.iter().enumerate() {
        let requirement = requirement.trim();
        if requirement.is_empty() {
            continue;
        }
        if requirement.chars().count() > MAX_REQUIREMENT_LEN {
            errors.push(index_path(parent, index), "Requirement too long");
        }
        kept.push(requirement.to_string());
    }
    if kept.len() > MAX_REQUIREMENTS {
        errors.push(
            parent,
            format!("At most {MAX_REQUIREMENTS} requirements are allowed"),
        );
    }
    kept
}

pub fn validate_networks(networks: &[String], parent: &str, errors: &mut FieldErrors) -> Vec<String> {
    let mut kept: Vec<String> = Vec::with_capacity(networks.len());
    for (index, network) in networks.iter().enumerate() {
        let network = network.trim();
        if network.is_empty() {
            continue;
        }
        if network.chars().count() > MAX_NETWORK_LEN {
            errors.push(index_path(parent, index), "Network name too long");
            continue;
        }
        if !kept.iter().any(|existing| existing.eq_ignore_ascii_case(network)) {
            kept.push(network.to_string());
        }
    }
    if kept.len() > MAX_NETWORKS {
        errors.push(parent, format!("At most {MAX_NETWORKS} networks are allowed"));
    }
    kept
}

pub fn validate_category(payload: &CategoryPayload) -> Result<CategoryDraft, FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = non_blank(&payload.name);
    match name {
        None => errors.push("name", "Category name is required"),
        Some(name) => check_max_len(name, MAX_CATEGORY_LEN, "name", "Category name too long", &mut errors),
    }
    let description = non_blank(&payload.description).unwrap_or("");
    check_max_len(
        description,
        MAX_CATEGORY_DESCRIPTION_LEN,
        "description",
        "Description too long",
        &mut errors,
    );
    let color = non_blank(&payload.color).unwrap_or(DEFAULT_CATEGORY_COLOR);
    if !is_hex_color(color) {
        errors.push("color", "Invalid color format");
    }
    let icon = non_blank(&payload.icon).unwrap_or(DEFAULT_CATEGORY_ICON);
    check_max_len(icon, MAX_CATEGORY_ICON_LEN, "icon", "Icon name too long", &mut errors);

    match name {
        Some(name) if errors.is_empty() => Ok(CategoryDraft {
            name: name.to_string(),
            description: description.to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
        }),
        _ => Err(errors),
    }
}

pub fn validate_settings(settings: &AppSettings) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    for (field, value) in [
        ("siteName", &settings.site_name),
        ("siteDescription", &settings.site_description),
        ("adminEmail", &settings.admin_email),
    ] {
        if value.trim().is_empty() {
            errors.push(field, format!("{field} is required"));
        }
    }
    if !settings.admin_email.trim().is_empty() && !is_email(settings.admin_email.trim()) {
        errors.push("adminEmail", "Invalid admin email format");
    }
    if !settings.site_url.is_empty() && !is_http_url(&settings.site_url) {
        errors.push("siteUrl", "Invalid site URL format");
    }
    if !settings.theme_color.is_empty() && !is_hex_color(&settings.theme_color) {
        errors.push("themeColor", "Invalid theme color format");
    }
    for (field, value) in [
        ("logoUrl", settings.logo_url.as_deref()),
        ("faviconUrl", settings.favicon_url.as_deref()),
    ] {
        if let Some(url) = value.filter(|url| !url.is_empty()) {
            if !url.starts_with('/') && !is_http_url(url) {
                errors.push(field, "Invalid URL format");
            }
        }
    }
    if !(1..=100).contains(&settings.max_airdrops_per_page) {
        errors.push("maxAirdropsPerPage", "Must be between 1 and 100");
    }
    if !(1..=720).contains(&settings.session_timeout) {
        errors.push("sessionTimeout", "Must be between 1 and 720 hours");
    }
    if !(1..=100).contains(&settings.max_login_attempts) {
        errors.push("maxLoginAttempts", "Must be between 1 and 100");
    }
    if !(1..=10_000).contains(&settings.api_rate_limit) {
        errors.push("apiRateLimit", "Must be between 1 and 10000");
    }
    if !BACKUP_FREQUENCIES.contains(&settings.backup_frequency.as_str()) {
        errors.push("backupFrequency", "Invalid backup frequency");
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn is_http_url(value: &str) -> bool {
    match Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|ch| ch.is_ascii_hexdigit())
}

pub fn is_email(value: &str) -> bool {
    let mut parts = value.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || value.chars().any(char::is_whitespace) {
        return false;
    }
    domain
        .char_indices()
        .any(|(index, ch)| ch == '.' && index > 0 && index + 1 < domain.len())
}

pub fn placeholder_logo(name: &str) -> String {
    let initial: String = name
        .trim()
        .chars()
        .next()
        .map(|ch| ch.to_uppercase().collect())
        .unwrap_or_else(|| "A".to_string());
    format!("/placeholder.svg?height=48&width=48&text={initial}")
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|text| !text.is_empty())
}

fn required_text<'a>(value: &'a Option<String>, field: &str, errors: &mut FieldErrors) -> Option<&'a str> {
    let text = non_blank(value);
    if text.is_none() {
        errors.push(field, format!("{field} is required"));
    }
    text
}

fn check_max_len(value: &str, max: usize, path: &str, message: &str, errors: &mut FieldErrors) {
    if value.chars().count() > max {
        errors.push(path, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> AirdropPayload {
        serde_json::from_value(value).expect("payload deserializes")
    }

    fn valid_body() -> serde_json::Value {
        json!({
            "name": "LayerZero Season 2",
            "description": "Cross-chain messaging protocol airdrop",
            "action": "Bridge assets across chains",
            "category": "latest",
            "status": "active",
            "difficulty": "Medium",
            "socialLinks": { "twitter": "https://twitter.com/layerzero", "website": "  " },
            "about": { "overview": "Omnichain interoperability" },
            "steps": [
                "Bridge on Stargate",
                { "title": "Vote on Snapshot", "description": "Any proposal", "isRequired": false },
                "   "
            ],
            "requirements": ["Wallet with ETH", ""],
            "networks": ["Ethereum", "ethereum", "Arbitrum"],
            "isHot": true
        })
    }

    #[test]
    fn valid_payload_produces_draft() {
        let draft = validate_airdrop(&payload(valid_body())).expect("valid");
        assert_eq!(draft.basic.slug, "layerzero-season-2");
        assert_eq!(draft.basic.status, AirdropStatus::Active);
        assert_eq!(draft.basic.reward, "TBA");
        assert_eq!(
            draft.basic.logo,
            "/placeholder.svg?height=48&width=48&text=L"
        );
        assert_eq!(draft.steps.len(), 2);
        let second = &draft.steps.as_slice()[1];
        assert_eq!(second.step_number, 2);
        assert!(!second.is_required);
        assert_eq!(draft.requirements, vec!["Wallet with ETH"]);
        assert_eq!(draft.networks, vec!["Ethereum", "Arbitrum"]);
        assert!(draft.social_links.website.is_none());
        assert!(draft.is_hot);
    }

    #[test]
    fn missing_required_fields_are_reported_in_form_order() {
        let errors = validate_airdrop(&AirdropPayload::default()).unwrap_err();
        assert_eq!(errors.first(), Some(("name", "name is required")));
        for field in ["description", "action", "category", "status", "difficulty"] {
            assert_eq!(errors.get(field), Some(format!("{field} is required").as_str()));
        }
        assert!(errors.get("slug").is_none());
    }

    #[test]
    fn nested_paths_identify_offending_entries() {
        let mut body = valid_body();
        body["socialLinks"]["discord"] = json!("discord.gg/abc");
        body["about"]["roadmap"] = json!("x".repeat(MAX_ABOUT_LEN + 1));
        body["steps"] = json!(["ok", { "title": "t".repeat(MAX_STEP_TITLE_LEN + 1) }]);
        body["requirements"] = json!(["fine", "", "r".repeat(MAX_REQUIREMENT_LEN + 1)]);
        let errors = validate_airdrop(&payload(body)).unwrap_err();
        assert_eq!(errors.get("socialLinks.discord"), Some("Invalid URL"));
        assert_eq!(errors.get("about.roadmap"), Some("Roadmap too long"));
        assert_eq!(errors.get("steps[1].title"), Some("Step title too long"));
        assert_eq!(errors.get("requirements[2]"), Some("Requirement too long"));
    }

    #[test]
    fn field_rules() {
        let mut body = valid_body();
        body["description"] = json!("too short");
        body["status"] = json!("live");
        body["difficulty"] = json!("Extreme");
        body["startDate"] = json!("2024/01/05");
        let errors = validate_airdrop(&payload(body)).unwrap_err();
        assert_eq!(
            errors.get("description"),
            Some("Description must be at least 10 characters")
        );
        assert_eq!(errors.get("status"), Some("Invalid status"));
        assert_eq!(errors.get("difficulty"), Some("Invalid difficulty"));
        assert_eq!(errors.get("startDate"), Some("Start date must use YYYY-MM-DD"));
    }

    #[test]
    fn slug_is_normalized_or_rejected() {
        let mut body = valid_body();
        body["slug"] = json!("Custom Slug!");
        let draft = validate_airdrop(&payload(body.clone())).unwrap();
        assert_eq!(draft.basic.slug, "custom-slug");

        body["slug"] = json!("");
        body["name"] = json!("???");
        let errors = validate_airdrop(&payload(body)).unwrap_err();
        assert!(errors.get("slug").is_some());
    }

    #[test]
    fn too_many_steps_rejected() {
        let mut body = valid_body();
        let steps: Vec<String> = (0..=MAX_STEPS).map(|i| format!("Step {i}")).collect();
        body["steps"] = json!(steps);
        let errors = validate_airdrop(&payload(body)).unwrap_err();
        assert_eq!(errors.get("steps"), Some("At most 20 steps are allowed"));
    }

    #[test]
    fn field_errors_keep_first_message_and_serialize_in_order() {
        let mut errors = FieldErrors::new();
        errors.push("b", "first");
        errors.push("a", "second");
        errors.push("b", "ignored");
        assert_eq!(errors.len(), 2);
        assert_eq!(
            serde_json::to_string(&errors).unwrap(),
            r#"{"b":"first","a":"second"}"#
        );
    }

    #[test]
    fn category_defaults_and_rules() {
        let draft = validate_category(&CategoryPayload {
            name: Some(" DeFi ".into()),
            ..CategoryPayload::default()
        })
        .unwrap();
        assert_eq!(draft.name, "DeFi");
        assert_eq!(draft.color, DEFAULT_CATEGORY_COLOR);
        assert_eq!(draft.icon, DEFAULT_CATEGORY_ICON);

        let errors = validate_category(&CategoryPayload {
            name: None,
            color: Some("green".into()),
            ..CategoryPayload::default()
        })
        .unwrap_err();
        assert_eq!(errors.get("name"), Some("Category name is required"));
        assert_eq!(errors.get("color"), Some("Invalid color format"));
    }

    #[test]
    fn settings_rules() {
        assert!(validate_settings(&AppSettings::default()).is_ok());

        let mut settings = AppSettings::default();
        settings.admin_email = "not-an-email".into();
        settings.theme_color = "#12345".into();
        settings.site_url = "ftp://example.com".into();
        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.get("adminEmail"), Some("Invalid admin email format"));
        assert_eq!(errors.get("themeColor"), Some("Invalid theme color format"));
        assert_eq!(errors.get("siteUrl"), Some("Invalid site URL format"));

        settings = AppSettings::default();
        settings.site_name = "  ".into();
        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.first(), Some(("siteName", "siteName is required")));
    }

    #[test]
    fn format_helpers() {
        assert!(is_email("admin@airdrophunter.com"));
        assert!(!is_email("admin@localhost"));
        assert!(!is_email("a b@example.com"));
        assert!(!is_email("a@b@example.com"));
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#7CB342"));
        assert!(!is_hex_color("7cb342"));
        assert!(is_http_url("https://example.com/path"));
        assert!(!is_http_url("javascript:alert(1)"));
    }
}
