pub mod admin_activity;
pub mod airdrop;
pub mod airdrop_step;
pub mod app_setting;
pub mod category;
pub mod prelude;
pub mod user_rating;
