#![allow(unused_imports)]

pub use super::admin_activity::Entity as AdminActivity;
pub use super::airdrop::Entity as Airdrop;
pub use super::airdrop_step::Entity as AirdropStep;
pub use super::app_setting::Entity as AppSetting;
pub use super::category::Entity as Category;
pub use super::user_rating::Entity as UserRating;
