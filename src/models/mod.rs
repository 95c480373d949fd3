pub mod airdrop;
pub mod category;
pub mod rating;
pub mod settings;
