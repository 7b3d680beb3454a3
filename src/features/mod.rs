pub mod auth;
pub mod classification;
pub mod points;
pub mod reports;
