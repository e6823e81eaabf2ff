pub mod accounts;
pub mod drivers;
pub mod places;
pub mod quotes;
