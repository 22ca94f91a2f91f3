pub mod chains;
pub mod payment;
pub mod recommend;
pub mod route;
pub mod stats;
