pub mod analysis;
pub mod company;
pub mod contract;
pub mod user;
