pub mod approval;
pub mod claim;
pub mod lecturer;
pub mod principal;
