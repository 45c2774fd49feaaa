pub mod audit;
pub mod batch;
pub mod billing;
pub mod company;
pub mod invoice;
pub mod relationship;
