pub mod authorizer;
pub mod clock;
pub mod repository;
pub mod tokener;
