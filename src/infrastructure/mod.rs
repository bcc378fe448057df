pub mod counter;
pub mod generic_repository;
