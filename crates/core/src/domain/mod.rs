pub mod event;
pub mod friend;
pub mod product;
