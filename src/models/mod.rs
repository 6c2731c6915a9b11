pub mod criteria;
pub mod health;
pub mod payload;
pub mod request;
pub mod response;
pub mod user;
