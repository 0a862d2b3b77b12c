pub mod auth;
pub mod engagement;
pub mod feed;
pub mod forms;
pub mod social;
pub mod tweets;
pub mod users;
