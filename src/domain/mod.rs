pub mod engagement;
pub mod social_graph;
pub mod tweet;
pub mod user;
