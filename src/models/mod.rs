pub mod attribution;
pub mod image;
pub mod post;
pub mod user;
