pub mod color;
pub mod jwt;
pub mod score;
