pub mod criteria;
pub mod score;
pub mod template;
