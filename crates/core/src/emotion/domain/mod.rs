pub mod category_mapper;
pub mod emotion;
pub mod threat_category;
