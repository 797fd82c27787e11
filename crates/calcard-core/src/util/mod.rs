pub mod resource_name;
pub mod uid;
