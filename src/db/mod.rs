pub mod db_pool;
pub mod values;
