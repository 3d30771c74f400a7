pub mod db_utils;
pub mod gallery_cache;
pub mod username_filter;
