pub mod link_ops;
pub mod maintenance;
pub mod memory_crud;
pub mod memory_query;
pub mod memory_search;
pub mod vector_search;
