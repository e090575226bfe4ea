pub mod object_gateway;
pub mod quickstart;
pub mod reef_cluster;
pub mod storage_cluster;
