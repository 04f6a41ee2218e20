pub mod audio;
pub mod ddl;
pub mod metadata;
pub mod users;
