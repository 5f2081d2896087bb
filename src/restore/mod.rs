pub(crate) mod command; // Argument vectors for dropdb/createdb/pg_restore
pub(crate) mod db_restore; // Prepare, restore and report against the target database

pub use db_restore::replace_database;
