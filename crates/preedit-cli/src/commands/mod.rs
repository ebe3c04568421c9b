pub mod compose_ops;
pub mod dict_ops;
pub mod userdb_ops;
