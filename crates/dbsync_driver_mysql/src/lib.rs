mod driver;

pub use driver::{MysqlAdapter, MysqlDialect};
