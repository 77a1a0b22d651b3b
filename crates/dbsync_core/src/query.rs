use crate::Value;

pub type Row = Vec<Value>;
