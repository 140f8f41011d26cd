pub mod operator;

pub use operator::{OperatorContext, ACCESS_LEVEL_HEADER, OPERATOR_ID_HEADER};
