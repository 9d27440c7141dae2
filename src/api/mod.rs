pub mod allowance;
pub mod ctc;
pub mod employee;
pub mod financial;
pub mod leave;
pub mod ltc;
pub mod salary;
pub mod travel;
