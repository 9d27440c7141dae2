pub mod allowance;
pub mod employee;
pub mod leave;
pub mod ltc;
pub mod role;
pub mod salary;
pub mod travel;
