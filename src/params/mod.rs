pub(crate) mod kind;
pub(crate) mod set;
pub(crate) mod solver;
