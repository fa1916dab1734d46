pub(crate) mod compiler;
pub(crate) mod job;
