pub(crate) mod circles;
pub(crate) mod exams;
pub(crate) mod health;
pub(crate) mod problems;
pub(crate) mod questions;
pub(crate) mod subjects;
pub(crate) mod tags;
pub(crate) mod tasks;
pub(crate) mod teachers;
