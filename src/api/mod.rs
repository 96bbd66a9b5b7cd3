pub(crate) mod auth;
pub(crate) mod circles;
pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod problems;
pub(crate) mod questions;
pub(crate) mod render;
pub(crate) mod router;
pub(crate) mod tags;
pub(crate) mod tasks;
pub(crate) mod teachers;
pub(crate) mod transaction;
pub(crate) mod validation;
