pub(crate) mod circles;
pub(crate) mod errors;
pub(crate) mod exam_lifecycle;
pub(crate) mod exams;
pub(crate) mod fingerprint;
pub(crate) mod membership;
pub(crate) mod permissions;
pub(crate) mod problems;
pub(crate) mod question_reconciler;
pub(crate) mod registries;
pub(crate) mod render;
pub(crate) mod tag_set;
pub(crate) mod teachers;
