pub(crate) mod activities;
pub(crate) mod classes;
pub(crate) mod lessons;
pub(crate) mod parent_relations;
pub(crate) mod schools;
pub(crate) mod users;
