pub mod agenda;
pub mod event;
pub mod occurrence;
pub mod reminder;
