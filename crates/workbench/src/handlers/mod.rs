#![forbid(unsafe_code)]

mod autosave;
mod info;
mod nl;
mod query;
mod table;
mod workspace;
