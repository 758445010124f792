pub mod branches;
pub mod graph;
pub mod search;
pub mod show;
pub mod status;
pub mod watch;
