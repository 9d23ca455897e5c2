pub mod account;
pub mod attendance;
pub mod authoring;
pub mod authz;
pub mod grading;
pub mod material;
pub mod notification;
pub mod timetable;
