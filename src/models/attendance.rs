// src/models/attendance.rs

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Teaching days, in week order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Day {
    pub const ALL: [Day; 6] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Day {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Day::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("unknown day '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Present" => Ok(AttendanceStatus::Present),
            "Absent" => Ok(AttendanceStatus::Absent),
            other => Err(format!("unknown attendance status '{}'", other)),
        }
    }
}

/// Represents the 'lectures' (timetable) table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lecture {
    pub id: i64,
    pub department: String,
    pub teacher_id: i64,
    pub semester: i32,
    pub subject_name: String,
    pub day: String,
    pub date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct NewLecture {
    pub department: String,
    pub teacher_id: i64,
    pub semester: i32,
    pub subject_name: String,
    pub day: Day,
    pub date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Represents the 'attendance' table.
/// Unique per (student, lecture, date).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attendance {
    pub id: i64,
    pub student_id: i64,
    pub lecture_id: i64,
    pub date: NaiveDate,
    pub status: String,
}

/// Attendance row joined with its lecture's subject and the student's name.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub lecture_id: i64,
    pub subject_name: String,
    pub date: NaiveDate,
    pub status: String,
}

impl AttendanceRecord {
    pub fn is_present(&self) -> bool {
        self.status == AttendanceStatus::Present.as_str()
    }
}

/// Aggregate over a group of records (one subject or one date).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    /// Subject name or ISO date, depending on the grouping.
    pub key: String,
    pub present: usize,
    pub total: usize,
    pub percentage: f64,
}

/// Records partitioned by date with one date selected for display.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceByDate {
    pub dates: Vec<AttendanceSummary>,
    pub selected_date: Option<NaiveDate>,
    pub records: Vec<AttendanceRecord>,
}

/// One weekday of a timetable.
#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub day: Day,
    pub lectures: Vec<Lecture>,
}

/// DTO for adding a lecture to the timetable.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLectureRequest {
    #[validate(length(min = 1, max = 100))]
    pub department: String,
    #[validate(range(min = 1, max = 12))]
    pub semester: i32,
    #[validate(length(min = 1, max = 100))]
    pub subject_name: String,
    pub day: Day,
    pub date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub student_id: i64,
    pub status: AttendanceStatus,
}

/// DTO for taking attendance of one lecture.
#[derive(Debug, Deserialize, Validate)]
pub struct TakeAttendanceRequest {
    /// Defaults to today.
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 500))]
    pub entries: Vec<AttendanceEntry>,
}

#[derive(Debug, Serialize)]
pub struct TakeAttendanceResponse {
    pub lecture_id: i64,
    pub date: NaiveDate,
    pub created: usize,
    pub updated: usize,
}

/// Query string for views that let the caller pick a date.
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}
