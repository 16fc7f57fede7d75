pub mod attendance;
pub mod grade;
pub mod person;
pub mod reference;
pub mod schedule;

pub use attendance::{AttendancePayload, AttendanceQuery, AttendanceRecord, Attendee};
pub use grade::{GradeRecord, GradeType, GradeValue, NewGradeRequest};
pub use person::Person;
pub use reference::Ref;
pub use schedule::{NewScheduleRequest, ScheduleEntry, ScheduleScope};
