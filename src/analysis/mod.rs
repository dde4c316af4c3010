pub mod alignment;
pub mod manoeuvre;
pub mod optimisation;
pub mod schedule;

pub use self::alignment::{align, Alignment};
pub use self::manoeuvre::{flown_heading, score_elements, select_option, Aligned, Analysis, Basic, Complete, Scored};
pub use self::optimisation::SplitSearch;
pub use self::schedule::{entry_headings, score_schedule, FlightData, ManoeuvreOutcome, ScheduleResults};
