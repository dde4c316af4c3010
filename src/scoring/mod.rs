pub mod applicator;
pub mod downgrade;
pub mod judging_box;
pub mod measurement;
pub mod results;
pub mod selectors;
pub mod smoothing;
pub mod visibility;

pub use self::applicator::element_downgrades;
pub use self::downgrade::{DownGrade, DownGrades};
pub use self::judging_box::JudgingBox;
pub use self::measurement::{Measure, Measurement};
pub use self::results::{ElementsResults, ManoeuvreResults, Result, Results, ScoreSummary};
pub use self::selectors::Selector;
pub use self::smoothing::Smoother;
pub use self::visibility::{Visibility, VisibilityKind};
