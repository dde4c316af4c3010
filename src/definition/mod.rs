pub mod builders;
pub mod catalogue;
pub mod eldef;
pub mod expr;
pub mod mandef;
pub mod maninfo;
pub mod manoeuvre;
pub mod manparm;

pub use self::catalogue::{load_schedule, KnownSchedule};
pub use self::eldef::ElDef;
pub use self::expr::{BinOp, Expr, Scope, UnaryFunc};
pub use self::mandef::{ManDef, ManDefOrOption, ManOption, SchedDef};
pub use self::maninfo::{BoxLocation, Direction, Heading, Height, ManInfo, Orientation, Position};
pub use self::manoeuvre::Manoeuvre;
pub use self::manparm::{CollectorGraph, FieldSlot, ManParm, ManParms};
