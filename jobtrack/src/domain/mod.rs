//! Entities of the job tracker.

/// Error returned when a string names no variant of a `named_enum!` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

impl std::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' is not a valid {}, expected one of {}",
            self.value,
            self.kind,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for UnknownVariant {}

/// An enum stored and parsed by its variant name.
///
/// Parsing ignores ASCII case; serde uses the exact variant name.
macro_rules! named_enum {
    ($(#[$attr:meta])* $name:ident, $kind:literal { $($variant:ident),+ $(,)? }) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const NAMES: &'static [&'static str] = &[$(stringify!($variant)),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::domain::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case(stringify!($variant)) {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::domain::UnknownVariant {
                    kind: $kind,
                    value: s.to_string(),
                    expected: Self::NAMES,
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

mod country;
mod job;
mod resume;
mod template;
mod user;

pub use country::Country;
pub use job::{EmploymentType, Job, JobStatus, WorkSettingType};
pub use resume::{Experience, ResumeMainInfo};
pub use template::ResumeTemplate;
pub use user::User;
