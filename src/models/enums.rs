//! Shared domain enums stored as text columns

use serde::{Deserialize, Serialize};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, Postgres,
};
use utoipa::ToSchema;

/// Declares an enum persisted as its lowercase text label, with the
/// string, serde and sqlx conversions every status column needs.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($label => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as sqlx::Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as sqlx::Type<Postgres>>::compatible(ty)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let s = <&str as Decode<Postgres>>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
                <&str as Encode<Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    /// Role of a credentialed user
    Role {
        Admin => "admin",
        Teacher => "teacher",
        Viewer => "viewer",
        Librarian => "librarian",
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Teacher
    }
}

text_enum! {
    AttendanceStatus {
        Present => "present",
        Absent => "absent",
        Late => "late",
    }
}

impl AttendanceStatus {
    /// Whether the student was in class (late arrivals count as attended)
    pub fn attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

text_enum! {
    /// Status of one physical copy; the source of truth for availability
    CopyStatus {
        Available => "available",
        Borrowed => "borrowed",
        Reserved => "reserved",
        Maintenance => "maintenance",
        Lost => "lost",
    }
}

text_enum! {
    BorrowingStatus {
        Borrowed => "borrowed",
        Returned => "returned",
    }
}

text_enum! {
    ReservationStatus {
        Active => "active",
        Fulfilled => "fulfilled",
        Expired => "expired",
        Cancelled => "cancelled",
    }
}

impl ReservationStatus {
    /// Whether the hold runs out once `expires_at` passes. A fulfilled
    /// hold expires when the patron never picks the copy up.
    pub fn lapses(&self) -> bool {
        matches!(self, ReservationStatus::Active | ReservationStatus::Fulfilled)
    }

    /// Labels of every status the expiry sweep moves to `expired`
    pub fn lapsing() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|status| status.lapses())
            .map(|status| status.as_str())
            .collect()
    }
}

text_enum! {
    /// Delivery state of an outgoing email
    EmailStatus {
        Pending => "pending",
        Sent => "sent",
        Failed => "failed",
    }
}

text_enum! {
    EmailFrequency {
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Never => "never",
    }
}

text_enum! {
    EmailKind {
        AttendanceConfirmation => "attendance_confirmation",
        AttendanceReport => "attendance_report",
        DailySummary => "daily_summary",
        WeeklySummary => "weekly_summary",
        Notification => "notification",
        ReservationReady => "reservation_ready",
        Welcome => "welcome",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_case_insensitive_on_parse() {
        assert_eq!("Librarian".parse::<Role>().unwrap(), Role::Librarian);
        assert_eq!("LATE".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::Late);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn multiword_labels_use_snake_case() {
        assert_eq!(EmailKind::ReservationReady.to_string(), "reservation_ready");
        let json = serde_json::to_string(&EmailKind::DailySummary).unwrap();
        assert_eq!(json, "\"daily_summary\"");
        let kind: EmailKind = serde_json::from_str("\"attendance_report\"").unwrap();
        assert_eq!(kind, EmailKind::AttendanceReport);
    }

    #[test]
    fn late_counts_as_attended() {
        assert!(AttendanceStatus::Present.attended());
        assert!(AttendanceStatus::Late.attended());
        assert!(!AttendanceStatus::Absent.attended());
    }

    #[test]
    fn default_role_is_teacher() {
        assert_eq!(Role::default(), Role::Teacher);
    }

    #[test]
    fn uncollected_fulfilled_holds_lapse() {
        assert!(ReservationStatus::Active.lapses());
        assert!(ReservationStatus::Fulfilled.lapses());
        assert!(!ReservationStatus::Cancelled.lapses());
        assert!(!ReservationStatus::Expired.lapses());
        assert_eq!(ReservationStatus::lapsing(), vec!["active", "fulfilled"]);
    }
}
