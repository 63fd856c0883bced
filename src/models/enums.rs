use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AppointmentStatus {
    Scheduled => "Scheduled",
    Completed => "Completed",
    Cancelled => "Cancelled",
    NoShow => "No Show",
});

str_enum!(PaymentStatus {
    Pending => "Pending",
    Paid => "Paid",
    Partial => "Partial",
});

str_enum!(IdPrefix {
    Patient => "PAT",
    Doctor => "DOC",
    Appointment => "APT",
    Prescription => "PRES",
    Bill => "BILL",
});

str_enum!(AppModule {
    Dashboard => "dashboard",
    Patient => "patient",
    Doctor => "doctor",
    Appointments => "appointments",
    Prescription => "prescription",
    Billing => "billing",
    Report => "report",
});

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Scheduled
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl AppointmentStatus {
    /// Scheduled may move to any outcome; outcomes are final.
    /// Rewriting the current status is always accepted.
    pub fn can_transition_to(self, next: Self) -> bool {
        self == next || !self.is_terminal()
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

impl PaymentStatus {
    /// Pending → {Partial, Paid}, Partial → Paid. Paid is final.
    pub fn can_transition_to(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        !self.is_terminal() && next != Self::Pending
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// Validate a status change, producing the typed rejection the repositories
/// surface for forbidden moves.
pub(crate) fn check_appointment_transition(
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), DatabaseError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DatabaseError::InvalidTransition {
            entity: "Appointment",
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

pub(crate) fn check_payment_transition(
    from: PaymentStatus,
    to: PaymentStatus,
) -> Result<(), DatabaseError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DatabaseError::InvalidTransition {
            entity: "Bill",
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
