use thiserror::Error;

/// A stored enum column held a value this build does not know.
#[derive(Debug, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Maps an enum onto the lowercase text stored in its column.
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = $crate::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                match value.as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err($crate::models::UnknownVariant { kind: $kind, value }),
                }
            }
        }
    };
}

pub mod event;
pub mod payment;
pub mod ticket;
pub mod user;

pub use event::{Event, EventStatus, NewEvent, Pricing};
pub use payment::{PaymentRecord, PaymentStatus};
pub use ticket::{NewTicket, PaymentSummary, QuantityInput, Ticket};
pub use user::{AccountStatus, Role, User};
