/// Alerting module
///
/// Decides when a state change warrants a notification and delivers it:
/// - The evaluator is a pure decision function over recent check history
/// - The notifier sends best-effort e-mail through the configured relay
pub mod evaluator;
pub mod notifier;

pub use evaluator::{AlertContext, AlertKind, AlertPolicy, decide};
pub use notifier::Notifier;
