//! Error vocabulary for battery queries.
//!
//! A query can fail at three levels:
//!
//! - a single field of a battery ([`FieldError`], collected in a [`PartialError`]),
//! - a whole battery ([`FatalError`]),
//! - the request itself ([`Error::NotFound`]).
//!
//! Batch queries keep one slot per battery in [`Errors`] so callers can pick
//! out the records that were read successfully.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::battery::Battery;

/// A fallible field of [`Battery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    State,
    Current,
    Full,
    Design,
    ChargeRate,
    Voltage,
    DesignVoltage,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::State,
        Field::Current,
        Field::Full,
        Field::Design,
        Field::ChargeRate,
        Field::Voltage,
        Field::DesignVoltage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::State => "State",
            Field::Current => "Current",
            Field::Full => "Full",
            Field::Design => "Design",
            Field::ChargeRate => "ChargeRate",
            Field::Voltage => "Voltage",
            Field::DesignVoltage => "DesignVoltage",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a single field could not be read.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FieldError {
    /// The source does not expose this value at all.
    #[error("value not found")]
    Missing,

    /// The source reported its "unknown" marker value.
    #[error("unknown value received")]
    Sentinel,

    #[error("could not parse `{raw}`: {reason}")]
    Parse { raw: String, reason: String },

    #[error("invalid state `{0}`")]
    InvalidState(String),

    #[error("malformed source data: {0}")]
    Malformed(String),

    #[error("{0}")]
    Io(Arc<io::Error>),

    /// A value this field is computed from could not be read.
    #[error("{from} unavailable: {source}")]
    Derived {
        from: Field,
        source: Box<FieldError>,
    },
}

impl FieldError {
    pub fn parse(raw: impl Into<String>, reason: impl fmt::Display) -> Self {
        FieldError::Parse {
            raw: raw.into(),
            reason: reason.to_string(),
        }
    }

    pub fn derived(from: Field, source: FieldError) -> Self {
        FieldError::Derived {
            from,
            source: Box::new(source),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldError::Missing)
    }
}

impl From<io::Error> for FieldError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            FieldError::Missing
        } else {
            FieldError::Io(Arc::new(err))
        }
    }
}

/// Per-field failures of one battery read.
///
/// Mirrors the fallible fields of [`Battery`]; `None` means the field was
/// read successfully.
#[derive(Debug, Clone, Default)]
pub struct PartialError {
    pub state: Option<FieldError>,
    pub current: Option<FieldError>,
    pub full: Option<FieldError>,
    pub design: Option<FieldError>,
    pub charge_rate: Option<FieldError>,
    pub voltage: Option<FieldError>,
    pub design_voltage: Option<FieldError>,
}

impl PartialError {
    pub fn get(&self, field: Field) -> Option<&FieldError> {
        match field {
            Field::State => self.state.as_ref(),
            Field::Current => self.current.as_ref(),
            Field::Full => self.full.as_ref(),
            Field::Design => self.design.as_ref(),
            Field::ChargeRate => self.charge_rate.as_ref(),
            Field::Voltage => self.voltage.as_ref(),
            Field::DesignVoltage => self.design_voltage.as_ref(),
        }
    }

    pub fn set(&mut self, field: Field, err: Option<FieldError>) {
        let slot = match field {
            Field::State => &mut self.state,
            Field::Current => &mut self.current,
            Field::Full => &mut self.full,
            Field::Design => &mut self.design,
            Field::ChargeRate => &mut self.charge_rate,
            Field::Voltage => &mut self.voltage,
            Field::DesignVoltage => &mut self.design_voltage,
        };
        *slot = err;
    }

    /// True when every field was read; such a value must not be surfaced.
    pub fn all_nil(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// True when no field could be read at all.
    pub fn all_failed(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_some())
    }

    /// Failed fields in declaration order.
    pub fn failed_fields(&self) -> impl Iterator<Item = (Field, &FieldError)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(|f| self.get(f).map(|err| (f, err)))
    }

    /// One `<Field>: <cause>` line per failed field.
    pub fn describe(&self) -> String {
        self.failed_fields()
            .map(|(field, err)| format!("{}: {}", field, err))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for PartialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl StdError for PartialError {}

/// Cause of a [`FatalError`] escalated from a reading in which no field
/// could be read. The per-field detail is its source.
#[derive(Debug, thiserror::Error)]
#[error("every field failed")]
pub struct AllFieldsFailed(#[source] pub PartialError);

/// No data for this battery (or request) can be trusted.
#[derive(Debug, thiserror::Error)]
#[error("Could not retrieve battery info: {source}")]
pub struct FatalError {
    source: Box<dyn StdError + Send + Sync>,
}

impl FatalError {
    pub fn new<E>(cause: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self {
            source: cause.into(),
        }
    }

    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }
}

impl From<io::Error> for FatalError {
    fn from(err: io::Error) -> Self {
        FatalError::new(err)
    }
}

/// Outcome of a single-battery query.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested index does not name a battery.
    #[error("Not found")]
    NotFound,

    #[error(transparent)]
    Fatal(#[from] FatalError),

    /// Some fields failed; the rest of `battery` is usable.
    #[error("{errors}")]
    Partial {
        battery: Box<Battery>,
        errors: PartialError,
    },
}

impl Error {
    /// The partially read battery, if any.
    pub fn battery(&self) -> Option<&Battery> {
        match self {
            Error::Partial { battery, .. } => Some(&**battery),
            _ => None,
        }
    }
}

/// Failure of one slot in a batch query.
#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error(transparent)]
    Partial(#[from] PartialError),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl SlotError {
    /// False only for a partial error with no failed field.
    pub fn is_failure(&self) -> bool {
        match self {
            SlotError::Fatal(_) => true,
            SlotError::Partial(p) => !p.all_nil(),
        }
    }
}

/// Per-battery errors of a batch query, index-aligned with its records.
#[derive(Debug, Default)]
pub struct Errors(Vec<Option<SlotError>>);

impl Errors {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, slot: Option<SlotError>) {
        self.0.push(slot);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The error at `idx`, or `None` when that slot succeeded (or is out of range).
    pub fn get(&self, idx: usize) -> Option<&SlotError> {
        self.0.get(idx).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Option<SlotError>> {
        self.0.iter()
    }

    /// True as soon as any slot holds a fatal error or a partial error with
    /// at least one failed field.
    pub fn has_failure(&self) -> bool {
        self.0.iter().flatten().any(SlotError::is_failure)
    }
}

impl From<Vec<Option<SlotError>>> for Errors {
    fn from(slots: Vec<Option<SlotError>>) -> Self {
        Self(slots)
    }
}

impl FromIterator<Option<SlotError>> for Errors {
    fn from_iter<I: IntoIterator<Item = Option<SlotError>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a Option<SlotError>;
    type IntoIter = std::slice::Iter<'a, Option<SlotError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (idx, slot) in self.0.iter().enumerate() {
            let Some(err) = slot.as_ref().filter(|e| e.is_failure()) else {
                continue;
            };
            if !first {
                writeln!(f)?;
            }
            first = false;

            match err {
                SlotError::Fatal(fatal) => write!(f, "battery {}: {}", idx, fatal)?,
                SlotError::Partial(partial) => {
                    write!(f, "battery {}:", idx)?;
                    for line in partial.describe().lines() {
                        write!(f, "\n  {}", line)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl StdError for Errors {}

/// Outcome of an all-batteries query that did not fully succeed.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Batteries could not be enumerated at all.
    #[error(transparent)]
    Fatal(#[from] FatalError),

    /// At least one battery failed. `batteries` and `errors` are index-aligned;
    /// a slot whose error is fatal has no record.
    #[error("{errors}")]
    Failed {
        batteries: Vec<Option<Battery>>,
        errors: Errors,
    },
}

impl BatchError {
    pub fn batteries(&self) -> &[Option<Battery>] {
        match self {
            BatchError::Fatal(_) => &[],
            BatchError::Failed { batteries, .. } => batteries,
        }
    }

    pub fn errors(&self) -> Option<&Errors> {
        match self {
            BatchError::Fatal(_) => None,
            BatchError::Failed { errors, .. } => Some(errors),
        }
    }
}
