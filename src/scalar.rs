//! Extended scalar values: pointers and temporal values.
//!
//! These types reuse the 3 wire bits of their type tag as presence flags, so the
//! encoder can drop optional parts of the payload. Each type exposes `wire_flags()`
//! for that purpose.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::Serialize;
use std::fmt;

/// Reference to another object by its `localId`.
///
/// # Examples
///
/// ```rust
/// use dson::ObjectPtr;
///
/// let ptr = ObjectPtr::new("node-7").with_namespace("graph");
/// assert_eq!(ptr.wire_flags(), ObjectPtr::MASK_NAMESPACE);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ObjectPtr {
    pub local_id: String,
    pub namespace: String,
    pub ptr_type: u8,
    pub policy: u8,
}

impl ObjectPtr {
    pub const MASK_NAMESPACE: u8 = 1;
    pub const MASK_TYPE: u8 = 2;
    pub const MASK_POLICY: u8 = 4;

    #[must_use]
    pub fn new(local_id: impl Into<String>) -> Self {
        ObjectPtr {
            local_id: local_id.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_type(mut self, ptr_type: u8) -> Self {
        self.ptr_type = ptr_type;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: u8) -> Self {
        self.policy = policy;
        self
    }

    /// Presence flags for the optional parts of the payload.
    #[must_use]
    pub fn wire_flags(&self) -> u8 {
        pointer_flags(&self.namespace, self.ptr_type, self.policy)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.local_id.is_empty()
    }
}

/// Compact pointer whose `localId` is an integer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct LiteObjectPtr {
    pub local_id: i64,
    pub namespace: String,
    pub ptr_type: u8,
    pub policy: u8,
}

impl LiteObjectPtr {
    #[must_use]
    pub fn new(local_id: i64) -> Self {
        LiteObjectPtr {
            local_id,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_type(mut self, ptr_type: u8) -> Self {
        self.ptr_type = ptr_type;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: u8) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn wire_flags(&self) -> u8 {
        pointer_flags(&self.namespace, self.ptr_type, self.policy)
    }
}

fn pointer_flags(namespace: &str, ptr_type: u8, policy: u8) -> u8 {
    let mut flags = 0;
    if !namespace.is_empty() {
        flags |= ObjectPtr::MASK_NAMESPACE;
    }
    if ptr_type != 0 {
        flags |= ObjectPtr::MASK_TYPE;
    }
    if policy != 0 {
        flags |= ObjectPtr::MASK_POLICY;
    }
    flags
}

/// Date and/or time with optional nanoseconds and UTC offset.
///
/// `seconds` counts from the Unix epoch for the local (wall clock) date-time. Which
/// parts are meaningful is recorded in `enables`; parts that are not enabled are
/// stored as zero.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use dson::ExtDateTime;
///
/// let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
/// let value = ExtDateTime::from_date(date);
/// assert!(value.has_date());
/// assert!(!value.has_time());
/// assert_eq!(value.to_naive().unwrap().date(), date);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ExtDateTime {
    seconds: i64,
    nanos: u32,
    offset: i32,
    enables: u8,
}

impl ExtDateTime {
    pub const MASK_DATE: u8 = 1;
    pub const MASK_TIME: u8 = 2;
    pub const MASK_OFFSET: u8 = 4;
    pub const MASK_NANOS: u8 = 8;
    pub const MASK_DATETIME: u8 = Self::MASK_DATE | Self::MASK_TIME;

    /// Tag bit set when the nanos field is on the wire.
    pub const FLAG_NANOS: u8 = 1;
    /// Tag bit set when the offset field is on the wire.
    pub const FLAG_OFFSET: u8 = 2;

    /// Creates a value; `nanos` and `offset` are zeroed unless enabled.
    #[must_use]
    pub fn new(seconds: i64, nanos: u32, offset: i32, enables: u8) -> Self {
        ExtDateTime {
            seconds,
            nanos: if enables & Self::MASK_NANOS != 0 { nanos } else { 0 },
            offset: if enables & Self::MASK_OFFSET != 0 { offset } else { 0 },
            enables,
        }
    }

    /// Date-time with nanosecond precision.
    #[must_use]
    pub fn from_naive(value: NaiveDateTime) -> Self {
        let nanos = value.and_utc().timestamp_subsec_nanos();
        let mut enables = Self::MASK_DATETIME;
        if nanos != 0 {
            enables |= Self::MASK_NANOS;
        }
        Self::new(value.and_utc().timestamp(), nanos, 0, enables)
    }

    #[must_use]
    pub fn from_date(value: NaiveDate) -> Self {
        let seconds = value.and_time(NaiveTime::MIN).and_utc().timestamp();
        Self::new(seconds, 0, 0, Self::MASK_DATE)
    }

    /// Time of day; `seconds` counts from midnight.
    #[must_use]
    pub fn from_time(value: NaiveTime) -> Self {
        let nanos = value.nanosecond();
        let mut enables = Self::MASK_TIME;
        if nanos != 0 {
            enables |= Self::MASK_NANOS;
        }
        Self::new(i64::from(value.num_seconds_from_midnight()), nanos, 0, enables)
    }

    /// Date-time carrying its UTC offset.
    #[must_use]
    pub fn from_offset_datetime(value: DateTime<FixedOffset>) -> Self {
        let local = Self::from_naive(value.naive_local());
        Self::new(
            local.seconds,
            local.nanos,
            value.offset().local_minus_utc(),
            local.enables | Self::MASK_OFFSET,
        )
    }

    #[must_use]
    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    #[must_use]
    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// UTC offset in seconds.
    #[must_use]
    pub fn offset(&self) -> i32 {
        self.offset
    }

    #[must_use]
    pub fn enables(&self) -> u8 {
        self.enables
    }

    #[must_use]
    pub fn has_date(&self) -> bool {
        self.enables & Self::MASK_DATE != 0
    }

    #[must_use]
    pub fn has_time(&self) -> bool {
        self.enables & Self::MASK_TIME != 0
    }

    #[must_use]
    pub fn has_offset(&self) -> bool {
        self.enables & Self::MASK_OFFSET != 0
    }

    #[must_use]
    pub fn has_nanos(&self) -> bool {
        self.enables & Self::MASK_NANOS != 0
    }

    /// Presence flags for the optional parts of the payload.
    #[must_use]
    pub fn wire_flags(&self) -> u8 {
        let mut flags = 0;
        if self.has_nanos() {
            flags |= Self::FLAG_NANOS;
        }
        if self.has_offset() {
            flags |= Self::FLAG_OFFSET;
        }
        flags
    }

    /// Wall-clock date-time, `None` when out of chrono's range.
    #[must_use]
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        DateTime::from_timestamp(self.seconds, self.nanos).map(|utc| utc.naive_utc())
    }

    /// Date-time with its offset, `None` without an enabled offset.
    #[must_use]
    pub fn to_offset_datetime(&self) -> Option<DateTime<FixedOffset>> {
        if !self.has_offset() {
            return None;
        }
        let offset = FixedOffset::east_opt(self.offset)?;
        self.to_naive()?.and_local_timezone(offset).single()
    }
}

impl From<NaiveDateTime> for ExtDateTime {
    fn from(value: NaiveDateTime) -> Self {
        Self::from_naive(value)
    }
}

impl From<DateTime<FixedOffset>> for ExtDateTime {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::from_offset_datetime(value)
    }
}

impl fmt::Display for ExtDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.to_offset_datetime(), self.to_naive()) {
            (Some(dt), _) => write!(f, "{}", dt.to_rfc3339()),
            (None, Some(naive)) if self.enables & Self::MASK_DATETIME == Self::MASK_DATE => {
                write!(f, "{}", naive.date())
            }
            (None, Some(naive)) if self.enables & Self::MASK_DATETIME == Self::MASK_TIME => {
                write!(f, "{}", naive.time())
            }
            (None, Some(naive)) => write!(f, "{}", naive),
            (None, None) => write!(f, "ExtDateTime({}s)", self.seconds),
        }
    }
}

/// Instant on the UTC time line.
///
/// # Examples
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use dson::Timestamp;
///
/// let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let ts = Timestamp::from(instant);
/// assert_eq!(ts.seconds, 1_704_067_200);
/// assert_eq!(ts.to_datetime(), Some(instant));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    /// Tag bit set when the nanos field is on the wire.
    pub const FLAG_NANOS: u8 = 1;

    #[must_use]
    pub fn new(seconds: i64, nanos: u32) -> Self {
        Timestamp { seconds, nanos }
    }

    #[must_use]
    pub fn wire_flags(&self) -> u8 {
        if self.nanos != 0 {
            Self::FLAG_NANOS
        } else {
            0
        }
    }

    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanos)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp::new(value.timestamp(), value.timestamp_subsec_nanos())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "Timestamp({}s)", self.seconds),
        }
    }
}
