//! Serde helpers representing durations as fractional seconds.
//!
//! Use with `#[serde(with = "toolbox_primitives::duration::secs")]` or
//! `#[serde(default, with = "toolbox_primitives::duration::secs_option")]`.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

fn from_secs<E: serde::de::Error>(secs: f64) -> Result<Duration, E> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(E::custom(format!(
            "duration must be a non-negative number of seconds, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs).map_err(E::custom)
}

/// Required duration encoded as seconds.
pub mod secs {
    use super::{Deserialize, Deserializer, Duration, Serializer, from_secs};

    /// Serializes `duration` as fractional seconds.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    /// Deserializes fractional seconds into a [`Duration`].
    ///
    /// # Errors
    ///
    /// Rejects negative, infinite, or NaN values.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        from_secs(f64::deserialize(deserializer)?)
    }
}

/// Optional duration encoded as seconds.
pub mod secs_option {
    use super::{Deserialize, Deserializer, Duration, Serializer, from_secs};

    /// Serializes an optional duration as fractional seconds or `null`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes optional fractional seconds.
    ///
    /// # Errors
    ///
    /// Rejects negative, infinite, or NaN values.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(from_secs::<D::Error>)
            .transpose()
    }
}

/// Converts a duration into whole milliseconds, saturating at `u64::MAX`.
#[must_use]
pub fn as_millis_u64(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
