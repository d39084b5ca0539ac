//! Services and first-party caveats.
//!
//! A services caveat restricts a credential to a named set of downstream
//! services. Caveats are append-only: any holder of the credential bytes may
//! add one, and each added caveat can only narrow the authorized set.

use crate::error::LsatError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition string of a services caveat.
pub const SERVICES_CONDITION: &str = "services";

/// Access tier of a service within a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// The base tier every paid credential gets.
    #[default]
    Base,
}

impl Tier {
    /// Numeric wire value of the tier.
    pub fn as_u8(self) -> u8 {
        match self {
            Tier::Base => 0,
        }
    }

    /// Parse a tier from its numeric wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Tier::Base),
            _ => None,
        }
    }
}

/// One capability a credential may be scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub tier: Tier,
}

impl Service {
    pub fn new(name: impl Into<String>, tier: Tier) -> Self {
        Self {
            name: name.into(),
            tier,
        }
    }
}

/// A first-party caveat: a condition and its value, rendered as
/// `condition=value` inside the credential's signature chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caveat {
    pub condition: String,
    pub value: String,
}

impl Caveat {
    /// Parse a caveat from its `condition=value` rendering.
    pub fn decode(encoded: &str) -> Result<Self, LsatError> {
        let (condition, value) = encoded
            .split_once('=')
            .ok_or_else(|| LsatError::Decode(format!("caveat missing '=': {encoded}")))?;
        if condition.is_empty() {
            return Err(LsatError::Decode("caveat has empty condition".into()));
        }
        Ok(Self {
            condition: condition.to_string(),
            value: value.to_string(),
        })
    }
}

impl fmt::Display for Caveat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.condition, self.value)
    }
}

/// Build a services caveat covering the given services, rendered as
/// `services=name:tier,name:tier`.
pub fn services_caveat(services: &[Service]) -> Caveat {
    let value = services
        .iter()
        .map(|s| format!("{}:{}", s.name, s.tier.as_u8()))
        .collect::<Vec<_>>()
        .join(",");
    Caveat {
        condition: SERVICES_CONDITION.to_string(),
        value,
    }
}

/// Parse the service list out of a services caveat value.
pub fn decode_services_caveat(value: &str) -> Result<Vec<Service>, LsatError> {
    if value.is_empty() {
        return Err(LsatError::Decode("services caveat has no services".into()));
    }
    value
        .split(',')
        .map(|entry| {
            let (name, tier) = entry
                .rsplit_once(':')
                .ok_or_else(|| LsatError::Decode(format!("malformed service entry: {entry}")))?;
            if name.is_empty() {
                return Err(LsatError::Decode(format!("malformed service entry: {entry}")));
            }
            let tier = tier
                .parse::<u8>()
                .ok()
                .and_then(Tier::from_u8)
                .ok_or_else(|| LsatError::Decode(format!("unknown service tier: {entry}")))?;
            Ok(Service::new(name, tier))
        })
        .collect()
}

/// Evaluate every caveat on a credential against the target service.
///
/// Zero services caveats means an admin credential: any target is allowed.
/// Otherwise the target must appear in every services caveat present, since
/// each appended caveat can only narrow the authorized set. Conditions other
/// than `services` are unsupported and fail verification as a whole.
pub fn verify_caveats(caveats: &[Caveat], target_service: &str) -> Result<(), LsatError> {
    for caveat in caveats {
        if caveat.condition != SERVICES_CONDITION {
            return Err(LsatError::UnsupportedCaveat(caveat.condition.clone()));
        }
        let services = decode_services_caveat(&caveat.value)?;
        if !services.iter().any(|s| s.name == target_service) {
            return Err(LsatError::NotAuthorized(target_service.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_caveat_roundtrip() {
        let services = vec![
            Service::new("lightning_loop", Tier::Base),
            Service::new("pool", Tier::Base),
        ];
        let caveat = services_caveat(&services);
        assert_eq!(caveat.condition, SERVICES_CONDITION);
        assert_eq!(caveat.value, "lightning_loop:0,pool:0");

        let decoded = decode_services_caveat(&caveat.value).unwrap();
        assert_eq!(decoded, services);
    }

    #[test]
    fn test_caveat_encoding_roundtrip() {
        let caveat = services_caveat(&[Service::new("loop", Tier::Base)]);
        let decoded = Caveat::decode(&caveat.to_string()).unwrap();
        assert_eq!(decoded, caveat);
    }

    #[test]
    fn test_malformed_service_entries_rejected() {
        assert!(decode_services_caveat("").is_err());
        assert!(decode_services_caveat("no_tier").is_err());
        assert!(decode_services_caveat(":0").is_err());
        assert!(decode_services_caveat("loop:banana").is_err());
        assert!(decode_services_caveat("loop:250").is_err());
    }

    #[test]
    fn test_no_caveats_is_admin() {
        assert_eq!(verify_caveats(&[], "anything"), Ok(()));
    }

    #[test]
    fn test_intersection_of_all_caveats() {
        let wide = services_caveat(&[
            Service::new("a", Tier::Base),
            Service::new("b", Tier::Base),
        ]);
        let narrow = services_caveat(&[Service::new("a", Tier::Base)]);

        let caveats = vec![wide, narrow];
        assert_eq!(verify_caveats(&caveats, "a"), Ok(()));
        assert_eq!(
            verify_caveats(&caveats, "b"),
            Err(LsatError::NotAuthorized("b".to_string()))
        );
    }

    #[test]
    fn test_unknown_condition_fails_verification() {
        let caveats = vec![Caveat {
            condition: "expiry".to_string(),
            value: "12345".to_string(),
        }];
        assert_eq!(
            verify_caveats(&caveats, "a"),
            Err(LsatError::UnsupportedCaveat("expiry".to_string()))
        );
    }
}
