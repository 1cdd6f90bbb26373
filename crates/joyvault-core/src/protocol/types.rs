//! Closed tag types shared by accounts and instructions.
//!
//! Both enums encode as a single `u8` tag on the wire. The mapping in
//! [`VaultTier::tag`] / [`VaultTier::from_tag`] (and the same pair on
//! [`SecretType`]) is the only translation between wire and Rust; the borsh
//! derive uses the same discriminants.

use std::fmt;
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use super::CodecError;

/// Capacity tier of a vault. Ordered: tiers only ever move up.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[borsh(use_discriminant = true)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum VaultTier {
    #[default]
    Free = 0,
    Starter = 1,
    Pro = 2,
    Ultra = 3,
}

impl VaultTier {
    pub const ALL: [VaultTier; 4] = [
        VaultTier::Free,
        VaultTier::Starter,
        VaultTier::Pro,
        VaultTier::Ultra,
    ];

    pub const fn max_secrets(self) -> u32 {
        match self {
            VaultTier::Free => 1,
            VaultTier::Starter => 10,
            VaultTier::Pro => 100,
            VaultTier::Ultra => 500,
        }
    }

    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, CodecError> {
        match tag {
            0 => Ok(VaultTier::Free),
            1 => Ok(VaultTier::Starter),
            2 => Ok(VaultTier::Pro),
            3 => Ok(VaultTier::Ultra),
            _ => Err(CodecError::UnknownTag {
                kind: "tier",
                tag,
            }),
        }
    }

    /// Index into `GlobalConfig::tier_prices`.
    pub const fn price_index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            VaultTier::Free => "free",
            VaultTier::Starter => "starter",
            VaultTier::Pro => "pro",
            VaultTier::Ultra => "ultra",
        }
    }

    /// Whether moving from `self` to `to` is a legal (strictly upward) transition.
    pub fn can_upgrade_to(self, to: VaultTier) -> bool {
        to > self
    }
}

impl fmt::Display for VaultTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VaultTier::Free => "Free",
            VaultTier::Starter => "Starter",
            VaultTier::Pro => "Pro",
            VaultTier::Ultra => "Ultra",
        };
        f.write_str(s)
    }
}

impl FromStr for VaultTier {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VaultTier::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CodecError::UnknownName {
                kind: "tier",
                name: s.to_string(),
            })
    }
}

/// Kind of secret, stored next to the ciphertext for display purposes only.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[borsh(use_discriminant = true)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum SecretType {
    #[default]
    Password = 0,
    ApiKey = 1,
    SeedPhrase = 2,
    PrivateKey = 3,
    Note = 4,
    Custom = 5,
}

impl SecretType {
    pub const ALL: [SecretType; 6] = [
        SecretType::Password,
        SecretType::ApiKey,
        SecretType::SeedPhrase,
        SecretType::PrivateKey,
        SecretType::Note,
        SecretType::Custom,
    ];

    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, CodecError> {
        match tag {
            0 => Ok(SecretType::Password),
            1 => Ok(SecretType::ApiKey),
            2 => Ok(SecretType::SeedPhrase),
            3 => Ok(SecretType::PrivateKey),
            4 => Ok(SecretType::Note),
            5 => Ok(SecretType::Custom),
            _ => Err(CodecError::UnknownTag {
                kind: "secret type",
                tag,
            }),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            SecretType::Password => "password",
            SecretType::ApiKey => "api-key",
            SecretType::SeedPhrase => "seed-phrase",
            SecretType::PrivateKey => "private-key",
            SecretType::Note => "note",
            SecretType::Custom => "custom",
        }
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecretType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SecretType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CodecError::UnknownName {
                kind: "secret type",
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_tags_roundtrip() {
        for tier in VaultTier::ALL {
            assert_eq!(VaultTier::from_tag(tier.tag()).unwrap(), tier);
            assert_eq!(borsh::to_vec(&tier).unwrap(), vec![tier.tag()]);
            assert_eq!(tier.as_str().parse::<VaultTier>().unwrap(), tier);
        }
        assert!(matches!(
            VaultTier::from_tag(4),
            Err(CodecError::UnknownTag { kind: "tier", tag: 4 })
        ));
    }

    #[test]
    fn test_tier_capacities() {
        let caps: Vec<u32> = VaultTier::ALL.iter().map(|t| t.max_secrets()).collect();
        assert_eq!(caps, vec![1, 10, 100, 500]);
    }

    #[test]
    fn test_tier_transitions_are_strictly_upward() {
        assert!(VaultTier::Free.can_upgrade_to(VaultTier::Starter));
        assert!(VaultTier::Starter.can_upgrade_to(VaultTier::Ultra));
        assert!(!VaultTier::Pro.can_upgrade_to(VaultTier::Pro));
        assert!(!VaultTier::Pro.can_upgrade_to(VaultTier::Starter));
    }

    #[test]
    fn test_secret_type_tags_roundtrip() {
        for kind in SecretType::ALL {
            assert_eq!(SecretType::from_tag(kind.tag()).unwrap(), kind);
            assert_eq!(borsh::from_slice::<SecretType>(&[kind.tag()]).unwrap(), kind);
            assert_eq!(kind.to_string().parse::<SecretType>().unwrap(), kind);
        }
        assert!(SecretType::from_tag(6).is_err());
        assert!(borsh::from_slice::<SecretType>(&[6]).is_err());
    }
}
