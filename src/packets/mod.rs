//! Replication packet definitions
//!
//! These are the wire types exchanged between peers. Every packet opens with
//! the same header: the `method` discriminator string naming the packet type,
//! then the `profile_id` of the player the packet concerns (the subject, not
//! necessarily the sender). Type-specific fields follow in declaration order.

pub mod damage;
pub mod proceed;
pub mod sync;

use bytes::Bytes;
use serde::Serialize;

use crate::wire::{DecodeError, WireReader, WireWriter};

pub use damage::ApplyDamagePacket;
pub use proceed::{
    ProceedFoodDrinkPacket, ProceedGrenadePacket, ProceedKnifePacket, ProceedMedsPacket,
    ProceedWeaponPacket,
};
pub use sync::{KillPacket, ProceedSyncPacket};

/// Damage source classification. Wide enumeration, 4 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Undefined,
    Fall,
    Explosion,
    Bullet,
    Melee,
    Blunt,
    Flame,
    GrenadeFragment,
    Poison,
    Bleeding,
    Landmine,
}

impl DamageType {
    pub fn to_wire(self) -> u32 {
        match self {
            Self::Undefined => 0,
            Self::Fall => 1,
            Self::Explosion => 2,
            Self::Bullet => 3,
            Self::Melee => 4,
            Self::Blunt => 5,
            Self::Flame => 6,
            Self::GrenadeFragment => 7,
            Self::Poison => 8,
            Self::Bleeding => 9,
            Self::Landmine => 10,
        }
    }

    pub fn from_wire(value: u32) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => Self::Undefined,
            1 => Self::Fall,
            2 => Self::Explosion,
            3 => Self::Bullet,
            4 => Self::Melee,
            5 => Self::Blunt,
            6 => Self::Flame,
            7 => Self::GrenadeFragment,
            8 => Self::Poison,
            9 => Self::Bleeding,
            10 => Self::Landmine,
            other => {
                return Err(DecodeError::UnknownEnum {
                    field: "damage_type",
                    value: other,
                })
            }
        })
    }
}

/// Targeted body part. Small enumeration, 1 byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Head,
    Chest,
    Stomach,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    Common,
}

impl BodyPart {
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Head => 0,
            Self::Chest => 1,
            Self::Stomach => 2,
            Self::LeftArm => 3,
            Self::RightArm => 4,
            Self::LeftLeg => 5,
            Self::RightLeg => 6,
            Self::Common => 7,
        }
    }

    pub fn from_wire(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => Self::Head,
            1 => Self::Chest,
            2 => Self::Stomach,
            3 => Self::LeftArm,
            4 => Self::RightArm,
            5 => Self::LeftLeg,
            6 => Self::RightLeg,
            7 => Self::Common,
            other => {
                return Err(DecodeError::UnknownEnum {
                    field: "body_part",
                    value: other as u32,
                })
            }
        })
    }
}

/// Body-part collider sub-region. Small enumeration, 1 byte on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColliderType {
    HeadCommon,
    Neck,
    ThoraxUp,
    ThoraxDown,
    Stomach,
    Pelvis,
    LeftUpperArm,
    LeftForearm,
    RightUpperArm,
    RightForearm,
    LeftThigh,
    LeftCalf,
    RightThigh,
    RightCalf,
}

impl ColliderType {
    pub fn to_wire(self) -> u8 {
        match self {
            Self::HeadCommon => 0,
            Self::Neck => 1,
            Self::ThoraxUp => 2,
            Self::ThoraxDown => 3,
            Self::Stomach => 4,
            Self::Pelvis => 5,
            Self::LeftUpperArm => 6,
            Self::LeftForearm => 7,
            Self::RightUpperArm => 8,
            Self::RightForearm => 9,
            Self::LeftThigh => 10,
            Self::LeftCalf => 11,
            Self::RightThigh => 12,
            Self::RightCalf => 13,
        }
    }

    pub fn from_wire(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => Self::HeadCommon,
            1 => Self::Neck,
            2 => Self::ThoraxUp,
            3 => Self::ThoraxDown,
            4 => Self::Stomach,
            5 => Self::Pelvis,
            6 => Self::LeftUpperArm,
            7 => Self::LeftForearm,
            8 => Self::RightUpperArm,
            9 => Self::RightForearm,
            10 => Self::LeftThigh,
            11 => Self::LeftCalf,
            12 => Self::RightThigh,
            13 => Self::RightCalf,
            other => {
                return Err(DecodeError::UnknownEnum {
                    field: "collider_type",
                    value: other as u32,
                })
            }
        })
    }
}

/// A typed replication packet with the common header.
pub trait Packet: Sized + Serialize {
    /// Method discriminator written into the header. Immutable per type.
    const METHOD: &'static str;

    /// Profile id of the player this packet concerns.
    fn profile_id(&self) -> &str;

    /// Encode the packet into its wire bytes.
    fn encode(&self) -> Bytes;

    /// Decode a packet of this type from wire bytes.
    ///
    /// Fails with [`DecodeError::MethodMismatch`] if the header names a
    /// different packet type; the dispatcher treats that as a no-op.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError>;
}

/// Write the common header: method discriminator, then subject profile id.
pub(crate) fn write_header(writer: &mut WireWriter, method: &str, profile_id: &str) {
    writer.put_string(method);
    writer.put_string(profile_id);
}

/// Read the common header, requiring the expected method discriminator.
/// Returns the subject profile id.
pub(crate) fn read_header(
    reader: &mut WireReader<'_>,
    expected: &'static str,
) -> Result<String, DecodeError> {
    let method = reader.read_string()?;
    if method != expected {
        return Err(DecodeError::MethodMismatch {
            expected,
            found: method,
        });
    }
    reader.read_string()
}

/// Read only the method discriminator, leaving the rest untouched.
/// Used by the dispatcher to pick a decoder.
pub fn peek_method(bytes: &[u8]) -> Result<String, DecodeError> {
    WireReader::new(bytes).read_string()
}

/// Diagnostic JSON rendering for packet logging.
pub(crate) fn debug_json<T: Serialize>(packet: &T) -> String {
    serde_json::to_string(packet).unwrap_or_else(|_| "<unserializable>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_wire_values_are_stable() {
        // Cross-peer contract: these numbers must never change.
        assert_eq!(DamageType::Bullet.to_wire(), 3);
        assert_eq!(BodyPart::Head.to_wire(), 0);
        assert_eq!(ColliderType::ThoraxUp.to_wire(), 2);

        assert_eq!(DamageType::from_wire(3), Ok(DamageType::Bullet));
        assert_eq!(BodyPart::from_wire(6), Ok(BodyPart::RightLeg));
        assert_eq!(ColliderType::from_wire(13), Ok(ColliderType::RightCalf));
    }

    #[test]
    fn unknown_discriminants_are_rejected() {
        assert_eq!(
            DamageType::from_wire(99),
            Err(DecodeError::UnknownEnum {
                field: "damage_type",
                value: 99
            })
        );
        assert!(BodyPart::from_wire(8).is_err());
        assert!(ColliderType::from_wire(14).is_err());
    }

    #[test]
    fn peek_method_reads_only_the_discriminator() {
        let mut writer = WireWriter::new();
        write_header(&mut writer, "ApplyDamagePacket", "profile-1");
        let bytes = writer.freeze();
        assert_eq!(peek_method(&bytes).unwrap(), "ApplyDamagePacket");
    }
}
